use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use wool_api::{
    create_session, resume_session, CreateSessionOptions, DialogueSession, ResumeSessionOptions,
};
use wool_core::{ErrorKind, Value, WoolError};
use wool_expr::UnknownVariablePolicy;

use crate::{
    emit_boundary, load_player_state, load_source_by_ref, parse_variables, save_player_state,
    BoundaryEvent, BoundaryResult, LoadedScenario, PlayerState, SessionArgs, PLAYER_STATE_SCHEMA,
};

/// How a new session starts; shared by agent start, play and `:restart`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SessionSettings {
    pub(crate) entry_dialogue: Option<String>,
    pub(crate) start_node: Option<String>,
    pub(crate) seed: Option<u32>,
    pub(crate) unknown_variables: UnknownVariablePolicy,
    pub(crate) variables: BTreeMap<String, Value>,
}

impl SessionSettings {
    pub(crate) fn from_args(args: &SessionArgs) -> Result<Self, WoolError> {
        Ok(Self {
            entry_dialogue: args.entry_dialogue.clone(),
            start_node: args.start_node.clone(),
            seed: args.seed,
            unknown_variables: if args.strict_variables {
                UnknownVariablePolicy::Fail
            } else {
                UnknownVariablePolicy::Null
            },
            variables: parse_variables(&args.set)?,
        })
    }
}

pub(crate) fn create_session_for_scenario(
    scenario: &LoadedScenario,
    settings: &SessionSettings,
) -> Result<DialogueSession, WoolError> {
    create_session(CreateSessionOptions {
        sources: scenario.sources.clone(),
        entry_dialogue: settings.entry_dialogue.clone(),
        start_node: settings.start_node.clone(),
        random_seed: settings.seed,
        unknown_variables: settings.unknown_variables,
        variables: settings.variables.clone(),
    })
}

pub(crate) fn resume_session_for_state(
    scenario: &LoadedScenario,
    state: &PlayerState,
) -> Result<DialogueSession, WoolError> {
    resume_session(ResumeSessionOptions {
        sources: scenario.sources.clone(),
        snapshot: state.session.clone(),
        unknown_variables: state.unknown_variables,
    })
}

pub(crate) fn player_state_for(
    session: &DialogueSession,
    scenario_id: &str,
    unknown_variables: UnknownVariablePolicy,
) -> Result<PlayerState, WoolError> {
    Ok(PlayerState {
        schema_version: PLAYER_STATE_SCHEMA.to_string(),
        scenario_id: scenario_id.to_string(),
        unknown_variables,
        session: session.snapshot()?,
    })
}

pub(crate) fn save_session_state(
    path: &Path,
    session: &DialogueSession,
    scenario_id: &str,
    unknown_variables: UnknownVariablePolicy,
) -> Result<(), WoolError> {
    let state = player_state_for(session, scenario_id, unknown_variables)?;
    save_player_state(path, &state)?;
    info!("saved session state to {}", path.display());
    Ok(())
}

pub(crate) fn load_session_from_state_for_ref(
    path: &Path,
) -> Result<(LoadedScenario, PlayerState, DialogueSession), WoolError> {
    let state = load_player_state(path)?;
    let scenario = load_source_by_ref(&state.scenario_id)?;
    let session = resume_session_for_state(&scenario, &state)?;
    Ok((scenario, state, session))
}

pub(crate) fn load_session_from_state_for_scenario(
    path: &Path,
    scenario: &LoadedScenario,
) -> Result<(PlayerState, DialogueSession), WoolError> {
    let state = load_player_state(path)?;
    if state.scenario_id != scenario.id {
        return Err(WoolError::new(
            ErrorKind::EngineState,
            "TUI_STATE_SCENARIO_MISMATCH",
            format!(
                "State scenario mismatch. expected={} actual={}",
                scenario.id, state.scenario_id
            ),
        ));
    }
    let session = resume_session_for_state(scenario, &state)?;
    Ok((state, session))
}

/// Emits the boundary; the session is saved to `state_out` only while it
/// still waits for a reply.
pub(crate) fn emit_boundary_with_saved_state(
    session: &DialogueSession,
    boundary: BoundaryResult,
    state_out: &str,
    scenario_id: &str,
    unknown_variables: UnknownVariablePolicy,
) -> Result<i32, WoolError> {
    if boundary.event == BoundaryEvent::Node {
        save_session_state(Path::new(state_out), session, scenario_id, unknown_variables)?;
        emit_boundary(boundary, Some(state_out.to_string()));
        return Ok(0);
    }

    emit_boundary(boundary, None);
    Ok(0)
}
