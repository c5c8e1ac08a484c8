use std::path::Path;

use log::info;
use wool_api::{DialogueSession, SessionEvent};
use wool_core::{ErrorKind, WoolError};

use crate::{
    boundary_for_current, boundary_for_event, create_session_for_scenario,
    emit_boundary_with_saved_state, load_player_state, load_source_by_ref,
    load_source_by_scripts_dir, parse_answers, resume_session_for_state, AgentArgs, AgentCommand,
    ChooseArgs, InputArgs, SessionSettings, StartArgs,
};

pub(super) fn run_agent(args: AgentArgs) -> Result<i32, WoolError> {
    match args.command {
        AgentCommand::Start(args) => run_start(args),
        AgentCommand::Choose(args) => run_choose(args),
        AgentCommand::Input(args) => run_input(args),
    }
}

pub(super) fn run_start(args: StartArgs) -> Result<i32, WoolError> {
    let settings = SessionSettings::from_args(&args.session)?;
    let scenario = load_source_by_scripts_dir(&args.session.scripts_dir)?;
    let session = create_session_for_scenario(&scenario, &settings)?;

    let boundary = boundary_for_current(&session);
    emit_boundary_with_saved_state(
        &session,
        boundary,
        &args.state_out,
        &scenario.id,
        settings.unknown_variables,
    )
}

pub(super) fn run_choose(args: ChooseArgs) -> Result<i32, WoolError> {
    run_state_transition(&args.state_in, &args.state_out, |session| {
        session.choose(args.reply)
    })
}

pub(super) fn run_input(args: InputArgs) -> Result<i32, WoolError> {
    run_state_transition(&args.state_in, &args.state_out, |session| {
        let reply = session
            .current_node()
            .and_then(|node| node.body.find_reply_by_id(args.reply))
            .ok_or_else(|| {
                WoolError::new(
                    ErrorKind::EngineState,
                    "CLI_REPLY_NOT_FOUND",
                    format!("Reply {} is not offered", args.reply),
                )
            })?;
        let answers = parse_answers(reply, &args.set)?;
        session.store_input(args.reply, &answers)?;
        let statement = session.user_statement(args.reply)?;
        info!("player said: {}", statement);
        session.choose(args.reply)
    })
}

fn run_state_transition(
    state_in: &str,
    state_out: &str,
    transition: impl FnOnce(&mut DialogueSession) -> Result<SessionEvent, WoolError>,
) -> Result<i32, WoolError> {
    let state = load_player_state(Path::new(state_in))?;
    let scenario = load_source_by_ref(&state.scenario_id)?;
    let mut session = resume_session_for_state(&scenario, &state)?;
    let event = transition(&mut session)?;
    let boundary = boundary_for_event(&session, &event);
    emit_boundary_with_saved_state(
        &session,
        boundary,
        state_out,
        &state.scenario_id,
        state.unknown_variables,
    )
}
