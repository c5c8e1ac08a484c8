use std::path::Path;

use log::debug;
use wool_api::{create_session, reply_label, CreateSessionOptions, DialogueSession, SessionEvent};
use wool_model::ReplyKind;
use wool_runtime::ExecutedNode;

use crate::source::{read_sources_from_dir, read_test_case};
use crate::{ExpectedEvent, TestAction, TestCase, WoolToolError};

const MAX_STEPS: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub observed_events: Vec<ExpectedEvent>,
    pub consumed_actions: usize,
    pub steps: usize,
}

fn node_event(node: &ExecutedNode) -> ExpectedEvent {
    ExpectedEvent::Node {
        dialogue: node.dialogue.clone(),
        node: node.title().to_string(),
        speaker: node.speaker().map(str::to_string),
        text: node.body.text(),
        replies: node.body.replies().iter().map(reply_label).collect(),
    }
}

fn check_action_kind(
    session: &DialogueSession,
    action: &TestAction,
    event_index: usize,
) -> Result<(), WoolToolError> {
    let reply_id = action.reply_id();
    let Some(reply) = session
        .current_node()
        .and_then(|node| node.body.find_reply_by_id(reply_id))
    else {
        // unknown ids are reported by the engine
        return Ok(());
    };
    let expected = match reply.kind() {
        ReplyKind::Input => "input",
        ReplyKind::AutoForward | ReplyKind::Basic => "reply",
    };
    if expected != action.kind_name() {
        return Err(WoolToolError::ActionKindMismatch {
            event_index,
            reply_id,
            expected_action_kind: expected.to_string(),
            actual_action_kind: action.kind_name().to_string(),
        });
    }
    Ok(())
}

/// Plays `case` against the scripts of `demo_dir`, feeding one action to
/// every node that waits for a reply.
pub fn run_case(demo_dir: &Path, case: &TestCase) -> Result<RunReport, WoolToolError> {
    let sources = read_sources_from_dir(demo_dir)?;
    let mut session = create_session(CreateSessionOptions {
        sources,
        entry_dialogue: Some(case.entry_dialogue.clone()),
        start_node: case.start_node.clone(),
        random_seed: Some(1),
        variables: case.variables.clone(),
        ..CreateSessionOptions::default()
    })?;

    let mut observed_events = Vec::new();
    if let Some(node) = session.current_node() {
        observed_events.push(node_event(node));
    }
    let mut action_index = 0usize;

    for step in 1..=MAX_STEPS {
        if session.is_finished() {
            observed_events.push(ExpectedEvent::End);
            if action_index != case.actions.len() {
                return Err(WoolToolError::UnusedActions {
                    used: action_index,
                    total: case.actions.len(),
                });
            }
            debug!("case finished after {} steps", step);
            return Ok(RunReport {
                observed_events,
                consumed_actions: action_index,
                steps: step,
            });
        }

        let event_index = observed_events.len() - 1;
        let action = case
            .actions
            .get(action_index)
            .ok_or(WoolToolError::MissingAction { event_index })?;
        check_action_kind(&session, action, event_index)?;
        let event = match action {
            TestAction::Reply { reply_id } => session.choose(*reply_id)?,
            TestAction::Input { reply_id, values } => {
                session.store_input(*reply_id, values)?;
                session.choose(*reply_id)?
            }
        };
        action_index += 1;
        if let SessionEvent::Node(node) = &event {
            observed_events.push(node_event(node));
        }
    }

    Err(WoolToolError::GuardExceeded {
        max_steps: MAX_STEPS,
    })
}

pub fn assert_case(demo_dir: &Path, case_path: &Path) -> Result<(), WoolToolError> {
    let case = read_test_case(case_path)?;
    let report = run_case(demo_dir, &case)?;

    if report.observed_events.len() != case.expected_events.len() {
        let observed = serde_json::to_string_pretty(&report.observed_events)
            .map_err(WoolToolError::EventSerialize)?;
        return Err(WoolToolError::EventCountMismatch {
            expected: case.expected_events.len(),
            actual: report.observed_events.len(),
            observed,
        });
    }

    for (index, (expected, actual)) in case
        .expected_events
        .iter()
        .zip(report.observed_events.iter())
        .enumerate()
    {
        if expected != actual {
            let expected =
                serde_json::to_string(expected).map_err(WoolToolError::EventSerialize)?;
            let actual = serde_json::to_string(actual).map_err(WoolToolError::EventSerialize)?;
            return Err(WoolToolError::EventMismatch {
                index,
                expected,
                actual,
            });
        }
    }

    Ok(())
}
