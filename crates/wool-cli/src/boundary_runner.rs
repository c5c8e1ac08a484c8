use serde_json::json;
use wool_api::{reply_label, DialogueSession, SessionEvent};
use wool_model::{ActionCommand, ReplyKind, VariableString};
use wool_runtime::ExecutedNode;

use crate::{json_string, BoundaryEvent, BoundaryReply, BoundaryResult};

fn literal(text: &VariableString) -> String {
    text.plain_text().unwrap_or_else(|| text.to_string())
}

fn action_json(action: &ActionCommand) -> String {
    let parameters: serde_json::Map<String, serde_json::Value> = action
        .parameters
        .iter()
        .map(|(name, value)| (name.clone(), json!(literal(value))))
        .collect();
    json!({
        "type": action.action_type.as_str(),
        "value": literal(&action.value),
        "parameters": parameters,
    })
    .to_string()
}

pub(crate) fn reply_kind_name(kind: ReplyKind) -> &'static str {
    match kind {
        ReplyKind::AutoForward => "autoforward",
        ReplyKind::Basic => "basic",
        ReplyKind::Input => "input",
    }
}

/// Boundary for a node just shown; `finished` when the dialogue ended on it.
pub(crate) fn boundary_for_node(node: Option<&ExecutedNode>, finished: bool) -> BoundaryResult {
    let event = if finished {
        BoundaryEvent::End
    } else {
        BoundaryEvent::Node
    };
    let Some(node) = node else {
        return BoundaryResult {
            event,
            dialogue: None,
            node: None,
            speaker: None,
            text: None,
            actions: Vec::new(),
            replies: Vec::new(),
        };
    };
    BoundaryResult {
        event,
        dialogue: Some(node.dialogue.clone()),
        node: Some(node.title().to_string()),
        speaker: node.speaker().map(str::to_string),
        text: Some(node.body.text()),
        actions: node.body.actions().into_iter().map(action_json).collect(),
        replies: node
            .body
            .replies()
            .iter()
            .map(|reply| BoundaryReply {
                id: reply.reply_id,
                kind: reply_kind_name(reply.kind()),
                label: reply_label(reply),
            })
            .collect(),
    }
}

pub(crate) fn boundary_for_current(session: &DialogueSession) -> BoundaryResult {
    boundary_for_node(session.current_node(), session.is_finished())
}

pub(crate) fn boundary_for_event(session: &DialogueSession, event: &SessionEvent) -> BoundaryResult {
    match event {
        SessionEvent::Node(node) => boundary_for_node(Some(node), session.is_finished()),
        SessionEvent::Finished => boundary_for_node(None, true),
    }
}

pub(crate) fn emit_boundary(boundary: BoundaryResult, state_out: Option<String>) {
    println!("RESULT:OK");
    match boundary.event {
        BoundaryEvent::Node => println!("EVENT:NODE"),
        BoundaryEvent::End => println!("EVENT:END"),
    }

    if let Some(dialogue) = boundary.dialogue {
        println!("DIALOGUE:{}", dialogue);
    }
    if let Some(node) = boundary.node {
        println!("NODE:{}", node);
    }
    if let Some(speaker) = boundary.speaker {
        println!("SPEAKER_JSON:{}", json_string(&speaker));
    }
    if let Some(text) = boundary.text {
        println!("TEXT_JSON:{}", json_string(&text));
    }
    for action in boundary.actions {
        println!("ACTION_JSON:{}", action);
    }
    for reply in boundary.replies {
        println!("REPLY:{}|{}|{}", reply.id, reply.kind, json_string(&reply.label));
    }

    println!(
        "STATE_OUT:{}",
        state_out.unwrap_or_else(|| "NONE".to_string())
    );
}
