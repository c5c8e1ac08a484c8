use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wool_api::SessionSnapshot;
use wool_expr::UnknownVariablePolicy;

pub(crate) const PLAYER_STATE_SCHEMA: &str = "wool-player-state.v1";

#[derive(Debug, Clone)]
pub(crate) struct LoadedScenario {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) sources: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerState {
    pub(crate) schema_version: String,
    pub(crate) scenario_id: String,
    pub(crate) unknown_variables: UnknownVariablePolicy,
    pub(crate) session: SessionSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundaryEvent {
    Node,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoundaryReply {
    pub(crate) id: usize,
    pub(crate) kind: &'static str,
    pub(crate) label: String,
}

/// What a client sees after one step: the node shown (if any) and whether
/// the player still has to reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoundaryResult {
    pub(crate) event: BoundaryEvent,
    pub(crate) dialogue: Option<String>,
    pub(crate) node: Option<String>,
    pub(crate) speaker: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) actions: Vec<String>,
    pub(crate) replies: Vec<BoundaryReply>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TuiCommandAction {
    NotHandled,
    Continue,
    RefreshBoundary,
    Quit,
}

pub(crate) struct TuiCommandContext<'a> {
    pub(crate) state_file: &'a str,
    pub(crate) scenario: &'a LoadedScenario,
    pub(crate) settings: &'a crate::SessionSettings,
}
