use std::rc::Rc;

use log::debug;
use serde::{Deserialize, Serialize};
use wool_core::WoolError;
use wool_model::Dialogue;

use super::lifecycle::{engine_error, ActiveDialogue, DialogueState, ExecutedNode};
use crate::store::SharedVariableStore;

pub const DIALOGUE_SNAPSHOT_SCHEMA: &str = "wool-dialogue-snapshot.v1";

/// Position of an active dialogue. Variables live in the store and are
/// saved separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueSnapshot {
    pub schema_version: String,
    pub dialogue: String,
    pub state: DialogueState,
    /// Already executed, so resuming does not run its commands again.
    pub current: Option<ExecutedNode>,
    pub rng_state: u32,
}

impl ActiveDialogue {
    pub fn snapshot(&self) -> Result<DialogueSnapshot, WoolError> {
        self.ensure_active()?;
        Ok(DialogueSnapshot {
            schema_version: DIALOGUE_SNAPSHOT_SCHEMA.to_string(),
            dialogue: self.dialogue.name().to_string(),
            state: self.state,
            current: self.current.clone(),
            rng_state: self.rng_state,
        })
    }

    /// Rebuilds a dialogue at the point `snapshot` was taken. `dialogue`
    /// must be the one the snapshot was taken from.
    pub fn resume(
        dialogue: Rc<Dialogue>,
        store: SharedVariableStore,
        snapshot: DialogueSnapshot,
    ) -> Result<Self, WoolError> {
        if snapshot.schema_version != DIALOGUE_SNAPSHOT_SCHEMA {
            return Err(engine_error(
                "ENGINE_SNAPSHOT_SCHEMA",
                format!(
                    "Unsupported snapshot schema \"{}\", expected \"{}\"",
                    snapshot.schema_version, DIALOGUE_SNAPSHOT_SCHEMA
                ),
            ));
        }
        if !snapshot.dialogue.eq_ignore_ascii_case(dialogue.name()) {
            return Err(engine_error(
                "ENGINE_SNAPSHOT_MISMATCH",
                format!(
                    "Snapshot belongs to dialogue \"{}\", not \"{}\"",
                    snapshot.dialogue,
                    dialogue.name()
                ),
            ));
        }
        let Some(current) = snapshot.current else {
            return Err(engine_error(
                "ENGINE_SNAPSHOT_MISMATCH",
                "Snapshot has no current node",
            ));
        };
        if snapshot.state != DialogueState::Active || dialogue.node(current.title()).is_none() {
            return Err(engine_error(
                "ENGINE_SNAPSHOT_MISMATCH",
                format!(
                    "Snapshot node \"{}\" cannot be resumed in dialogue \"{}\"",
                    current.title(),
                    dialogue.name()
                ),
            ));
        }
        debug!("resuming dialogue {} at {}", dialogue.name(), current.title());
        Ok(Self {
            dialogue,
            store,
            state: DialogueState::Active,
            current: Some(current),
            rng_state: snapshot.rng_state,
        })
    }
}
