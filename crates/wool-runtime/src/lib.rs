mod engine;
mod store;

pub use engine::{
    execute_body, ActiveDialogue, ActiveDialogueOptions, DialogueSnapshot, DialogueState,
    ExecutedNode, Progress, DIALOGUE_SNAPSHOT_SCHEMA,
};
pub use store::{
    ListenerId, SharedVariableStore, VariableChange, VariableSource, VariableStore,
};
