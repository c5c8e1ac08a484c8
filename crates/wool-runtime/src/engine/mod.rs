mod execute;
mod input;
mod lifecycle;
mod rng;
mod snapshot;

#[cfg(test)]
mod lifecycle_tests;

pub use execute::execute_body;
pub use lifecycle::{
    ActiveDialogue, ActiveDialogueOptions, DialogueState, ExecutedNode, Progress,
};
pub use snapshot::{DialogueSnapshot, DIALOGUE_SNAPSHOT_SCHEMA};

#[cfg(test)]
pub(crate) mod runtime_test_support {
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use wool_core::Value;
    use wool_expr::UnknownVariablePolicy;
    use wool_model::Dialogue;
    use wool_parser::parse_dialogue;

    use super::{ActiveDialogue, ActiveDialogueOptions};
    use crate::store::{SharedVariableStore, VariableStore};

    pub(crate) fn dialogue(source: &str) -> Rc<Dialogue> {
        Rc::new(parse_dialogue("main", source).expect("dialogue should parse"))
    }

    pub(crate) fn store(entries: &[(&str, Value)]) -> SharedVariableStore {
        let values: BTreeMap<String, Value> = entries
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect();
        VariableStore::with_values(values, UnknownVariablePolicy::Null).shared()
    }

    pub(crate) fn engine(source: &str, entries: &[(&str, Value)]) -> ActiveDialogue {
        ActiveDialogue::new(
            dialogue(source),
            store(entries),
            ActiveDialogueOptions { random_seed: Some(1) },
        )
    }
}
