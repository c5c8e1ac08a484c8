use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::trace;
use serde::{Deserialize, Serialize};
use wool_core::{Value, WoolError};
use wool_expr::{Environment, UnknownVariablePolicy};

/// Who wrote a variable. Listeners use it to tell script writes from
/// player input and host updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableSource {
    Engine,
    Input,
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableChange {
    pub name: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
    pub source: VariableSource,
}

pub type ListenerId = usize;

type Listener = Box<dyn FnMut(&VariableChange)>;

/// Variables of one player, possibly shared by several dialogues.
/// Listeners run synchronously after each effective change and must not
/// reach back into the store.
pub struct VariableStore {
    values: BTreeMap<String, Value>,
    policy: UnknownVariablePolicy,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
}

pub type SharedVariableStore = Rc<RefCell<VariableStore>>;

impl fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableStore")
            .field("values", &self.values)
            .field("policy", &self.policy)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new(UnknownVariablePolicy::default())
    }
}

impl VariableStore {
    pub fn new(policy: UnknownVariablePolicy) -> Self {
        Self {
            values: BTreeMap::new(),
            policy,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    pub fn with_values(values: BTreeMap<String, Value>, policy: UnknownVariablePolicy) -> Self {
        Self {
            values,
            ..Self::new(policy)
        }
    }

    pub fn shared(self) -> SharedVariableStore {
        Rc::new(RefCell::new(self))
    }

    pub fn policy(&self) -> UnknownVariablePolicy {
        self.policy
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn on_change(&mut self, listener: impl FnMut(&VariableChange) + 'static) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn set_value(&mut self, name: &str, value: Value, source: VariableSource) {
        let old = self.values.insert(name.to_string(), value.clone());
        if old.as_ref() == Some(&value) {
            return;
        }
        trace!("variable {} set to {} by {:?}", name, value, source);
        self.notify(VariableChange {
            name: name.to_string(),
            old,
            new: Some(value),
            source,
        });
    }

    pub fn remove(&mut self, name: &str, source: VariableSource) -> Option<Value> {
        let old = self.values.remove(name)?;
        trace!("variable {} removed by {:?}", name, source);
        self.notify(VariableChange {
            name: name.to_string(),
            old: Some(old.clone()),
            new: None,
            source,
        });
        Some(old)
    }

    pub fn clear(&mut self, source: VariableSource) {
        let names: Vec<String> = self.values.keys().cloned().collect();
        for name in names {
            self.remove(&name, source);
        }
    }

    fn notify(&mut self, change: VariableChange) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }
}

impl Environment for VariableStore {
    fn get(&self, name: &str) -> Result<Value, WoolError> {
        match self.values.get(name) {
            Some(value) => Ok(value.clone()),
            None => self.policy.resolve_missing(name),
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), WoolError> {
        self.set_value(name, value, VariableSource::Engine);
        Ok(())
    }
}
