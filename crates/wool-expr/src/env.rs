use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wool_core::{ErrorKind, Value, WoolError};

/// Name to value mapping that expressions read from and assign into.
pub trait Environment {
    fn get(&self, name: &str) -> Result<Value, WoolError>;
    fn set(&mut self, name: &str, value: Value) -> Result<(), WoolError>;
}

/// What reading an undefined variable does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnknownVariablePolicy {
    #[default]
    Null,
    Fail,
}

impl UnknownVariablePolicy {
    pub fn resolve_missing(&self, name: &str) -> Result<Value, WoolError> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Fail => Err(WoolError::new(
                ErrorKind::UnknownVariable,
                "EVAL_UNKNOWN_VARIABLE",
                format!("Unknown variable \"{}\"", name),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapEnvironment {
    values: BTreeMap<String, Value>,
    policy: UnknownVariablePolicy,
}

impl MapEnvironment {
    pub fn new(policy: UnknownVariablePolicy) -> Self {
        Self {
            values: BTreeMap::new(),
            policy,
        }
    }

    pub fn with_values(values: BTreeMap<String, Value>, policy: UnknownVariablePolicy) -> Self {
        Self { values, policy }
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, Value> {
        self.values
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }
}

impl Environment for MapEnvironment {
    fn get(&self, name: &str) -> Result<Value, WoolError> {
        match self.values.get(name) {
            Some(value) => Ok(value.clone()),
            None => self.policy.resolve_missing(name),
        }
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), WoolError> {
        self.values.insert(name.to_string(), value);
        Ok(())
    }
}
