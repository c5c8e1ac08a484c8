use std::collections::BTreeMap;

use log::debug;
use wool_core::{ErrorKind, Value, WoolError};
use wool_model::{Command, InputCommand, Reply, Segment, AUTOFORWARD_STATEMENT};

use super::lifecycle::ActiveDialogue;
use crate::store::VariableSource;

const ENGINE_INPUT_INVALID: &str = "ENGINE_INPUT_INVALID";

fn input_error(message: impl Into<String>) -> WoolError {
    WoolError::new(ErrorKind::EngineState, ENGINE_INPUT_INVALID, message)
}

fn reply_inputs(reply: &Reply) -> Vec<&InputCommand> {
    let Some(statement) = &reply.statement else {
        return Vec::new();
    };
    statement
        .segments()
        .iter()
        .filter_map(|segment| match segment {
            Segment::Command(Command::Input(input)) => Some(input),
            _ => None,
        })
        .collect()
}

fn check_length(variable: &str, text: &str, min: Option<i64>, max: Option<i64>) -> Result<(), WoolError> {
    let length = text.chars().count() as i64;
    if min.is_some_and(|min| length < min) || max.is_some_and(|max| length > max) {
        return Err(input_error(format!(
            "Input ${} has length {}, expected {}",
            variable,
            length,
            describe_bounds(min, max)
        )));
    }
    Ok(())
}

fn describe_bounds(min: Option<i64>, max: Option<i64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {} and {}", min, max),
        (Some(min), None) => format!("at least {}", min),
        (None, Some(max)) => format!("at most {}", max),
        (None, None) => "any".to_string(),
    }
}

/// Checks one answer against its input field and returns what gets stored.
fn validate_input(
    input: &InputCommand,
    values: &BTreeMap<String, Value>,
) -> Result<Vec<(String, Value)>, WoolError> {
    match input {
        InputCommand::Text { variable, min, max } | InputCommand::LongText { variable, min, max } => {
            let Some(value) = values.get(variable) else {
                return Err(input_error(format!("Missing value for input ${}", variable)));
            };
            let Some(text) = value.as_str() else {
                return Err(input_error(format!(
                    "Input ${} expects a string, got {}",
                    variable,
                    value.type_name()
                )));
            };
            check_length(variable, text, *min, *max)?;
            Ok(vec![(variable.clone(), value.clone())])
        }
        InputCommand::Numeric { variable, min, max } => {
            let Some(value) = values.get(variable) else {
                return Err(input_error(format!("Missing value for input ${}", variable)));
            };
            let Some(number) = value.as_f64() else {
                return Err(input_error(format!(
                    "Input ${} expects a number, got {}",
                    variable,
                    value.type_name()
                )));
            };
            let below = min.is_some_and(|min| number < min as f64);
            let above = max.is_some_and(|max| number > max as f64);
            if below || above {
                return Err(input_error(format!(
                    "Input ${} is {}, expected {}",
                    variable,
                    value,
                    describe_bounds(*min, *max)
                )));
            }
            Ok(vec![(variable.clone(), value.clone())])
        }
        InputCommand::Set { options } => options
            .iter()
            .map(|option| match values.get(&option.variable) {
                None => Ok((option.variable.clone(), Value::Bool(false))),
                Some(Value::Bool(checked)) => Ok((option.variable.clone(), Value::Bool(*checked))),
                Some(other) => Err(input_error(format!(
                    "Input ${} expects a boolean, got {}",
                    option.variable,
                    other.type_name()
                ))),
            })
            .collect(),
    }
}

impl ActiveDialogue {
    /// Validates the answers for the input fields of `reply_id` and writes
    /// them to the store. Nothing is written when any answer is rejected.
    pub fn store_reply_input(
        &mut self,
        reply_id: usize,
        values: &BTreeMap<String, Value>,
    ) -> Result<(), WoolError> {
        let reply = self.current_reply(reply_id)?;
        let inputs = reply_inputs(reply);
        if inputs.is_empty() {
            return Err(input_error(format!("Reply {} has no input fields", reply_id)));
        }
        let mut accepted = Vec::new();
        for input in &inputs {
            accepted.extend(validate_input(input, values)?);
        }
        if let Some(unknown) = values
            .keys()
            .find(|name| !accepted.iter().any(|(variable, _)| variable == *name))
        {
            return Err(input_error(format!(
                "Reply {} has no input field ${}",
                reply_id, unknown
            )));
        }
        debug!("storing {} input values for reply {}", accepted.len(), reply_id);
        let mut store = self.store.borrow_mut();
        for (name, value) in accepted {
            store.set_value(&name, value, VariableSource::Input);
        }
        Ok(())
    }

    /// What the player said by choosing `reply_id`: the statement text with
    /// input fields replaced by the stored answers.
    pub fn user_statement_from_reply_id(&self, reply_id: usize) -> Result<String, WoolError> {
        let reply = self.current_reply(reply_id)?;
        let Some(statement) = &reply.statement else {
            return Ok(AUTOFORWARD_STATEMENT.to_string());
        };
        let store = self.store.borrow();
        let mut parts = Vec::new();
        for segment in statement.segments() {
            match segment {
                Segment::Text(text) => parts.push(text.evaluate(&*store)?.trim().to_string()),
                Segment::Command(Command::Input(InputCommand::Set { options })) => {
                    for option in options {
                        if store.value(&option.variable).is_some_and(Value::is_truthy) {
                            parts.push(option.text.evaluate(&*store)?);
                        }
                    }
                }
                Segment::Command(Command::Input(input)) => {
                    for variable in input.variable_names() {
                        if let Some(value) = store.value(variable) {
                            parts.push(value.to_string());
                        }
                    }
                }
                Segment::Command(_) => {}
            }
        }
        parts.retain(|part| !part.is_empty());
        Ok(parts.join(" "))
    }
}
