use std::collections::BTreeMap;

use wool_core::{ErrorKind, Value, WoolError};
use wool_model::{Command, InputCommand, Reply, Segment};

fn arg_error(message: String) -> WoolError {
    WoolError::new(ErrorKind::Parse, "CLI_ARG_INVALID", message)
}

/// Splits `name=value`; a leading `$` on the name is dropped.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, String), WoolError> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(arg_error(format!("Expected name=value, got \"{}\"", raw)));
    };
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(arg_error(format!("Missing variable name in \"{}\"", raw)));
    }
    Ok((name.to_string(), value.to_string()))
}

/// JSON when it parses as JSON, plain text otherwise.
pub(crate) fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn parse_variables(pairs: &[String]) -> Result<BTreeMap<String, Value>, WoolError> {
    pairs
        .iter()
        .map(|raw| {
            let (name, value) = parse_assignment(raw)?;
            Ok((name, parse_cli_value(&value)))
        })
        .collect()
}

pub(crate) fn reply_input_fields(reply: &Reply) -> Vec<&InputCommand> {
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

fn parse_flag(raw: &str) -> Value {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "x" => Value::Bool(true),
        "false" | "no" | "n" | "0" | "" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn parse_number(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Int(int);
    }
    match trimmed.parse::<f64>() {
        Ok(float) => Value::Float(float),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Reads one raw answer the way the input field holding `name` expects it:
/// text stays text, numeric fields parse numbers and set options parse
/// yes/no flags. Names without a field fall back to `parse_cli_value`.
pub(crate) fn answer_value(fields: &[&InputCommand], name: &str, raw: &str) -> Value {
    let field = fields
        .iter()
        .find(|field| field.variable_names().contains(&name));
    match field {
        Some(InputCommand::Text { .. }) | Some(InputCommand::LongText { .. }) => {
            Value::String(raw.to_string())
        }
        Some(InputCommand::Numeric { .. }) => parse_number(raw),
        Some(InputCommand::Set { .. }) => parse_flag(raw),
        None => parse_cli_value(raw),
    }
}

pub(crate) fn parse_answers(
    reply: &Reply,
    pairs: &[String],
) -> Result<BTreeMap<String, Value>, WoolError> {
    let fields = reply_input_fields(reply);
    pairs
        .iter()
        .map(|raw| {
            let (name, value) = parse_assignment(raw)?;
            let value = answer_value(&fields, &name, &value);
            Ok((name, value))
        })
        .collect()
}
