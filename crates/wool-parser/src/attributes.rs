use std::collections::BTreeMap;

use wool_core::{SourceLocation, WoolError};
use wool_model::{StringPart, VariableString};

use crate::cursor::parse_error;
use crate::token::{BodyToken, BodyTokenKind};

const COMMAND_PARSE: &str = "COMMAND_PARSE";

enum AttrState {
    BeforeName,
    Name(String),
    AfterName(String),
    BeforeValue(String),
}

fn is_attr_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// `name="value"` pairs of an attribute-style command. Readers remove what
/// they consume so leftovers can be reported or passed through.
#[derive(Debug, Clone)]
pub(crate) struct Attributes {
    command: String,
    location: SourceLocation,
    values: BTreeMap<String, VariableString>,
}

impl Attributes {
    pub(crate) fn parse(
        command: &str,
        location: SourceLocation,
        tokens: &[BodyToken],
    ) -> Result<Self, WoolError> {
        let mut attributes = Self {
            command: command.to_string(),
            location,
            values: BTreeMap::new(),
        };
        let mut state = AttrState::BeforeName;
        for token in tokens {
            match token.kind {
                BodyTokenKind::Text => {
                    for ch in token.raw.chars() {
                        state = attributes.step(state, ch, token.location)?;
                    }
                }
                BodyTokenKind::QuotedString => {
                    let AttrState::BeforeValue(name) = state else {
                        return Err(attributes.error(
                            format!("Unexpected {}", token.describe()),
                            token.location,
                        ));
                    };
                    if attributes.values.contains_key(&name) {
                        return Err(attributes.error(
                            format!("Duplicate attribute \"{}\"", name),
                            token.location,
                        ));
                    }
                    attributes.values.insert(name, token.value.clone());
                    state = AttrState::BeforeName;
                }
                _ => {
                    return Err(attributes.error(
                        format!("Attribute values must be quoted, found {}", token.describe()),
                        token.location,
                    ));
                }
            }
        }
        match state {
            AttrState::BeforeName => Ok(attributes),
            AttrState::Name(name) | AttrState::AfterName(name) | AttrState::BeforeValue(name) => {
                Err(attributes.error(format!("Attribute \"{}\" has no value", name), location))
            }
        }
    }

    fn step(
        &self,
        state: AttrState,
        ch: char,
        location: SourceLocation,
    ) -> Result<AttrState, WoolError> {
        let next = match state {
            AttrState::BeforeName if ch.is_whitespace() => AttrState::BeforeName,
            AttrState::BeforeName if is_attr_name_char(ch) => AttrState::Name(ch.to_string()),
            AttrState::Name(mut name) if is_attr_name_char(ch) => {
                name.push(ch);
                AttrState::Name(name)
            }
            AttrState::Name(name) | AttrState::AfterName(name) if ch.is_whitespace() => {
                AttrState::AfterName(name)
            }
            AttrState::Name(name) | AttrState::AfterName(name) if ch == '=' => {
                AttrState::BeforeValue(name)
            }
            AttrState::AfterName(name) => {
                return Err(self.error(format!("Attribute \"{}\" has no value", name), location));
            }
            AttrState::BeforeValue(name) if ch.is_whitespace() => AttrState::BeforeValue(name),
            AttrState::BeforeValue(name) => {
                return Err(self.error(
                    format!("Value of attribute \"{}\" must be quoted", name),
                    location,
                ));
            }
            AttrState::BeforeName | AttrState::Name(_) => {
                return Err(self.error(format!("Unexpected character '{}'", ch), location));
            }
        };
        Ok(next)
    }

    fn error(&self, message: impl Into<String>, location: SourceLocation) -> WoolError {
        parse_error(
            COMMAND_PARSE,
            format!("{} in <<{}>>", message.into(), self.command),
            location,
        )
    }

    pub(crate) fn read_attr(&mut self, name: &str) -> Option<VariableString> {
        self.values.remove(name)
    }

    pub(crate) fn read_required_attr(&mut self, name: &str) -> Result<VariableString, WoolError> {
        self.read_attr(name).ok_or_else(|| {
            self.error(format!("Missing attribute \"{}\"", name), self.location)
        })
    }

    pub(crate) fn read_plain_text_attr(&mut self, name: &str) -> Result<Option<String>, WoolError> {
        let Some(value) = self.read_attr(name) else {
            return Ok(None);
        };
        match value.plain_text() {
            Some(text) => Ok(Some(text)),
            None => Err(self.error(
                format!("Attribute \"{}\" must be plain text", name),
                self.location,
            )),
        }
    }

    /// A value that is exactly one `$variable` reference.
    pub(crate) fn read_variable_attr(&mut self, name: &str) -> Result<Option<String>, WoolError> {
        let Some(value) = self.read_attr(name) else {
            return Ok(None);
        };
        match value.parts() {
            [StringPart::Variable { name }] => Ok(Some(name.clone())),
            _ => Err(self.error(
                format!("Attribute \"{}\" must be a single $variable", name),
                self.location,
            )),
        }
    }

    pub(crate) fn read_int_attr(
        &mut self,
        name: &str,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<Option<i64>, WoolError> {
        let Some(text) = self.read_plain_text_attr(name)? else {
            return Ok(None);
        };
        let Ok(number) = text.trim().parse::<i64>() else {
            return Err(self.error(
                format!("Attribute \"{}\" must be an integer, found \"{}\"", name, text),
                self.location,
            ));
        };
        if min.is_some_and(|min| number < min) || max.is_some_and(|max| number > max) {
            return Err(self.error(
                format!("Attribute \"{}\" is out of range: {}", name, number),
                self.location,
            ));
        }
        Ok(Some(number))
    }

    pub(crate) fn read_float_attr(
        &mut self,
        name: &str,
        min: Option<f64>,
    ) -> Result<Option<f64>, WoolError> {
        let Some(text) = self.read_plain_text_attr(name)? else {
            return Ok(None);
        };
        let number = match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => number,
            _ => {
                return Err(self.error(
                    format!("Attribute \"{}\" must be a number, found \"{}\"", name, text),
                    self.location,
                ));
            }
        };
        if min.is_some_and(|min| number < min) {
            return Err(self.error(
                format!("Attribute \"{}\" is out of range: {}", name, number),
                self.location,
            ));
        }
        Ok(Some(number))
    }

    /// Fails when any attribute was left unread.
    pub(crate) fn finish(self) -> Result<(), WoolError> {
        match self.values.keys().next() {
            Some(name) => Err(self.error(format!("Unknown attribute \"{}\"", name), self.location)),
            None => Ok(()),
        }
    }

    pub(crate) fn into_remaining(self) -> BTreeMap<String, VariableString> {
        self.values
    }
}
