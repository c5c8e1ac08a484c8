use wool_core::SourceLocation;
use wool_model::VariableString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTokenKind {
    Text,
    Variable,
    CommandStart,
    CommandEnd,
    ReplyStart,
    ReplyEnd,
    ReplySeparator,
    QuotedString,
}

/// `raw` is the exact source text, escapes and quotes included, so command
/// arguments can be handed back to the expression parser. `value` is the
/// decoded content for text, variable and quoted-string tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyToken {
    pub kind: BodyTokenKind,
    pub raw: String,
    pub value: VariableString,
    pub location: SourceLocation,
}

impl BodyToken {
    pub(crate) fn delimiter(kind: BodyTokenKind, raw: &str, location: SourceLocation) -> Self {
        Self {
            kind,
            raw: raw.to_string(),
            value: VariableString::new(),
            location,
        }
    }

    pub fn describe(&self) -> String {
        match self.kind {
            BodyTokenKind::Text => format!("text \"{}\"", self.raw.trim()),
            BodyTokenKind::Variable => format!("variable {}", self.raw),
            BodyTokenKind::QuotedString => format!("string {}", self.raw),
            _ => format!("\"{}\"", self.raw),
        }
    }
}
