use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SourceSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Lex,
    Parse,
    Evaluation,
    UnknownVariable,
    DialogueStructure,
    EngineState,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lex => "lex",
            Self::Parse => "parse",
            Self::Evaluation => "evaluation",
            Self::UnknownVariable => "unknownVariable",
            Self::DialogueStructure => "dialogueStructure",
            Self::EngineState => "engineState",
            Self::Io => "io",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{code}: {message}")]
pub struct WoolError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl WoolError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(
        kind: ErrorKind,
        code: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            span: Some(span),
        }
    }

    /// Attaches a span unless the error already carries a more precise one.
    pub fn or_span(mut self, span: SourceSpan) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn describe(&self) -> String {
        match &self.span {
            Some(span) => format!("Error at {}: {}", span.start, self.message),
            None => self.message.clone(),
        }
    }
}

/// Bulk result of a parse: every problem found, in source order.
#[derive(Debug, Error, Clone, Default, PartialEq)]
pub struct ErrorList {
    pub errors: Vec<WoolError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: WoolError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WoolError> {
        self.errors.iter()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ErrorList> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error.describe())?;
        }
        Ok(())
    }
}

impl From<WoolError> for ErrorList {
    fn from(error: WoolError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl From<ErrorList> for WoolError {
    fn from(list: ErrorList) -> Self {
        let Some(first) = list.errors.first() else {
            return WoolError::new(ErrorKind::Parse, "PARSE_ERRORS", "Unknown parse failure.");
        };
        if list.errors.len() == 1 {
            return first.clone();
        }
        WoolError {
            kind: first.kind,
            code: first.code.clone(),
            message: format!("{} errors found:\n{}", list.errors.len(), list),
            span: first.span,
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_uses_code_and_message() {
        let error = WoolError::new(ErrorKind::Evaluation, "EVAL_TYPE", "bad operand");
        assert_eq!(error.to_string(), "EVAL_TYPE: bad operand");
    }

    #[test]
    fn or_span_keeps_existing_span() {
        let error = WoolError::with_span(ErrorKind::Lex, "X", "m", SourceSpan::at(2, 3))
            .or_span(SourceSpan::at(9, 9));
        assert_eq!(error.span, Some(SourceSpan::at(2, 3)));

        let error = WoolError::new(ErrorKind::Lex, "X", "m").or_span(SourceSpan::at(9, 9));
        assert_eq!(error.describe(), "Error at line 9, column 9: m");
    }

    #[test]
    fn error_list_collapses_into_first_error_with_joined_message() {
        let mut list = ErrorList::new();
        list.push(WoolError::with_span(
            ErrorKind::Parse,
            "BODY_PARSE",
            "first",
            SourceSpan::at(1, 1),
        ));
        list.push(WoolError::new(
            ErrorKind::DialogueStructure,
            "DIALOGUE_NODE_NOT_FOUND",
            "second",
        ));

        let error = WoolError::from(list.clone());
        assert_eq!(error.code, "BODY_PARSE");
        assert_eq!(error.kind, ErrorKind::Parse);
        assert!(error.message.starts_with("2 errors found"));
        assert!(error.message.contains("second"));
        assert!(list.into_result(()).is_err());
        assert!(ErrorList::new().into_result(5).is_ok());
    }
}
