use wool_core::{ErrorKind, SourceLocation, SourceSpan, WoolError};

use crate::token::{BodyToken, BodyTokenKind};

/// Forward-only view over a token slice. Sub-sections (reply parts,
/// command arguments) are parsed with their own cursor over a sub-slice.
#[derive(Debug, Clone)]
pub(crate) struct TokenCursor<'a> {
    tokens: &'a [BodyToken],
    pos: usize,
    end: SourceLocation,
}

impl<'a> TokenCursor<'a> {
    pub(crate) fn new(tokens: &'a [BodyToken], end: SourceLocation) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    pub(crate) fn peek(&self) -> Option<&'a BodyToken> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&'a BodyToken> {
        self.tokens.get(self.pos + offset)
    }

    pub(crate) fn next(&mut self) -> Option<&'a BodyToken> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Position of the next token, or of the end of the section.
    pub(crate) fn location(&self) -> SourceLocation {
        self.peek().map(|token| token.location).unwrap_or(self.end)
    }

    pub(crate) fn expect(
        &mut self,
        kind: BodyTokenKind,
        what: &str,
    ) -> Result<&'a BodyToken, WoolError> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(parse_error(
                "BODY_PARSE",
                format!("Expected {} but found {}", what, token.describe()),
                token.location,
            )),
            None => Err(parse_error(
                "BODY_PARSE",
                format!("Expected {} but reached the end of the body", what),
                self.end,
            )),
        }
    }

    /// Consumes tokens up to (not including) the first token of `kind`.
    pub(crate) fn take_until(&mut self, kind: BodyTokenKind) -> &'a [BodyToken] {
        let start = self.pos;
        while self.peek().is_some_and(|token| token.kind != kind) {
            self.pos += 1;
        }
        &self.tokens[start..self.pos]
    }
}

pub(crate) fn parse_error(
    code: &str,
    message: impl Into<String>,
    location: SourceLocation,
) -> WoolError {
    WoolError::with_span(
        ErrorKind::Parse,
        code,
        message,
        SourceSpan::at(location.line, location.column),
    )
}
