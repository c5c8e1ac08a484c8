use wool_core::{ErrorKind, SourceLocation, SourceSpan, WoolError};
use wool_model::VariableString;

use crate::token::{BodyToken, BodyTokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexMode {
    Command,
    Reply,
}

/// Splits a node body into tokens. Whitespace and line breaks are kept as
/// text; trimming happens once the body is assembled.
pub fn tokenize_body(source: &str, origin: SourceLocation) -> Result<Vec<BodyToken>, WoolError> {
    let mut lexer = BodyLexer {
        chars: source.chars().collect(),
        pos: 0,
        line: origin.line,
        column: origin.column,
        modes: Vec::new(),
        tokens: Vec::new(),
        pending: None,
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct PendingText {
    raw: String,
    value: String,
    location: SourceLocation,
}

struct BodyLexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    modes: Vec<(LexMode, SourceLocation)>,
    tokens: Vec<BodyToken>,
    pending: Option<PendingText>,
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl BodyLexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn mode(&self) -> Option<LexMode> {
        self.modes.last().map(|(mode, _)| *mode)
    }

    fn error(&self, location: SourceLocation, message: impl Into<String>) -> WoolError {
        WoolError::with_span(
            ErrorKind::Lex,
            "BODY_LEX",
            message,
            SourceSpan::between(location, self.location()),
        )
    }

    fn push_literal(&mut self, raw: &str, value: char) {
        let location = self.location();
        let pending = self.pending.get_or_insert_with(|| PendingText {
            raw: String::new(),
            value: String::new(),
            location,
        });
        pending.raw.push_str(raw);
        pending.value.push(value);
    }

    fn flush(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.tokens.push(BodyToken {
                kind: BodyTokenKind::Text,
                raw: pending.raw,
                value: VariableString::from_text(pending.value),
                location: pending.location,
            });
        }
    }

    fn delimiter(&mut self, kind: BodyTokenKind, raw: &str) -> SourceLocation {
        self.flush();
        let location = self.location();
        for _ in raw.chars() {
            self.advance();
        }
        self.tokens.push(BodyToken::delimiter(kind, raw, location));
        location
    }

    fn run(&mut self) -> Result<(), WoolError> {
        while let Some(ch) = self.peek() {
            let next = self.peek_at(1);
            match (ch, next) {
                ('\\', _) => {
                    self.advance();
                    match self.peek() {
                        Some(escaped) => {
                            let raw = format!("\\{}", escaped);
                            self.push_literal(&raw, escaped);
                            self.advance();
                        }
                        None => self.push_literal("\\", '\\'),
                    }
                }
                ('/', Some('/')) => {
                    while self.peek().is_some_and(|ch| ch != '\n') {
                        self.advance();
                    }
                }
                ('<', Some('<')) => {
                    if self.mode() == Some(LexMode::Command) {
                        return Err(self.error(self.location(), "Found << inside <<...>>"));
                    }
                    let location = self.delimiter(BodyTokenKind::CommandStart, "<<");
                    self.modes.push((LexMode::Command, location));
                }
                ('>', Some('>')) => {
                    if self.mode() != Some(LexMode::Command) {
                        return Err(self.error(self.location(), "Found >> without matching <<"));
                    }
                    self.delimiter(BodyTokenKind::CommandEnd, ">>");
                    self.modes.pop();
                }
                ('[', Some('[')) => match self.mode() {
                    None => {
                        let location = self.delimiter(BodyTokenKind::ReplyStart, "[[");
                        self.modes.push((LexMode::Reply, location));
                    }
                    Some(LexMode::Command) => {
                        return Err(self.error(self.location(), "Found [[ inside <<...>>"));
                    }
                    Some(LexMode::Reply) => {
                        return Err(self.error(self.location(), "Found [[ inside [[...]]"));
                    }
                },
                (']', Some(']')) => match self.mode() {
                    Some(LexMode::Reply) => {
                        self.delimiter(BodyTokenKind::ReplyEnd, "]]");
                        self.modes.pop();
                    }
                    Some(LexMode::Command) => {
                        return Err(self.error(self.location(), "Found ]] inside <<...>>"));
                    }
                    None => {
                        return Err(self.error(self.location(), "Found ]] without matching [["));
                    }
                },
                ('|', _) if self.mode() == Some(LexMode::Reply) => {
                    self.delimiter(BodyTokenKind::ReplySeparator, "|");
                }
                ('"', _) if self.mode() == Some(LexMode::Command) => {
                    self.flush();
                    self.read_quoted(ch)?;
                }
                ('$', Some(next)) if is_name_char(next) => {
                    self.flush();
                    self.read_variable();
                }
                _ => {
                    self.push_literal(&ch.to_string(), ch);
                    self.advance();
                }
            }
        }
        self.flush();
        if let Some((mode, location)) = self.modes.last() {
            let opener = match mode {
                LexMode::Command => "<<",
                LexMode::Reply => "[[",
            };
            return Err(self.error(*location, format!("Unclosed {}", opener)));
        }
        Ok(())
    }

    /// Called on a `$` followed by a name character; any other `$` is text.
    fn read_variable(&mut self) {
        let location = self.location();
        self.advance();
        let mut name = String::new();
        while let Some(ch) = self.peek().filter(|ch| is_name_char(*ch)) {
            name.push(ch);
            self.advance();
        }
        let mut value = VariableString::new();
        value.push_variable(name.as_str());
        self.tokens.push(BodyToken {
            kind: BodyTokenKind::Variable,
            raw: format!("${}", name),
            value,
            location,
        });
    }

    fn read_quoted(&mut self, quote: char) -> Result<(), WoolError> {
        let location = self.location();
        let mut raw = String::from(quote);
        let mut value = VariableString::new();
        self.advance();
        loop {
            let Some(ch) = self.advance() else {
                return Err(self.error(location, "Unterminated string"));
            };
            if ch == quote {
                raw.push(ch);
                break;
            }
            match ch {
                '\\' => {
                    let Some(escaped) = self.advance() else {
                        return Err(self.error(location, "Unterminated string"));
                    };
                    raw.push('\\');
                    raw.push(escaped);
                    value.push_text(escaped.to_string());
                }
                '$' if self.peek().is_some_and(is_name_char) => {
                    let mut name = String::new();
                    while let Some(ch) = self.peek().filter(|ch| is_name_char(*ch)) {
                        name.push(ch);
                        self.advance();
                    }
                    raw.push('$');
                    raw.push_str(&name);
                    value.push_variable(name);
                }
                _ => {
                    raw.push(ch);
                    value.push_text(ch.to_string());
                }
            }
        }
        self.tokens.push(BodyToken {
            kind: BodyTokenKind::QuotedString,
            raw,
            value,
            location,
        });
        Ok(())
    }
}

#[cfg(test)]
mod lexer_tests {
    use super::*;

    fn kinds(source: &str) -> Vec<BodyTokenKind> {
        tokenize_body(source, SourceLocation::new(1, 1))
            .expect("body should tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn text_variables_and_delimiters() {
        use BodyTokenKind::*;
        assert_eq!(
            kinds("Hi $name <<set $x = 1>>[[Ok|Next]]"),
            vec![
                Text, Variable, Text, CommandStart, Text, Variable, Text, CommandEnd, ReplyStart,
                Text, ReplySeparator, Text, ReplyEnd
            ]
        );
    }

    #[test]
    fn escapes_stay_in_one_text_token() {
        let tokens = tokenize_body("Costs 5\\$ today \\<<", SourceLocation::new(1, 1))
            .expect("escaped body should tokenize");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value.plain_text().as_deref(), Some("Costs 5$ today <<"));
        assert_eq!(tokens[0].raw, "Costs 5\\$ today \\<<");
    }

    #[test]
    fn comments_are_skipped_outside_strings() {
        let tokens = tokenize_body(
            "Hello // hidden\n<<action type=\"generic\" value=\"http://x\">>",
            SourceLocation::new(1, 1),
        )
        .expect("body should tokenize");
        assert_eq!(tokens[0].value.plain_text().as_deref(), Some("Hello \n"));
        let quoted = tokens
            .iter()
            .filter(|token| token.kind == BodyTokenKind::QuotedString)
            .nth(1)
            .expect("value string should exist");
        assert_eq!(quoted.value.plain_text().as_deref(), Some("http://x"));
    }

    #[test]
    fn quoted_strings_keep_variable_references() {
        let tokens = tokenize_body("<<input value=\"$Name\">>", SourceLocation::new(1, 1))
            .expect("body should tokenize");
        let quoted = &tokens[2];
        assert_eq!(quoted.kind, BodyTokenKind::QuotedString);
        assert_eq!(quoted.value.to_string(), "$Name");
    }

    #[test]
    fn nesting_errors_carry_positions() {
        let error = tokenize_body("a\n<<if <<", SourceLocation::new(3, 1))
            .expect_err("nested << should fail");
        assert_eq!(error.code, "BODY_LEX");
        assert_eq!(error.kind, ErrorKind::Lex);
        assert_eq!(error.span.map(|span| span.start.line), Some(4));

        let error = tokenize_body("[[Hi|Next", SourceLocation::new(1, 1))
            .expect_err("unclosed reply should fail");
        assert!(error.message.contains("Unclosed [["));

        let error = tokenize_body("a >> b", SourceLocation::new(1, 1))
            .expect_err("stray >> should fail");
        assert!(error.message.contains(">>"));
    }

    #[test]
    fn dollar_without_a_name_is_text() {
        let tokens =
            tokenize_body("5$ only", SourceLocation::new(1, 1)).expect("bare $ should be text");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, BodyTokenKind::Text);
        assert_eq!(tokens[0].value.plain_text().as_deref(), Some("5$ only"));

        let tokens = tokenize_body("It costs 5$ today, $price$", SourceLocation::new(1, 1))
            .expect("body should tokenize");
        let kinds: Vec<_> = tokens.iter().map(|token| token.kind).collect();
        assert_eq!(
            kinds,
            vec![BodyTokenKind::Text, BodyTokenKind::Variable, BodyTokenKind::Text]
        );
        assert_eq!(tokens[0].value.plain_text().as_deref(), Some("It costs 5$ today, "));
        assert_eq!(tokens[2].value.plain_text().as_deref(), Some("$"));
    }

    #[test]
    fn only_double_quotes_open_strings_in_commands() {
        let tokens = tokenize_body("<<set $mood = 'it is'>>", SourceLocation::new(1, 1))
            .expect("body should tokenize");
        assert!(tokens
            .iter()
            .all(|token| token.kind != BodyTokenKind::QuotedString));
        let raw: String = tokens.iter().map(|token| token.raw.as_str()).collect();
        assert_eq!(raw, "<<set $mood = 'it is'>>");
    }
}
