use wool_core::{ErrorKind, SourceLocation, SourceSpan, Value, WoolError};

use crate::token::{ExprToken, ExprTokenKind};

/// Splits expression source into tokens. `origin` is the position of the
/// first character inside the enclosing script, so errors point at the
/// right place when the expression is embedded in a command.
pub fn tokenize_expression(
    source: &str,
    origin: SourceLocation,
) -> Result<Vec<ExprToken>, WoolError> {
    let mut lexer = ExprLexer {
        chars: source.chars().collect(),
        pos: 0,
        line: origin.line,
        column: origin.column,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct ExprLexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl ExprLexer {
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

    fn error(&self, location: SourceLocation, message: impl Into<String>) -> WoolError {
        WoolError::with_span(
            ErrorKind::Lex,
            "EXPR_LEX",
            message,
            SourceSpan::between(location, self.location()),
        )
    }

    fn next_token(&mut self) -> Result<Option<ExprToken>, WoolError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
        let start = self.location();
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        if ch.is_ascii_digit() {
            return self.read_number(start).map(Some);
        }
        if ch == '"' || ch == '\'' {
            return self.read_string(start).map(Some);
        }
        if ch == '$' {
            self.advance();
            if !self.peek().is_some_and(is_name_start) {
                return Err(self.error(start, "Expected variable name after \"$\""));
            }
            let name = self.read_name();
            return Ok(Some(ExprToken {
                kind: ExprTokenKind::Name,
                text: format!("${}", name),
                value: Value::String(name),
                location: start,
            }));
        }
        if is_name_start(ch) {
            let word = self.read_name();
            return Ok(Some(keyword_or_name(word, start)));
        }

        let two: String = [Some(ch), self.peek_at(1)].iter().flatten().collect();
        let double = match two.as_str() {
            "&&" => Some(ExprTokenKind::And),
            "||" => Some(ExprTokenKind::Or),
            "==" => Some(ExprTokenKind::Equal),
            "!=" => Some(ExprTokenKind::NotEqual),
            "<=" => Some(ExprTokenKind::LessEqual),
            ">=" => Some(ExprTokenKind::GreaterEqual),
            _ => None,
        };
        if let Some(kind) = double {
            self.advance();
            self.advance();
            return Ok(Some(symbol(kind, two, start)));
        }

        let single = match ch {
            '!' => ExprTokenKind::Not,
            '<' => ExprTokenKind::LessThan,
            '>' => ExprTokenKind::GreaterThan,
            '=' => ExprTokenKind::Assign,
            '+' => ExprTokenKind::Add,
            '-' => ExprTokenKind::Subtract,
            '*' => ExprTokenKind::Multiply,
            '/' => ExprTokenKind::Divide,
            '.' => ExprTokenKind::Dot,
            '[' => ExprTokenKind::BracketOpen,
            ']' => ExprTokenKind::BracketClose,
            '(' => ExprTokenKind::ParenthesisOpen,
            ')' => ExprTokenKind::ParenthesisClose,
            '{' => ExprTokenKind::BraceOpen,
            '}' => ExprTokenKind::BraceClose,
            ',' => ExprTokenKind::Comma,
            ':' => ExprTokenKind::Colon,
            _ => {
                self.advance();
                return Err(self.error(start, format!("Unexpected character \"{}\"", ch)));
            }
        };
        self.advance();
        Ok(Some(symbol(single, ch.to_string(), start)))
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if !is_name_part(ch) {
                break;
            }
            name.push(ch);
            self.advance();
        }
        name
    }

    fn read_number(&mut self, start: SourceLocation) -> Result<ExprToken, WoolError> {
        let mut text = String::new();
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            text.push(ch);
            self.advance();
        }
        let is_float = self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if is_float {
            text.push('.');
            self.advance();
            while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
                text.push(ch);
                self.advance();
            }
        }
        if self.peek().is_some_and(is_name_start) {
            let rest = self.read_name();
            return Err(self.error(start, format!("Invalid number \"{}{}\"", text, rest)));
        }

        let value = if is_float {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.error(start, format!("Invalid number \"{}\"", text)))?
        } else {
            text.parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.error(start, format!("Number out of range \"{}\"", text)))?
        };
        Ok(ExprToken {
            kind: ExprTokenKind::Number,
            text,
            value,
            location: start,
        })
    }

    fn read_string(&mut self, start: SourceLocation) -> Result<ExprToken, WoolError> {
        let quote = self.advance().unwrap_or('"');
        let mut text = quote.to_string();
        let mut decoded = String::new();
        loop {
            let Some(ch) = self.advance() else {
                return Err(self.error(start, "String not terminated"));
            };
            text.push(ch);
            if ch == quote {
                break;
            }
            if ch != '\\' {
                decoded.push(ch);
                continue;
            }
            let Some(escaped) = self.advance() else {
                return Err(self.error(start, "String not terminated"));
            };
            text.push(escaped);
            decoded.push(match escaped {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            });
        }
        Ok(ExprToken {
            kind: ExprTokenKind::String,
            text,
            value: Value::String(decoded),
            location: start,
        })
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_name_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn symbol(kind: ExprTokenKind, text: String, location: SourceLocation) -> ExprToken {
    ExprToken {
        kind,
        text,
        value: Value::Null,
        location,
    }
}

fn keyword_or_name(word: String, location: SourceLocation) -> ExprToken {
    let (kind, value) = match word.as_str() {
        "and" => (ExprTokenKind::And, Value::Null),
        "or" => (ExprTokenKind::Or, Value::Null),
        "not" => (ExprTokenKind::Not, Value::Null),
        "in" => (ExprTokenKind::In, Value::Null),
        "to" => (ExprTokenKind::Assign, Value::Null),
        "true" => (ExprTokenKind::Boolean, Value::Bool(true)),
        "false" => (ExprTokenKind::Boolean, Value::Bool(false)),
        "null" => (ExprTokenKind::Null, Value::Null),
        _ => (ExprTokenKind::Name, Value::String(word.clone())),
    };
    ExprToken {
        kind,
        text: word,
        value,
        location,
    }
}
