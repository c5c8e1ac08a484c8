use wool_core::{ErrorKind, SourceLocation, SourceSpan, Value, WoolError};

use crate::ast::{BinaryOperator, Expression, ObjectEntry};
use crate::lexer::tokenize_expression;
use crate::token::{ExprToken, ExprTokenKind};

pub fn parse_expression(source: &str) -> Result<Expression, WoolError> {
    parse_expression_at(source, SourceLocation::new(1, 1))
}

/// Parses a complete expression; trailing tokens are an error.
pub fn parse_expression_at(source: &str, origin: SourceLocation) -> Result<Expression, WoolError> {
    let tokens = tokenize_expression(source, origin)?;
    let end = end_location(source, origin);
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        end,
    };
    let expression = parser.parse_assignment()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error_at(
            token.location,
            format!("Unexpected token {}", token.describe()),
        ));
    }
    Ok(expression)
}

fn end_location(source: &str, origin: SourceLocation) -> SourceLocation {
    let mut location = origin;
    for ch in source.chars() {
        if ch == '\n' {
            location.line += 1;
            location.column = 1;
        } else {
            location.column += 1;
        }
    }
    location
}

struct ExprParser {
    tokens: Vec<ExprToken>,
    pos: usize,
    end: SourceLocation,
}

impl ExprParser {
    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<ExprTokenKind> {
        self.peek().map(|token| token.kind)
    }

    fn next(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: ExprTokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_at(&self, location: SourceLocation, message: impl Into<String>) -> WoolError {
        WoolError::with_span(
            ErrorKind::Parse,
            "EXPR_PARSE",
            message,
            SourceSpan::between(location, location),
        )
    }

    fn expect(&mut self, kind: ExprTokenKind, what: &str) -> Result<ExprToken, WoolError> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.error_at(
                token.location,
                format!("Expected {}, found {}", what, token.describe()),
            )),
            None => Err(self.error_at(self.end, format!("Expected {}, found end of expression", what))),
        }
    }

    fn parse_assignment(&mut self) -> Result<Expression, WoolError> {
        let start = self.peek().map(|token| token.location).unwrap_or(self.end);
        let left = self.parse_or()?;
        if !self.eat(ExprTokenKind::Assign) {
            return Ok(left);
        }
        let Expression::Variable { name } = left else {
            return Err(self.error_at(start, "Left operand of assignment must be a variable"));
        };
        let value = self.parse_assignment()?;
        Ok(Expression::Assign {
            name,
            value: Box::new(value),
        })
    }

    fn parse_or(&mut self) -> Result<Expression, WoolError> {
        let mut left = self.parse_and()?;
        while self.eat(ExprTokenKind::Or) {
            let right = self.parse_and()?;
            left = Expression::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, WoolError> {
        let mut left = self.parse_not()?;
        while self.eat(ExprTokenKind::And) {
            let right = self.parse_not()?;
            left = Expression::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, WoolError> {
        if self.eat(ExprTokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expression::Not {
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, WoolError> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.peek_kind() {
                Some(ExprTokenKind::Equal) => BinaryOperator::Equal,
                Some(ExprTokenKind::NotEqual) => BinaryOperator::NotEqual,
                Some(ExprTokenKind::LessThan) => BinaryOperator::LessThan,
                Some(ExprTokenKind::LessEqual) => BinaryOperator::LessEqual,
                Some(ExprTokenKind::GreaterThan) => BinaryOperator::GreaterThan,
                Some(ExprTokenKind::GreaterEqual) => BinaryOperator::GreaterEqual,
                Some(ExprTokenKind::In) => BinaryOperator::In,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, WoolError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek_kind() {
                Some(ExprTokenKind::Add) => BinaryOperator::Add,
                Some(ExprTokenKind::Subtract) => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, WoolError> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek_kind() {
                Some(ExprTokenKind::Multiply) => BinaryOperator::Multiply,
                Some(ExprTokenKind::Divide) => BinaryOperator::Divide,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, WoolError> {
        if self.eat(ExprTokenKind::Subtract) {
            let operand = self.parse_unary()?;
            return Ok(Expression::Negate {
                operand: Box::new(operand),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, WoolError> {
        let mut expression = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                Some(ExprTokenKind::Dot) => {
                    self.pos += 1;
                    let member = match self.next() {
                        Some(token)
                            if matches!(
                                token.kind,
                                ExprTokenKind::Name | ExprTokenKind::String | ExprTokenKind::Number
                            ) =>
                        {
                            match token.value {
                                Value::String(text) => text,
                                other => other.to_string(),
                            }
                        }
                        Some(token) => {
                            return Err(self.error_at(
                                token.location,
                                format!("Expected member name after \".\", found {}", token.describe()),
                            ))
                        }
                        None => {
                            return Err(self.error_at(
                                self.end,
                                "Expected member name after \".\", found end of expression",
                            ))
                        }
                    };
                    expression = Expression::Dot {
                        parent: Box::new(expression),
                        member,
                    };
                }
                Some(ExprTokenKind::BracketOpen) => {
                    self.pos += 1;
                    let index = self.parse_assignment()?;
                    self.expect(ExprTokenKind::BracketClose, "\"]\"")?;
                    expression = Expression::Index {
                        parent: Box::new(expression),
                        index: Box::new(index),
                    };
                }
                Some(ExprTokenKind::ParenthesisOpen) => {
                    let location = self.peek().map(|token| token.location).unwrap_or(self.end);
                    return Err(self.error_at(location, "Function calls are not supported"));
                }
                _ => return Ok(expression),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, WoolError> {
        let Some(token) = self.next() else {
            return Err(self.error_at(self.end, "Expected expression, found end of expression"));
        };
        match token.kind {
            ExprTokenKind::Number
            | ExprTokenKind::String
            | ExprTokenKind::Boolean
            | ExprTokenKind::Null => Ok(Expression::Literal { value: token.value }),
            ExprTokenKind::Name => {
                let name = match token.value {
                    Value::String(name) => name,
                    other => other.to_string(),
                };
                Ok(Expression::Variable { name })
            }
            ExprTokenKind::ParenthesisOpen => {
                let operand = self.parse_assignment()?;
                self.expect(ExprTokenKind::ParenthesisClose, "\")\"")?;
                Ok(Expression::Group {
                    operand: Box::new(operand),
                })
            }
            ExprTokenKind::BracketOpen => {
                let mut items = Vec::new();
                if self.eat(ExprTokenKind::BracketClose) {
                    return Ok(Expression::List { items });
                }
                loop {
                    items.push(self.parse_assignment()?);
                    if self.eat(ExprTokenKind::Comma) {
                        continue;
                    }
                    self.expect(ExprTokenKind::BracketClose, "\",\" or \"]\"")?;
                    return Ok(Expression::List { items });
                }
            }
            ExprTokenKind::BraceOpen => {
                let mut entries = Vec::new();
                if self.eat(ExprTokenKind::BraceClose) {
                    return Ok(Expression::Object { entries });
                }
                loop {
                    let key = self.parse_assignment()?;
                    self.expect(ExprTokenKind::Colon, "\":\"")?;
                    let value = self.parse_assignment()?;
                    entries.push(ObjectEntry { key, value });
                    if self.eat(ExprTokenKind::Comma) {
                        continue;
                    }
                    self.expect(ExprTokenKind::BraceClose, "\",\" or \"}\"")?;
                    return Ok(Expression::Object { entries });
                }
            }
            _ => Err(self.error_at(
                token.location,
                format!("Expected expression, found {}", token.describe()),
            )),
        }
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    }
}
