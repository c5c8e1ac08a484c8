use wool_core::{SourceLocation, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprTokenKind {
    Or,
    And,
    Not,
    In,
    LessThan,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    GreaterThan,
    Add,
    Subtract,
    Multiply,
    Divide,
    Assign,
    Dot,
    BracketOpen,
    BracketClose,
    ParenthesisOpen,
    ParenthesisClose,
    BraceOpen,
    BraceClose,
    Comma,
    Colon,
    String,
    Boolean,
    Number,
    Null,
    Name,
}

/// One lexical unit of an expression. `value` holds the decoded literal for
/// strings, numbers and booleans, and the bare variable name for names.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprToken {
    pub kind: ExprTokenKind,
    pub text: String,
    pub value: Value,
    pub location: SourceLocation,
}

impl ExprToken {
    pub fn describe(&self) -> String {
        format!("\"{}\"", self.text)
    }
}
