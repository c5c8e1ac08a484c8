mod ast;
mod env;
mod eval;
mod lexer;
mod parser;
mod token;

pub use ast::{BinaryOperator, Expression, ObjectEntry};
pub use env::{Environment, MapEnvironment, UnknownVariablePolicy};
pub use lexer::tokenize_expression;
pub use parser::{parse_expression, parse_expression_at};
pub use token::{ExprToken, ExprTokenKind};
