use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use wool_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    In,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterEqual => ">=",
            Self::In => "in",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expression {
    Literal {
        value: Value,
    },
    Variable {
        name: String,
    },
    Group {
        operand: Box<Expression>,
    },
    Not {
        operand: Box<Expression>,
    },
    Negate {
        operand: Box<Expression>,
    },
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Dot {
        parent: Box<Expression>,
        member: String,
    },
    Index {
        parent: Box<Expression>,
        index: Box<Expression>,
    },
    Assign {
        name: String,
        value: Box<Expression>,
    },
    List {
        items: Vec<Expression>,
    },
    Object {
        entries: Vec<ObjectEntry>,
    },
}

impl Expression {
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Self::Literal { .. } | Self::Variable { .. } => Vec::new(),
            Self::Group { operand } | Self::Not { operand } | Self::Negate { operand } => {
                vec![operand.as_ref()]
            }
            Self::And { left, right }
            | Self::Or { left, right }
            | Self::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::Dot { parent, .. } => vec![parent.as_ref()],
            Self::Index { parent, index } => vec![parent.as_ref(), index.as_ref()],
            Self::Assign { value, .. } => vec![value.as_ref()],
            Self::List { items } => items.iter().collect(),
            Self::Object { entries } => entries
                .iter()
                .flat_map(|entry| [&entry.key, &entry.value])
                .collect(),
        }
    }

    /// All nested expressions, depth first, not including `self`.
    pub fn descendants(&self) -> Vec<&Expression> {
        let mut result = Vec::new();
        for child in self.children() {
            result.push(child);
            result.extend(child.descendants());
        }
        result
    }

    pub fn read_variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_read_names(&mut names);
        names
    }

    pub fn write_variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let Self::Assign { name, .. } = self {
            names.insert(name.clone());
        }
        for expression in self.descendants() {
            if let Self::Assign { name, .. } = expression {
                names.insert(name.clone());
            }
        }
        names
    }

    pub fn contains_assignment(&self) -> bool {
        matches!(self, Self::Assign { .. })
            || self
                .descendants()
                .iter()
                .any(|expression| matches!(expression, Self::Assign { .. }))
    }

    fn collect_read_names(&self, names: &mut BTreeSet<String>) {
        if let Self::Variable { name } = self {
            names.insert(name.clone());
        }
        for child in self.children() {
            child.collect_read_names(names);
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value } => match value {
                Value::String(text) => write!(f, "\"{}\"", escape_string(text)),
                Value::Float(number) => write!(f, "{:?}", number),
                other => write!(f, "{}", other),
            },
            Self::Variable { name } => write!(f, "${}", name),
            Self::Group { operand } => write!(f, "({})", operand),
            Self::Not { operand } => write!(f, "!{}", operand),
            Self::Negate { operand } => write!(f, "-{}", operand),
            Self::And { left, right } => write!(f, "{} && {}", left, right),
            Self::Or { left, right } => write!(f, "{} || {}", left, right),
            Self::Binary {
                operator,
                left,
                right,
            } => write!(f, "{} {} {}", left, operator.symbol(), right),
            Self::Dot { parent, member } => write!(f, "{}.{}", parent, member),
            Self::Index { parent, index } => write!(f, "{}[{}]", parent, index),
            Self::Assign { name, value } => write!(f, "${} = {}", name, value),
            Self::List { items } => {
                write!(f, "[")?;
                for (position, item) in items.iter().enumerate() {
                    if position > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object { entries } => {
                write!(f, "{{")?;
                for (position, entry) in entries.iter().enumerate() {
                    if position > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", entry.key, entry.value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

fn escape_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}
