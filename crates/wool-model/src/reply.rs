use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::body::{NodeBody, Segment};
use crate::command::Command;
use crate::pointer::NodePointer;

pub const AUTOFORWARD_STATEMENT: &str = "AUTOFORWARD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplyKind {
    AutoForward,
    Basic,
    Input,
}

/// A selectable option. `reply_id` is its position among all replies of the
/// node, assigned once at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub reply_id: usize,
    pub statement: Option<NodeBody>,
    pub node_pointer: NodePointer,
    pub commands: Vec<Command>,
}

impl Reply {
    pub fn kind(&self) -> ReplyKind {
        let Some(statement) = &self.statement else {
            return ReplyKind::AutoForward;
        };
        let has_input = statement
            .segments()
            .iter()
            .any(|segment| matches!(segment, Segment::Command(Command::Input(_))));
        if has_input {
            ReplyKind::Input
        } else {
            ReplyKind::Basic
        }
    }

    pub fn read_variable_names(&self, names: &mut BTreeSet<String>) {
        if let Some(statement) = &self.statement {
            names.extend(statement.read_variable_names());
        }
        for command in &self.commands {
            command.read_variable_names(names);
        }
    }

    pub fn write_variable_names(&self, names: &mut BTreeSet<String>) {
        if let Some(statement) = &self.statement {
            names.extend(statement.write_variable_names());
        }
        for command in &self.commands {
            command.write_variable_names(names);
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[")?;
        if let Some(statement) = &self.statement {
            write!(f, "{}|", statement)?;
        } else if !self.commands.is_empty() {
            write!(f, "|")?;
        }
        write!(f, "{}", self.node_pointer)?;
        if !self.commands.is_empty() {
            write!(f, "|")?;
            for command in &self.commands {
                write!(f, "{}", command)?;
            }
        }
        write!(f, "]]")
    }
}
