use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use wool_expr::Expression;

use crate::body::NodeBody;
use crate::pointer::NodePointer;
use crate::reply::Reply;
use crate::variable_string::VariableString;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    If(IfCommand),
    Set(SetCommand),
    Input(InputCommand),
    Action(ActionCommand),
    Random(RandomCommand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfClause {
    pub condition: Expression,
    pub body: NodeBody,
}

/// `<<if>>` with its `<<elseif>>` clauses in order and an optional `<<else>>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfCommand {
    pub clauses: Vec<IfClause>,
    pub else_body: Option<NodeBody>,
}

/// Holds an assignment expression; the parser guarantees its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCommand {
    pub expression: Expression,
}

impl SetCommand {
    pub fn variable_name(&self) -> Option<&str> {
        match &self.expression {
            Expression::Assign { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputOption {
    pub variable: String,
    pub text: VariableString,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputCommand {
    Text {
        variable: String,
        min: Option<i64>,
        max: Option<i64>,
    },
    LongText {
        variable: String,
        min: Option<i64>,
        max: Option<i64>,
    },
    Numeric {
        variable: String,
        min: Option<i64>,
        max: Option<i64>,
    },
    Set {
        options: Vec<InputOption>,
    },
}

impl InputCommand {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::LongText { .. } => "longtext",
            Self::Numeric { .. } => "numeric",
            Self::Set { .. } => "set",
        }
    }

    pub fn variable_names(&self) -> Vec<&str> {
        match self {
            Self::Text { variable, .. }
            | Self::LongText { variable, .. }
            | Self::Numeric { variable, .. } => vec![variable.as_str()],
            Self::Set { options } => options.iter().map(|option| option.variable.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Image,
    Video,
    Generic,
}

impl ActionType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "generic" => Some(Self::Generic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Generic => "generic",
        }
    }
}

/// Client-side action. The engine only resolves its variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCommand {
    pub action_type: ActionType,
    pub value: VariableString,
    pub parameters: BTreeMap<String, VariableString>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomClause {
    pub weight: f64,
    pub body: NodeBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomCommand {
    pub clauses: Vec<RandomClause>,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::If(_) => "if",
            Self::Set(_) => "set",
            Self::Input(_) => "input",
            Self::Action(_) => "action",
            Self::Random(_) => "random",
        }
    }

    /// Bodies nested inside this command, in clause order.
    pub fn bodies(&self) -> Vec<&NodeBody> {
        match self {
            Self::If(command) => command
                .clauses
                .iter()
                .map(|clause| &clause.body)
                .chain(command.else_body.iter())
                .collect(),
            Self::Random(command) => command.clauses.iter().map(|clause| &clause.body).collect(),
            Self::Set(_) | Self::Input(_) | Self::Action(_) => Vec::new(),
        }
    }

    pub fn find_reply(&self, reply_id: usize) -> Option<&Reply> {
        self.bodies()
            .into_iter()
            .find_map(|body| body.find_reply_by_id(reply_id))
    }

    pub fn read_variable_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::If(command) => {
                for clause in &command.clauses {
                    names.extend(clause.condition.read_variable_names());
                }
            }
            Self::Set(command) => names.extend(command.expression.read_variable_names()),
            Self::Input(InputCommand::Set { options }) => {
                for option in options {
                    option.text.read_variable_names(names);
                }
            }
            Self::Input(_) => {}
            Self::Action(command) => {
                command.value.read_variable_names(names);
                for parameter in command.parameters.values() {
                    parameter.read_variable_names(names);
                }
            }
            Self::Random(_) => {}
        }
        for body in self.bodies() {
            names.extend(body.read_variable_names());
        }
    }

    pub fn write_variable_names(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::If(command) => {
                for clause in &command.clauses {
                    names.extend(clause.condition.write_variable_names());
                }
            }
            Self::Set(command) => names.extend(command.expression.write_variable_names()),
            Self::Input(command) => {
                names.extend(command.variable_names().into_iter().map(str::to_string));
            }
            Self::Action(_) | Self::Random(_) => {}
        }
        for body in self.bodies() {
            names.extend(body.write_variable_names());
        }
    }

    pub fn node_pointers(&self, pointers: &mut Vec<NodePointer>) {
        for body in self.bodies() {
            pointers.extend(body.node_pointers());
        }
    }
}

fn write_attr(f: &mut fmt::Formatter<'_>, name: &str, value: &VariableString) -> fmt::Result {
    write!(f, " {}=\"{}\"", name, value.to_source(&['"']))
}

fn write_bounds(f: &mut fmt::Formatter<'_>, min: &Option<i64>, max: &Option<i64>) -> fmt::Result {
    if let Some(min) = min {
        write!(f, " min=\"{}\"", min)?;
    }
    if let Some(max) = max {
        write!(f, " max=\"{}\"", max)?;
    }
    Ok(())
}

fn write_weight(f: &mut fmt::Formatter<'_>, weight: f64) -> fmt::Result {
    if weight != 1.0 {
        write!(f, " weight=\"{}\"", weight)?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::If(command) => {
                for (index, clause) in command.clauses.iter().enumerate() {
                    let keyword = if index == 0 { "if" } else { "elseif" };
                    write!(f, "<<{} {}>>{}", keyword, clause.condition, clause.body)?;
                }
                if let Some(else_body) = &command.else_body {
                    write!(f, "<<else>>{}", else_body)?;
                }
                write!(f, "<<endif>>")
            }
            Self::Set(command) => write!(f, "<<set {}>>", command.expression),
            Self::Input(command) => {
                write!(f, "<<input type=\"{}\"", command.type_name())?;
                match command {
                    InputCommand::Text { variable, min, max }
                    | InputCommand::LongText { variable, min, max }
                    | InputCommand::Numeric { variable, min, max } => {
                        write!(f, " value=\"${}\"", variable)?;
                        write_bounds(f, min, max)?;
                    }
                    InputCommand::Set { options } => {
                        for (index, option) in options.iter().enumerate() {
                            write!(f, " value{}=\"${}\"", index + 1, option.variable)?;
                            write_attr(f, &format!("option{}", index + 1), &option.text)?;
                        }
                    }
                }
                write!(f, ">>")
            }
            Self::Action(command) => {
                write!(f, "<<action type=\"{}\"", command.action_type.as_str())?;
                write_attr(f, "value", &command.value)?;
                for (name, value) in &command.parameters {
                    write_attr(f, name, value)?;
                }
                write!(f, ">>")
            }
            Self::Random(command) => {
                for (index, clause) in command.clauses.iter().enumerate() {
                    write!(f, "<<{}", if index == 0 { "random" } else { "or" })?;
                    write_weight(f, clause.weight)?;
                    write!(f, ">>{}", clause.body)?;
                }
                write!(f, "<<endrandom>>")
            }
        }
    }
}
