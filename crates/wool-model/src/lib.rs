mod body;
mod command;
mod dialogue;
mod node;
mod pointer;
mod reply;
mod variable_string;

pub use body::{NodeBody, Segment};
pub use command::{
    ActionCommand, ActionType, Command, IfClause, IfCommand, InputCommand, InputOption,
    RandomClause, RandomCommand, SetCommand,
};
pub use dialogue::{Dialogue, START_NODE_ID};
pub use node::{Node, NodeHeader};
pub use pointer::{absolute_dialogue_id, NodePointer, END_NODE_ID};
pub use reply::{Reply, ReplyKind, AUTOFORWARD_STATEMENT};
pub use variable_string::{StringPart, VariableString};
