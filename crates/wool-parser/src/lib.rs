mod attributes;
mod body;
mod command;
mod cursor;
mod dialogue;
mod lexer;
mod project;
mod reply;
mod token;

pub use body::parse_node_body;
pub use dialogue::parse_dialogue;
pub use lexer::tokenize_body;
pub use project::{dialogue_name_from_path, parse_project, Project, ProjectErrors, SCRIPT_EXTENSION};
pub use token::{BodyToken, BodyTokenKind};
