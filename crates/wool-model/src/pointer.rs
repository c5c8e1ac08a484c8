use std::fmt;

use serde::{Deserialize, Serialize};
use wool_core::{ErrorKind, WoolError};

pub const END_NODE_ID: &str = "end";

/// Destination of a reply. Node and dialogue ids keep their written case;
/// lookups compare them case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodePointer {
    Internal {
        node_id: String,
    },
    External {
        dialogue_id: String,
        node_id: String,
    },
    End {
        node_id: String,
    },
}

impl NodePointer {
    /// Builds a same-dialogue pointer, mapping `end` to the terminal sentinel.
    pub fn internal(node_id: impl Into<String>) -> Self {
        let node_id = node_id.into();
        if node_id.eq_ignore_ascii_case(END_NODE_ID) {
            Self::End { node_id }
        } else {
            Self::Internal { node_id }
        }
    }

    pub fn external(dialogue_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self::External {
            dialogue_id: dialogue_id.into(),
            node_id: node_id.into(),
        }
    }

    pub fn node_id(&self) -> &str {
        match self {
            Self::Internal { node_id } | Self::External { node_id, .. } | Self::End { node_id } => {
                node_id
            }
        }
    }

    /// Lower-cased node id used for lookups.
    pub fn node_key(&self) -> String {
        self.node_id().to_ascii_lowercase()
    }

    pub fn dialogue_id(&self) -> Option<&str> {
        match self {
            Self::External { dialogue_id, .. } => Some(dialogue_id),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }

    /// True for `end` with or without a dialogue qualifier.
    pub fn is_terminal(&self) -> bool {
        self.node_id().eq_ignore_ascii_case(END_NODE_ID)
    }
}

impl fmt::Display for NodePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal { node_id } | Self::End { node_id } => write!(f, "{}", node_id),
            Self::External {
                dialogue_id,
                node_id,
            } => write!(f, "{}.{}", dialogue_id, node_id),
        }
    }
}

/// Resolves a dialogue reference written inside `container` to a path from
/// the project root. A leading `/` makes the reference absolute; `..` climbs
/// one directory.
pub fn absolute_dialogue_id(container: &str, relative: &str) -> Result<String, WoolError> {
    if let Some(absolute) = relative.strip_prefix('/') {
        return Ok(absolute.to_string());
    }
    let mut path: Vec<&str> = container.split('/').collect();
    path.pop();
    let container_dir = path.join("/");
    for element in relative.split('/') {
        if element == ".." {
            if path.pop().is_none() {
                return Err(WoolError::new(
                    ErrorKind::Parse,
                    "POINTER_PATH",
                    format!(
                        "Relative path \"{}\" goes above root from \"{}\"",
                        relative, container_dir
                    ),
                ));
            }
        } else {
            path.push(element);
        }
    }
    Ok(path.join("/"))
}
