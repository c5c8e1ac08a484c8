use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use wool_core::{ErrorKind, WoolError};

use crate::node::Node;
use crate::pointer::NodePointer;

pub const START_NODE_ID: &str = "start";

/// A parsed script: nodes in insertion order plus the sets derived from
/// them, recomputed whenever a node is added.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialogue {
    name: String,
    nodes: Vec<Node>,
    index: BTreeMap<String, usize>,
    speakers: BTreeSet<String>,
    variables_needed: BTreeSet<String>,
    variables_written: BTreeSet<String>,
    dialogues_referenced: BTreeSet<String>,
}

impl Dialogue {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Result<Self, WoolError> {
        let name = name.into();
        if nodes.is_empty() {
            return Err(WoolError::new(
                ErrorKind::DialogueStructure,
                "DIALOGUE_NO_NODES",
                format!("Dialogue \"{}\" has no nodes", name),
            ));
        }
        let mut dialogue = Self {
            name,
            nodes: Vec::new(),
            index: BTreeMap::new(),
            speakers: BTreeSet::new(),
            variables_needed: BTreeSet::new(),
            variables_written: BTreeSet::new(),
            dialogues_referenced: BTreeSet::new(),
        };
        for node in nodes {
            dialogue.add_node(node)?;
        }
        Ok(dialogue)
    }

    pub fn add_node(&mut self, node: Node) -> Result<(), WoolError> {
        let key = node.key();
        if self.index.contains_key(&key) {
            return Err(WoolError::new(
                ErrorKind::DialogueStructure,
                "DIALOGUE_DUPLICATE_NODE",
                format!("Duplicate node \"{}\" in dialogue \"{}\"", node.title(), self.name),
            ));
        }
        if let Some(speaker) = node.speaker() {
            self.speakers.insert(speaker.to_string());
        }
        self.variables_needed.extend(node.body.read_variable_names());
        self.variables_written.extend(node.body.write_variable_names());
        self.dialogues_referenced.extend(
            node.body
                .node_pointers()
                .iter()
                .filter_map(|pointer| pointer.dialogue_id().map(str::to_string)),
        );
        self.index.insert(key, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.index
            .get(&node_id.to_ascii_lowercase())
            .and_then(|index| self.nodes.get(*index))
    }

    pub fn node_or_err(&self, node_id: &str) -> Result<&Node, WoolError> {
        self.node(node_id).ok_or_else(|| {
            WoolError::new(
                ErrorKind::DialogueStructure,
                "DIALOGUE_NODE_NOT_FOUND",
                format!("Node \"{}\" not found in dialogue \"{}\"", node_id, self.name),
            )
        })
    }

    /// The node titled `start`, otherwise the first node added.
    pub fn start_node(&self) -> &Node {
        self.node(START_NODE_ID).unwrap_or(&self.nodes[0])
    }

    pub fn speakers(&self) -> &BTreeSet<String> {
        &self.speakers
    }

    pub fn variables_needed(&self) -> &BTreeSet<String> {
        &self.variables_needed
    }

    pub fn variables_written(&self) -> &BTreeSet<String> {
        &self.variables_written
    }

    pub fn dialogues_referenced(&self) -> &BTreeSet<String> {
        &self.dialogues_referenced
    }

    /// Internal pointers whose target node does not exist, with the title
    /// of the node holding them.
    pub fn missing_node_pointers(&self) -> Vec<(String, NodePointer)> {
        let mut missing = Vec::new();
        for node in &self.nodes {
            for pointer in node.body.node_pointers() {
                if let NodePointer::Internal { node_id } = &pointer {
                    if self.node(node_id).is_none() {
                        missing.push((node.title().to_string(), pointer.clone()));
                    }
                }
            }
        }
        missing
    }
}

fn write_set(f: &mut fmt::Formatter<'_>, label: &str, values: &BTreeSet<String>) -> fmt::Result {
    let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
    writeln!(f, "{}: [{}]", label, joined)
}

impl fmt::Display for Dialogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dialogue: {}", self.name)?;
        writeln!(f, "Nodes: {}", self.nodes.len())?;
        write_set(f, "Speakers", &self.speakers)?;
        write_set(f, "Dialogues referenced", &self.dialogues_referenced)?;
        write_set(f, "Variables needed", &self.variables_needed)?;
        write_set(f, "Variables written", &self.variables_written)
    }
}

#[cfg(test)]
mod dialogue_tests {
    use super::*;
    use crate::body::NodeBody;
    use crate::node::NodeHeader;
    use crate::reply::Reply;
    use crate::variable_string::VariableString;

    fn node(title: &str, speaker: Option<&str>, text: &str, pointers: &[NodePointer]) -> Node {
        let mut header = NodeHeader::new(title);
        header.speaker = speaker.map(str::to_string);
        let mut body = NodeBody::new();
        let mut string = VariableString::from_text(text);
        string.push_variable("mood");
        body.add_text(string);
        for (reply_id, pointer) in pointers.iter().enumerate() {
            body.add_reply(Reply {
                reply_id,
                statement: None,
                node_pointer: pointer.clone(),
                commands: Vec::new(),
            });
        }
        Node::new(header, body)
    }

    #[test]
    fn empty_dialogue_is_rejected() {
        let error = Dialogue::new("main", Vec::new()).expect_err("no nodes should fail");
        assert_eq!(error.code, "DIALOGUE_NO_NODES");
        assert_eq!(error.kind, ErrorKind::DialogueStructure);
    }

    #[test]
    fn start_node_prefers_start_title_case_insensitively() {
        let dialogue = Dialogue::new(
            "main",
            vec![
                node("Intro", None, "hi", &[]),
                node("Start", None, "go", &[]),
            ],
        )
        .expect("dialogue should build");
        assert_eq!(dialogue.start_node().title(), "Start");
        assert_eq!(dialogue.node("INTRO").map(Node::title), Some("Intro"));

        let fallback = Dialogue::new("main", vec![node("Intro", None, "hi", &[])])
            .expect("dialogue should build");
        assert_eq!(fallback.start_node().title(), "Intro");
    }

    #[test]
    fn duplicate_titles_are_rejected() {
        let error = Dialogue::new(
            "main",
            vec![node("Start", None, "a", &[]), node("start", None, "b", &[])],
        )
        .expect_err("duplicate should fail");
        assert_eq!(error.code, "DIALOGUE_DUPLICATE_NODE");
    }

    #[test]
    fn derived_sets_and_missing_pointers() {
        let dialogue = Dialogue::new(
            "main",
            vec![
                node(
                    "Start",
                    Some("Ann"),
                    "hello ",
                    &[
                        NodePointer::internal("Missing"),
                        NodePointer::external("other", "Intro"),
                        NodePointer::internal("End"),
                    ],
                ),
                node("Second", Some("Bob"), "bye ", &[]),
            ],
        )
        .expect("dialogue should build");
        assert_eq!(dialogue.speakers().len(), 2);
        assert!(dialogue.variables_needed().contains("mood"));
        assert!(dialogue.dialogues_referenced().contains("other"));
        let missing = dialogue.missing_node_pointers();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].1.node_id(), "Missing");

        let summary = dialogue.to_string();
        assert!(summary.contains("Nodes: 2"));
        assert!(summary.contains("Speakers: [Ann, Bob]"));
    }
}
