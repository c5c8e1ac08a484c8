use std::collections::BTreeSet;

use log::{debug, warn};
use wool_core::{ErrorKind, ErrorList, SourceLocation, WoolError};
use wool_model::{Dialogue, Node, NodeHeader, NodePointer, END_NODE_ID};

use crate::body::{node_id_regex, parse_node_body};
use crate::cursor::parse_error;

const HEADER_PARSE: &str = "HEADER_PARSE";
const HEADER_END: &str = "---";
const NODE_END: &str = "===";

#[derive(Debug, Default)]
struct NodeDraft {
    header: NodeHeader,
    keys: BTreeSet<String>,
    start_line: usize,
    body_start: usize,
    body_lines: Vec<String>,
    failed: bool,
}

/// Drops a `//` comment; `\/` stands for a literal slash.
fn strip_header_comment(line: &str) -> String {
    let mut result = String::new();
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'/') => {
                result.push('/');
                chars.next();
            }
            '/' if chars.peek() == Some(&'/') => break,
            _ => result.push(ch),
        }
    }
    result
}

struct DialogueParser<'a> {
    name: &'a str,
    nodes: Vec<Node>,
    titles: BTreeSet<String>,
    failed_titles: BTreeSet<String>,
    errors: ErrorList,
}

/// Parses one script. Every node is checked even after an error, and
/// internal pointers are validated once all nodes are known, so the error
/// list is complete.
pub fn parse_dialogue(name: &str, source: &str) -> Result<Dialogue, ErrorList> {
    let mut parser = DialogueParser {
        name,
        nodes: Vec::new(),
        titles: BTreeSet::new(),
        failed_titles: BTreeSet::new(),
        errors: ErrorList::new(),
    };
    let mut draft: Option<NodeDraft> = None;
    let mut in_body = false;
    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        if in_body {
            if line.trim() == NODE_END {
                if let Some(finished) = draft.take() {
                    parser.finish_node(finished);
                }
                in_body = false;
            } else if let Some(current) = draft.as_mut() {
                current.body_lines.push(line.to_string());
            }
            continue;
        }
        let content = strip_header_comment(line);
        let trimmed = content.trim();
        if trimmed.is_empty() {
            continue;
        }
        let current = draft.get_or_insert_with(|| NodeDraft {
            start_line: line_number,
            ..NodeDraft::default()
        });
        if trimmed == HEADER_END {
            current.body_start = line_number + 1;
            in_body = true;
            continue;
        }
        if trimmed == NODE_END {
            parser.errors.push(parse_error(
                HEADER_PARSE,
                "Found === before the --- that ends the header",
                SourceLocation::new(line_number, 1),
            ));
            draft = None;
            continue;
        }
        if !current.failed {
            if let Err(error) = parser.read_header_line(current, trimmed, line_number) {
                parser.errors.push(error);
                current.failed = true;
            }
        }
    }
    if let Some(unfinished) = draft {
        if in_body {
            parser.finish_node(unfinished);
        } else {
            parser.errors.push(parse_error(
                HEADER_PARSE,
                "Header is not followed by ---",
                SourceLocation::new(unfinished.start_line, 1),
            ));
        }
    }
    parser.finish()
}

impl DialogueParser<'_> {
    fn read_header_line(
        &self,
        draft: &mut NodeDraft,
        line: &str,
        line_number: usize,
    ) -> Result<(), WoolError> {
        let location = SourceLocation::new(line_number, 1);
        let Some((key, value)) = line.split_once(':') else {
            return Err(parse_error(
                HEADER_PARSE,
                format!("Expected \"key: value\" in header, found \"{}\"", line),
                location,
            ));
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();
        if !draft.keys.insert(key.clone()) {
            return Err(parse_error(
                HEADER_PARSE,
                format!("Duplicate header \"{}\"", key),
                location,
            ));
        }
        match key.as_str() {
            "title" => {
                if !node_id_regex().is_match(&value) {
                    return Err(parse_error(
                        HEADER_PARSE,
                        format!("Invalid node title \"{}\"", value),
                        location,
                    ));
                }
                draft.header.title = value;
            }
            "speaker" if !value.is_empty() => draft.header.speaker = Some(value),
            "speaker" => {}
            _ => {
                draft.header.optional_tags.insert(key, value);
            }
        }
        Ok(())
    }

    fn finish_node(&mut self, draft: NodeDraft) {
        let title = draft.header.title.clone();
        if draft.failed {
            if !title.is_empty() {
                self.failed_titles.insert(title.to_ascii_lowercase());
            }
            return;
        }
        let header_location = SourceLocation::new(draft.start_line, 1);
        if title.is_empty() {
            self.errors.push(parse_error(
                HEADER_PARSE,
                "Node is missing a title",
                header_location,
            ));
            return;
        }
        if !self.titles.insert(title.to_ascii_lowercase()) {
            self.errors.push(parse_error(
                HEADER_PARSE,
                format!("Duplicate node title \"{}\"", title),
                header_location,
            ));
            return;
        }
        let source = draft.body_lines.join("\n");
        let body = match parse_node_body(self.name, &source, SourceLocation::new(draft.body_start, 1))
        {
            Ok(body) => body,
            Err(error) => {
                self.errors.push(error);
                self.failed_titles.insert(title.to_ascii_lowercase());
                return;
            }
        };
        if title.eq_ignore_ascii_case(END_NODE_ID) && !body.is_empty() {
            self.errors.push(parse_error(
                "BODY_PARSE",
                "Node \"end\" must have an empty body",
                SourceLocation::new(draft.body_start, 1),
            ));
            return;
        }
        self.nodes.push(Node::new(draft.header, body));
    }

    fn finish(mut self) -> Result<Dialogue, ErrorList> {
        let node_count = self.nodes.len();
        let dialogue = if self.nodes.is_empty() {
            if self.errors.is_empty() {
                self.errors.push(WoolError::new(
                    ErrorKind::DialogueStructure,
                    "DIALOGUE_NO_NODES",
                    format!("Dialogue \"{}\" has no nodes", self.name),
                ));
            }
            None
        } else {
            match Dialogue::new(self.name, std::mem::take(&mut self.nodes)) {
                Ok(dialogue) => Some(dialogue),
                Err(error) => {
                    self.errors.push(error);
                    None
                }
            }
        };
        if let Some(dialogue) = &dialogue {
            for (holder, pointer) in dialogue.missing_node_pointers() {
                if self.failed_titles.contains(&pointer.node_key()) {
                    continue;
                }
                self.errors.push(missing_node_error(dialogue.name(), &holder, &pointer));
            }
        }
        if self.errors.is_empty() {
            debug!("parsed dialogue {} with {} nodes", self.name, node_count);
        } else {
            warn!(
                "dialogue {} has {} errors",
                self.name,
                self.errors.len()
            );
        }
        match dialogue {
            Some(dialogue) if self.errors.is_empty() => Ok(dialogue),
            _ => Err(self.errors),
        }
    }
}

pub(crate) fn missing_node_error(dialogue: &str, holder: &str, pointer: &NodePointer) -> WoolError {
    WoolError::new(
        ErrorKind::DialogueStructure,
        "DIALOGUE_NODE_NOT_FOUND",
        format!(
            "Node \"{}\" in dialogue \"{}\" points to missing node \"{}\"",
            holder, dialogue, pointer
        ),
    )
}
