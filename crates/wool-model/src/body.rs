use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::{ActionCommand, Command};
use crate::pointer::NodePointer;
use crate::reply::Reply;
use crate::variable_string::{StringPart, VariableString};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Segment {
    Text(VariableString),
    Command(Command),
}

/// Content of a node, an `if` clause or a reply statement. Text segments
/// are merged on insert so two text segments are never adjacent; replies
/// are kept apart from the segments and always trail them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBody {
    segments: Vec<Segment>,
    replies: Vec<Reply>,
}

impl NodeBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }

    pub fn add_segment(&mut self, segment: Segment) {
        match segment {
            Segment::Text(text) => self.add_text(text),
            Segment::Command(command) => self.segments.push(Segment::Command(command)),
        }
    }

    pub fn add_text(&mut self, text: VariableString) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.extend(text);
            return;
        }
        self.segments.push(Segment::Text(text));
    }

    pub fn add_command(&mut self, command: Command) {
        self.segments.push(Segment::Command(command));
    }

    pub fn add_reply(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    /// Appends another body, merging the text at the seam.
    pub fn append(&mut self, other: NodeBody) {
        for segment in other.segments {
            self.add_segment(segment);
        }
        self.replies.extend(other.replies);
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.replies.is_empty()
    }

    pub fn has_commands(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Command(_)))
    }

    /// Searches this body and every nested clause body.
    pub fn find_reply_by_id(&self, reply_id: usize) -> Option<&Reply> {
        if let Some(reply) = self.replies.iter().find(|reply| reply.reply_id == reply_id) {
            return Some(reply);
        }
        self.segments.iter().find_map(|segment| match segment {
            Segment::Command(command) => command.find_reply(reply_id),
            Segment::Text(_) => None,
        })
    }

    /// Replies of this body plus those inside nested clause bodies.
    pub fn all_replies(&self) -> Vec<&Reply> {
        let mut replies: Vec<&Reply> = Vec::new();
        for segment in &self.segments {
            if let Segment::Command(command) = segment {
                for body in command.bodies() {
                    replies.extend(body.all_replies());
                }
            }
        }
        replies.extend(self.replies.iter());
        replies
    }

    pub fn actions(&self) -> Vec<&ActionCommand> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Command(Command::Action(action)) => Some(action),
                _ => None,
            })
            .collect()
    }

    pub fn read_variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => text.read_variable_names(&mut names),
                Segment::Command(command) => command.read_variable_names(&mut names),
            }
        }
        for reply in &self.replies {
            reply.read_variable_names(&mut names);
        }
        names
    }

    pub fn write_variable_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for segment in &self.segments {
            if let Segment::Command(command) = segment {
                command.write_variable_names(&mut names);
            }
        }
        for reply in &self.replies {
            reply.write_variable_names(&mut names);
        }
        names
    }

    pub fn node_pointers(&self) -> Vec<NodePointer> {
        let mut pointers = Vec::new();
        for segment in &self.segments {
            if let Segment::Command(command) = segment {
                command.node_pointers(&mut pointers);
            }
        }
        pointers.extend(self.replies.iter().map(|reply| reply.node_pointer.clone()));
        pointers
    }

    /// Drops leading and trailing whitespace-only text segments, then trims
    /// the outer edges of the first and last remaining text segments.
    pub fn trim_whitespace(&mut self) {
        while matches!(self.segments.first(), Some(Segment::Text(text)) if text.is_whitespace()) {
            self.segments.remove(0);
        }
        while matches!(self.segments.last(), Some(Segment::Text(text)) if text.is_whitespace()) {
            self.segments.pop();
        }
        if let Some(Segment::Text(text)) = self.segments.first_mut() {
            text.trim_start();
        }
        if let Some(Segment::Text(text)) = self.segments.last_mut() {
            text.trim_end();
        }
    }

    /// Concatenated text segments, with unresolved variables shown as `$name`.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for segment in &self.segments {
            if let Segment::Text(text) = segment {
                for part in text.parts() {
                    match part {
                        StringPart::Text { text } => result.push_str(text),
                        StringPart::Variable { name } => {
                            result.push('$');
                            result.push_str(name);
                        }
                    }
                }
            }
        }
        result
    }
}

impl fmt::Display for NodeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => write!(f, "{}", text.to_source(&['<', '[', '|', ']']))?,
                Segment::Command(command) => write!(f, "{}", command)?,
            }
        }
        for reply in &self.replies {
            write!(f, "{}", reply)?;
        }
        Ok(())
    }
}
