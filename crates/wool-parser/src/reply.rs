use std::sync::OnceLock;

use regex::Regex;
use wool_core::{SourceLocation, SourceSpan, WoolError};
use wool_model::{absolute_dialogue_id, Command, NodeBody, NodePointer, Reply, Segment};

use crate::body::{node_id_regex, BodyParser, BodyScope};
use crate::cursor::{parse_error, TokenCursor};
use crate::token::{BodyToken, BodyTokenKind};

const REPLY_PARSE: &str = "REPLY_PARSE";

fn dialogue_path_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^/?(?:\.\.|[A-Za-z0-9_-]+)(?:/(?:\.\.|[A-Za-z0-9_-]+))*$")
            .expect("dialogue path regex must compile")
    })
}

impl BodyParser<'_> {
    /// `[[pointer]]`, `[[statement|pointer]]` or `[[statement|pointer|commands]]`.
    pub(crate) fn parse_reply(&mut self, cursor: &mut TokenCursor<'_>) -> Result<Reply, WoolError> {
        let start = cursor.expect(BodyTokenKind::ReplyStart, "[[")?;
        let tokens = cursor.take_until(BodyTokenKind::ReplyEnd);
        let end = cursor.expect(BodyTokenKind::ReplyEnd, "]]")?;
        let sections: Vec<&[BodyToken]> = tokens
            .split(|token| token.kind == BodyTokenKind::ReplySeparator)
            .collect();
        let (statement_tokens, pointer_tokens, command_tokens) = match sections.as_slice() {
            [pointer] => (None, *pointer, None),
            [statement, pointer] => (Some(*statement), *pointer, None),
            [statement, pointer, commands] => (Some(*statement), *pointer, Some(*commands)),
            _ => {
                return Err(parse_error(
                    REPLY_PARSE,
                    "Reply has more than three sections",
                    start.location,
                ));
            }
        };

        let reply_id = self.next_reply_id;
        self.next_reply_id += 1;
        let statement = match statement_tokens {
            Some(tokens) => self.parse_statement(tokens, end.location)?,
            None => None,
        };
        let node_pointer = self.parse_pointer(pointer_tokens, start.location)?;
        let commands = match command_tokens {
            Some(tokens) => self.parse_reply_commands(tokens, end.location)?,
            None => Vec::new(),
        };
        Ok(Reply {
            reply_id,
            statement,
            node_pointer,
            commands,
        })
    }

    /// An empty statement makes the reply auto-forward.
    fn parse_statement(
        &mut self,
        tokens: &[BodyToken],
        end: SourceLocation,
    ) -> Result<Option<NodeBody>, WoolError> {
        let mut cursor = TokenCursor::new(tokens, end);
        let (mut statement, _) = self.parse_body(&mut cursor, BodyScope::ReplyStatement, &[])?;
        statement.trim_whitespace();
        Ok((!statement.is_empty()).then_some(statement))
    }

    fn parse_reply_commands(
        &mut self,
        tokens: &[BodyToken],
        end: SourceLocation,
    ) -> Result<Vec<Command>, WoolError> {
        let location = tokens.first().map(|token| token.location).unwrap_or(end);
        let mut cursor = TokenCursor::new(tokens, end);
        let (body, _) = self.parse_body(&mut cursor, BodyScope::ReplyCommands, &[])?;
        let mut commands = Vec::new();
        for segment in body.segments() {
            match segment {
                Segment::Command(command) => commands.push(command.clone()),
                Segment::Text(text) if text.is_whitespace() => {}
                Segment::Text(_) => {
                    return Err(parse_error(
                        REPLY_PARSE,
                        "Only commands are allowed after the reply pointer",
                        location,
                    ));
                }
            }
        }
        Ok(commands)
    }

    /// `Node`, `end`, `Dialogue.Node` or a relative `../Dir/Dialogue.Node`.
    fn parse_pointer(
        &self,
        tokens: &[BodyToken],
        reply_location: SourceLocation,
    ) -> Result<NodePointer, WoolError> {
        let location = tokens
            .first()
            .map(|token| token.location)
            .unwrap_or(reply_location);
        let mut text = String::new();
        for token in tokens {
            if token.kind != BodyTokenKind::Text {
                return Err(parse_error(
                    REPLY_PARSE,
                    format!("Reply pointer must be plain text, found {}", token.describe()),
                    token.location,
                ));
            }
            text.push_str(&token.value.plain_text().unwrap_or_default());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(parse_error(REPLY_PARSE, "Missing node pointer in reply", location));
        }
        let Some((dialogue, node_id)) = text.rsplit_once('.') else {
            self.check_node_id(text, location)?;
            return Ok(NodePointer::internal(text));
        };
        self.check_node_id(node_id, location)?;
        if !dialogue_path_regex().is_match(dialogue) {
            return Err(parse_error(
                REPLY_PARSE,
                format!("Invalid dialogue reference \"{}\"", dialogue),
                location,
            ));
        }
        let dialogue_id = absolute_dialogue_id(self.dialogue_name, dialogue)
            .map_err(|error| error.or_span(SourceSpan::at(location.line, location.column)))?;
        if dialogue_id.eq_ignore_ascii_case(self.dialogue_name) {
            return Ok(NodePointer::internal(node_id));
        }
        Ok(NodePointer::external(dialogue_id, node_id))
    }

    fn check_node_id(&self, node_id: &str, location: SourceLocation) -> Result<(), WoolError> {
        if node_id_regex().is_match(node_id) {
            Ok(())
        } else {
            Err(parse_error(
                REPLY_PARSE,
                format!("Invalid node id \"{}\" in reply", node_id),
                location,
            ))
        }
    }
}
