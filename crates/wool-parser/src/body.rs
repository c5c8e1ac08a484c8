use std::sync::OnceLock;

use regex::Regex;
use wool_core::{SourceLocation, WoolError};
use wool_model::NodeBody;

use crate::cursor::{parse_error, TokenCursor};
use crate::lexer::tokenize_body;
use crate::token::{BodyToken, BodyTokenKind};

pub(crate) const BODY_PARSE: &str = "BODY_PARSE";

pub(crate) fn node_id_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("node id regex must compile"))
}

/// Which commands and whether replies may appear in the body being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyScope {
    Node,
    ReplyStatement,
    ReplyCommands,
}

impl BodyScope {
    pub(crate) fn allows_command(self, name: &str) -> bool {
        match self {
            Self::Node => matches!(name, "if" | "set" | "action" | "random"),
            Self::ReplyStatement => name == "input",
            Self::ReplyCommands => matches!(name, "set" | "action"),
        }
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Node => "in a node body",
            Self::ReplyStatement => "in a reply statement",
            Self::ReplyCommands => "in reply commands",
        }
    }
}

/// Recursive-descent parser over body tokens. Reply ids are handed out in
/// parse order, so one parser is used per node.
pub(crate) struct BodyParser<'a> {
    pub(crate) dialogue_name: &'a str,
    pub(crate) next_reply_id: usize,
}

/// Tokenizes and parses a node body written inside `dialogue_name`; the
/// result is trimmed.
pub fn parse_node_body(
    dialogue_name: &str,
    source: &str,
    origin: SourceLocation,
) -> Result<NodeBody, WoolError> {
    let tokens = tokenize_body(source, origin)?;
    let end = tokens
        .last()
        .map(|token| token.location)
        .unwrap_or(origin);
    let mut parser = BodyParser {
        dialogue_name,
        next_reply_id: 0,
    };
    let mut cursor = TokenCursor::new(&tokens, end);
    let (mut body, _) = parser.parse_body(&mut cursor, BodyScope::Node, &[])?;
    body.trim_whitespace();
    Ok(body)
}

fn peek_command_name(cursor: &TokenCursor<'_>) -> Option<String> {
    let token = cursor.peek_at(1).filter(|token| token.kind == BodyTokenKind::Text)?;
    command_name(token).map(|(name, _)| name)
}

/// Leading command word of a text token and its length in bytes, leading
/// whitespace included.
pub(crate) fn command_name(token: &BodyToken) -> Option<(String, usize)> {
    let trimmed = token.raw.trim_start();
    let leading = token.raw.len() - trimmed.len();
    let length = trimmed
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .unwrap_or(trimmed.len());
    if length == 0 {
        return None;
    }
    Some((trimmed[..length].to_ascii_lowercase(), leading + length))
}

impl BodyParser<'_> {
    /// Parses until the end of the section or until a command named in
    /// `terminators` starts; the terminator is left unconsumed and returned.
    pub(crate) fn parse_body(
        &mut self,
        cursor: &mut TokenCursor<'_>,
        scope: BodyScope,
        terminators: &[&str],
    ) -> Result<(NodeBody, Option<String>), WoolError> {
        let mut body = NodeBody::new();
        loop {
            let Some(token) = cursor.peek() else {
                if let Some(closer) = terminators.last() {
                    return Err(parse_error(
                        BODY_PARSE,
                        format!("Missing <<{}>>", closer),
                        cursor.location(),
                    ));
                }
                return Ok((body, None));
            };
            match token.kind {
                BodyTokenKind::Text | BodyTokenKind::Variable => {
                    cursor.next();
                    if body.replies().is_empty() {
                        body.add_text(token.value.clone());
                    } else if !token.value.is_whitespace() {
                        return Err(parse_error(
                            BODY_PARSE,
                            "Found content after reply",
                            token.location,
                        ));
                    }
                }
                BodyTokenKind::CommandStart => {
                    let name = peek_command_name(cursor).unwrap_or_default();
                    if terminators.contains(&name.as_str()) {
                        return Ok((body, Some(name)));
                    }
                    if !body.replies().is_empty() && !matches!(name.as_str(), "if" | "random") {
                        return Err(parse_error(
                            BODY_PARSE,
                            "Found << after reply",
                            token.location,
                        ));
                    }
                    let command = self.parse_command(cursor, scope)?;
                    body.add_command(command);
                }
                BodyTokenKind::ReplyStart => {
                    if scope != BodyScope::Node {
                        return Err(parse_error(
                            BODY_PARSE,
                            format!("Replies are not allowed {}", scope.describe()),
                            token.location,
                        ));
                    }
                    let reply = self.parse_reply(cursor)?;
                    body.add_reply(reply);
                }
                _ => {
                    return Err(parse_error(
                        BODY_PARSE,
                        format!("Unexpected {}", token.describe()),
                        token.location,
                    ));
                }
            }
        }
    }
}
