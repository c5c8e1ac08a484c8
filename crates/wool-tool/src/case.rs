use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wool_core::Value;

pub const TESTCASE_SCHEMA_V1: &str = "wool-tool-case.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub schema_version: String,
    #[serde(default = "default_entry_dialogue")]
    pub entry_dialogue: String,
    #[serde(default)]
    pub start_node: Option<String>,
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub expected_events: Vec<ExpectedEvent>,
}

fn default_entry_dialogue() -> String {
    "main".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestAction {
    Reply {
        #[serde(rename = "replyId")]
        reply_id: usize,
    },
    Input {
        #[serde(rename = "replyId")]
        reply_id: usize,
        values: BTreeMap<String, Value>,
    },
}

impl TestAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Reply { .. } => "reply",
            Self::Input { .. } => "input",
        }
    }

    pub fn reply_id(&self) -> usize {
        match self {
            Self::Reply { reply_id } | Self::Input { reply_id, .. } => *reply_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExpectedEvent {
    Node {
        dialogue: String,
        node: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
        text: String,
        #[serde(default)]
        replies: Vec<String>,
    },
    End,
}
