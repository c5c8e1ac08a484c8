use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::NodeBody;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeHeader {
    pub title: String,
    pub speaker: Option<String>,
    pub optional_tags: BTreeMap<String, String>,
}

impl NodeHeader {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub header: NodeHeader,
    pub body: NodeBody,
}

impl Node {
    pub fn new(header: NodeHeader, body: NodeBody) -> Self {
        Self { header, body }
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn speaker(&self) -> Option<&str> {
        self.header.speaker.as_deref()
    }

    /// Lookup key; titles compare case-insensitively.
    pub fn key(&self) -> String {
        self.header.title.to_ascii_lowercase()
    }
}
