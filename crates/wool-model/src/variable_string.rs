use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use wool_core::WoolError;
use wool_expr::Environment;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StringPart {
    Text { text: String },
    Variable { name: String },
}

/// Literal text interleaved with `$name` references. Adjacent literal
/// parts are always merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableString {
    parts: Vec<StringPart>,
}

impl VariableString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.push_text(text);
        result
    }

    pub fn parts(&self) -> &[StringPart] {
        &self.parts
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(StringPart::Text { text: last }) = self.parts.last_mut() {
            last.push_str(&text);
            return;
        }
        self.parts.push(StringPart::Text { text });
    }

    pub fn push_variable(&mut self, name: impl Into<String>) {
        self.parts.push(StringPart::Variable { name: name.into() });
    }

    pub fn push(&mut self, part: StringPart) {
        match part {
            StringPart::Text { text } => self.push_text(text),
            StringPart::Variable { name } => self.push_variable(name),
        }
    }

    pub fn extend(&mut self, other: VariableString) {
        for part in other.parts {
            self.push(part);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn is_whitespace(&self) -> bool {
        self.parts.iter().all(|part| match part {
            StringPart::Text { text } => text.trim().is_empty(),
            StringPart::Variable { .. } => false,
        })
    }

    pub fn is_plain_text(&self) -> bool {
        self.parts
            .iter()
            .all(|part| matches!(part, StringPart::Text { .. }))
    }

    /// The literal content when there are no variable references.
    pub fn plain_text(&self) -> Option<String> {
        if !self.is_plain_text() {
            return None;
        }
        Some(self.literal_text())
    }

    fn literal_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                StringPart::Text { text } => Some(text.as_str()),
                StringPart::Variable { .. } => None,
            })
            .collect()
    }

    pub fn trim_whitespace(&mut self) {
        self.trim_start();
        self.trim_end();
    }

    pub fn trim_start(&mut self) {
        while let Some(StringPart::Text { text }) = self.parts.first_mut() {
            let trimmed = text.trim_start().to_string();
            if !trimmed.is_empty() {
                *text = trimmed;
                return;
            }
            self.parts.remove(0);
        }
    }

    pub fn trim_end(&mut self) {
        while let Some(StringPart::Text { text }) = self.parts.last_mut() {
            let trimmed = text.trim_end().to_string();
            if !trimmed.is_empty() {
                *text = trimmed;
                return;
            }
            self.parts.pop();
        }
    }

    pub fn read_variable_names(&self, names: &mut BTreeSet<String>) {
        for part in &self.parts {
            if let StringPart::Variable { name } = part {
                names.insert(name.clone());
            }
        }
    }

    /// Substitutes every variable by the display form of its value.
    pub fn evaluate(&self, env: &dyn Environment) -> Result<String, WoolError> {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                StringPart::Text { text } => result.push_str(text),
                StringPart::Variable { name } => result.push_str(&env.get(name)?.to_string()),
            }
        }
        Ok(result)
    }

    pub fn resolve(&self, env: &dyn Environment) -> Result<VariableString, WoolError> {
        Ok(VariableString::from_text(self.evaluate(env)?))
    }

    /// Source form, escaping `\`, `$` and any of `extra`.
    pub fn to_source(&self, extra: &[char]) -> String {
        let mut result = String::new();
        for part in &self.parts {
            match part {
                StringPart::Text { text } => {
                    for ch in text.chars() {
                        if ch == '\\' || ch == '$' || extra.contains(&ch) {
                            result.push('\\');
                        }
                        result.push(ch);
                    }
                }
                StringPart::Variable { name } => {
                    result.push('$');
                    result.push_str(name);
                }
            }
        }
        result
    }
}

impl fmt::Display for VariableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_source(&[]))
    }
}
