use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const TITLE: &str = "Title";
pub const CATEGORY: &str = "Category";
pub const ERROR_CODE: &str = "Error_Code";

/// Header name → header value, as discovered while splitting the manual.
pub type HeaderMap = BTreeMap<String, String>;

/// A retrievable unit of manual text.
///
/// `content` always starts with the injected `"<Category> - <Error_Code>\n\n"`
/// line, so the embedded text keeps the code-to-procedure link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    #[serde(default)]
    pub metadata: HeaderMap,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, metadata: HeaderMap) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    pub fn header_context(&self) -> String {
        header_context(&self.metadata)
    }

    /// The manual text without the injected context line.
    pub fn body(&self) -> &str {
        let prefix = format!("{}\n\n", self.header_context());
        self.content
            .strip_prefix(prefix.as_str())
            .unwrap_or(&self.content)
    }
}

/// `"<Category> - <Error_Code>"`, with empty segments for absent headers.
pub fn header_context(metadata: &HeaderMap) -> String {
    format!(
        "{} - {}",
        metadata.get(CATEGORY).map(String::as_str).unwrap_or(""),
        metadata.get(ERROR_CODE).map(String::as_str).unwrap_or("")
    )
}
