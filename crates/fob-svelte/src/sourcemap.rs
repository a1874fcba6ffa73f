//! Raw source maps and sanitization
//!
//! Maps come from two places: the preprocessor (which may hand back either a
//! JSON string or an object) and the compiler. Before a map leaves this crate
//! it is sanitized so that every mapped position is attributed to the single
//! canonical file, however many textual transforms ran before.

use serde::{Deserialize, Serialize};

/// A v3 source map in its JSON form (VLQ `mappings`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapping {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}

fn default_version() -> u32 {
    3
}

impl SourceMapping {
    /// Parse a JSON source map.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize back to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Point the map at `filename` and collapse its sources to that one path.
    pub fn sanitize(&mut self, filename: &str) {
        self.file = Some(filename.to_string());
        self.sources = vec![filename.to_string()];
        if let Some(contents) = self.sources_content.as_mut() {
            contents.truncate(1);
        }
    }

    /// Owned variant of [`SourceMapping::sanitize`].
    pub fn sanitized(mut self, filename: &str) -> Self {
        self.sanitize(filename);
        self
    }
}

/// Source map as returned by a tool: either already structured or still JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSourceMap {
    Object(SourceMapping),
    Json(String),
}

impl RawSourceMap {
    pub fn into_mapping(self) -> Result<SourceMapping, serde_json::Error> {
        match self {
            Self::Object(mapping) => Ok(mapping),
            Self::Json(json) => SourceMapping::from_json(&json),
        }
    }
}
