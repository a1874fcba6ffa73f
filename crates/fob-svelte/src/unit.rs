//! The compiled unit and the reuse gate

use crate::compile::GeneratedCode;
use serde::{Deserialize, Serialize};

/// Kind tag recorded on every unit this crate produces.
pub const ARTIFACT_KIND: &str = "fob-svelte";

/// Format version of [`CompiledUnit`]. Changing it invalidates every
/// previously stored unit.
pub const FORMAT_VERSION: &str = "0.1.0";

/// Identity of a stored artifact, checked before reuse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub kind: String,
    pub version: String,
}

impl ArtifactMeta {
    /// Meta for a unit produced by this build of the crate.
    pub fn current() -> Self {
        Self {
            kind: ARTIFACT_KIND.to_string(),
            version: FORMAT_VERSION.to_string(),
        }
    }
}

/// Reuse is granted iff the kind and the format version both match.
pub fn can_reuse(meta: &ArtifactMeta) -> bool {
    meta.kind == ARTIFACT_KIND && meta.version == FORMAT_VERSION
}

/// Result of preprocessing and compiling one version of one source file.
///
/// Immutable once produced. The entry, script and style outputs of a file
/// are all split from the same unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledUnit {
    pub meta: ArtifactMeta,
    /// Canonical path relative to the project root, `/`-separated
    pub filename: String,
    /// Generated script, hot-reload wrapped when `optimized` is false
    pub js: GeneratedCode,
    pub css: Option<GeneratedCode>,
    /// Files pulled in by preprocessing, relative to the project root
    pub dependencies: Vec<String>,
    pub optimized: bool,
}

impl CompiledUnit {
    pub fn is_reusable(&self) -> bool {
        can_reuse(&self.meta)
    }

    /// Whether the stylesheet has non-whitespace content.
    pub fn has_styles(&self) -> bool {
        self.css.as_ref().is_some_and(|css| !css.is_blank())
    }
}
