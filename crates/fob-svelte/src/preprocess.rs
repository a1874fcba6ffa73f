//! Preprocessing adapter
//!
//! Preprocessing is an optional textual pass (TypeScript in `<script lang="ts">`,
//! SCSS in `<style lang="scss">`, ...) run before compilation. It may return a
//! source map and a list of extra files it read, such as imported partials.

use crate::diagnostic::ToolError;
use crate::sourcemap::SourceMapping;
use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Output of a preprocessing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreprocessOutput {
    pub code: String,
    pub map: Option<SourceMapping>,
    /// Files the preprocessor pulled in, as reported (usually absolute)
    pub dependencies: Vec<PathBuf>,
}

impl PreprocessOutput {
    /// Output that leaves the source untouched.
    pub fn unchanged(source: &str) -> Self {
        Self {
            code: source.to_string(),
            ..Default::default()
        }
    }
}

/// External preprocessor.
#[async_trait]
pub trait Preprocessor: Send + Sync + Debug {
    /// Transform `source`. `filename` is the absolute path of the component.
    async fn preprocess(&self, source: &str, filename: &Path) -> Result<PreprocessOutput, ToolError>;
}
