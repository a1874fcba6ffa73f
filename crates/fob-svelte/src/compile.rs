//! Compilation adapter types
//!
//! The compiler is driven with one fixed configuration; only the filename,
//! the optimize flag and the incoming preprocess map vary per call.

use crate::diagnostic::{CodeFrame, LineColumn, ToolError, Warning};
use crate::sourcemap::SourceMapping;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Module style of the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    Esm,
}

/// Code generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateTarget {
    Dom,
}

/// Which outputs get a source map from the compiler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnableSourcemap {
    pub js: bool,
    pub css: bool,
}

/// Options passed to the compiler, serialized in the compiler's own shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOptions {
    pub filename: String,
    pub format: ModuleFormat,
    pub generate: GenerateTarget,
    pub dev: bool,
    pub legacy: bool,
    pub custom_element: bool,
    /// `false` keeps styles out of the JS so they are emitted separately
    #[serde(rename = "css")]
    pub inject_css: bool,
    pub preserve_comments: bool,
    pub preserve_whitespace: bool,
    pub enable_sourcemap: EnableSourcemap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcemap: Option<SourceMapping>,
}

impl CompileOptions {
    /// The fixed configuration for one file.
    pub fn for_file(filename: impl Into<String>, optimize: bool, sourcemap: Option<SourceMapping>) -> Self {
        Self {
            filename: filename.into(),
            format: ModuleFormat::Esm,
            generate: GenerateTarget::Dom,
            dev: !optimize,
            legacy: false,
            custom_element: false,
            inject_css: false,
            preserve_comments: !optimize,
            preserve_whitespace: !optimize,
            enable_sourcemap: EnableSourcemap {
                js: true,
                css: false,
            },
            sourcemap,
        }
    }
}

/// One generated output (script or stylesheet).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCode {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub code: String,
    #[serde(default)]
    pub map: Option<SourceMapping>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl GeneratedCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }

    /// Whether this output has any content worth importing.
    pub fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }
}

/// A warning as reported by the compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileWarning {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub start: Option<LineColumn>,
    #[serde(default)]
    pub end: Option<LineColumn>,
}

impl CompileWarning {
    /// Convert to a forwarded warning. A code frame is attached only when
    /// the compiler reported a filename, a start and an end.
    pub fn to_warning(&self, source: &str) -> Warning {
        let mut code_frames = Vec::new();
        if let (Some(filename), Some(start), Some(end)) = (&self.filename, self.start, self.end) {
            code_frames.push(CodeFrame::span(
                filename.clone(),
                Some(source.to_string()),
                start,
                end,
            ));
        }

        Warning {
            message: self.message.clone(),
            code: self.code.clone(),
            code_frames,
        }
    }
}

/// A top-level variable of the component, as reported by the compiler.
///
/// The hot-reload wrapper uses these to preserve exported props across
/// module replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ComponentVar {
    pub name: String,
    #[serde(default)]
    pub export_name: Option<String>,
    #[serde(default)]
    pub module: bool,
    #[serde(default)]
    pub writable: bool,
}

/// Structured result of one compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub js: GeneratedCode,
    #[serde(default)]
    pub css: Option<GeneratedCode>,
    #[serde(default)]
    pub warnings: Vec<CompileWarning>,
    #[serde(default)]
    pub vars: Vec<ComponentVar>,
}

/// External template compiler.
#[async_trait]
pub trait Compiler: Send + Sync + Debug {
    async fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, ToolError>;
}
