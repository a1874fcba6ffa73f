//! Structured diagnostics shared by every stage.
//!
//! External tools report failures and warnings as loosely shaped records. This
//! module gives them one typed shape: a [`PluginDiagnostic`] tagged with the
//! plugin origin and the offending file, carrying optional [`CodeFrame`]s that
//! point into the source text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Origin label attached to every diagnostic raised by this crate.
pub const PLUGIN_ORIGIN: &str = "fob-svelte";

/// A position reported by the compiler: 1-based line, 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: u32,
    pub column: u32,
}

impl LineColumn {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Highlighted range inside a code frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeHighlight {
    pub start: LineColumn,
    pub end: LineColumn,
}

/// A snippet of source attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrame {
    /// File the highlights refer to
    pub file_path: String,
    /// Source text the highlights index into
    pub code: Option<String>,
    pub highlights: Vec<CodeHighlight>,
}

impl CodeFrame {
    /// Build a frame with a single highlighted span.
    pub fn span(
        file_path: impl Into<String>,
        code: Option<String>,
        start: LineColumn,
        end: LineColumn,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            code,
            highlights: vec![CodeHighlight { start, end }],
        }
    }

    /// Byte range of the first highlight within `code`, if both are known.
    pub fn first_byte_range(&self) -> Option<(usize, usize)> {
        let code = self.code.as_deref()?;
        let highlight = self.highlights.first()?;
        let start = line_col_to_offset(code, highlight.start)?;
        let end = line_col_to_offset(code, highlight.end).unwrap_or(start);
        Some((start, end.max(start)))
    }
}

/// Error record returned by an external collaborator (preprocessor, compiler,
/// hot-reload wrapper or the bridge driving them).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    /// Tool specific error code, e.g. `parse-error`
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub start: Option<LineColumn>,
    #[serde(default)]
    pub end: Option<LineColumn>,
    /// Pre-rendered excerpt, when the tool provides one
    #[serde(default)]
    pub frame: Option<String>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, start: LineColumn, end: LineColumn) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// Structured diagnostic handed back to the host build system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDiagnostic {
    pub origin: String,
    pub file_path: PathBuf,
    pub message: String,
    pub stack: Option<String>,
    pub code_frames: Vec<CodeFrame>,
}

impl PluginDiagnostic {
    pub fn new(file_path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            origin: PLUGIN_ORIGIN.to_string(),
            file_path: file_path.into(),
            message: message.into(),
            stack: None,
            code_frames: Vec::new(),
        }
    }

    /// Convert a tool failure, attaching a code frame over `source` when the
    /// tool reported a location.
    pub fn from_tool_error(error: ToolError, file_path: &Path, source: Option<&str>) -> Self {
        let mut diagnostic = Self::new(file_path, error.message);
        diagnostic.stack = error.stack;

        if let Some(start) = error.start {
            let end = error.end.unwrap_or(start);
            let frame_path = error
                .filename
                .unwrap_or_else(|| file_path.to_string_lossy().into_owned());
            diagnostic.code_frames.push(CodeFrame::span(
                frame_path,
                source.map(str::to_owned),
                start,
                end,
            ));
        }

        diagnostic
    }
}

impl fmt::Display for PluginDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.origin,
            self.file_path.display(),
            self.message
        )?;

        if let Some(highlight) = self
            .code_frames
            .first()
            .and_then(|frame| frame.highlights.first())
        {
            write!(
                f,
                " ({}:{})",
                highlight.start.line, highlight.start.column
            )?;
        }

        Ok(())
    }
}

/// A non-fatal compiler message, forwarded to the warning sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub message: String,
    /// Compiler warning code, e.g. `a11y-missing-attribute`
    pub code: Option<String>,
    pub code_frames: Vec<CodeFrame>,
}

/// Convert a 1-based line / 0-based column into a byte offset.
pub fn line_col_to_offset(source: &str, position: LineColumn) -> Option<usize> {
    if position.line == 0 {
        return None;
    }

    let mut offset = 0;
    for (index, line) in source.split_inclusive('\n').enumerate() {
        if index + 1 == position.line as usize {
            let text = line.trim_end_matches(['\n', '\r']);
            let column = text
                .char_indices()
                .nth(position.column as usize)
                .map(|(pos, _)| pos)
                .unwrap_or(text.len());
            return Some(offset + column);
        }
        offset += line.len();
    }

    None
}
