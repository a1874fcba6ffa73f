//! In-process fakes for the external collaborators.
//!
//! Enabled with the `test-utils` feature. None of these start a Node.js
//! process; they are deterministic so tests can assert on exact output.

use crate::compile::{CompileOptions, CompileOutput, CompileWarning, Compiler, GeneratedCode};
use crate::diagnostic::{LineColumn, ToolError, Warning};
use crate::hot::{HotReloadRequest, HotReloadWrapper};
use crate::preprocess::{PreprocessOutput, Preprocessor};
use crate::sink::WarningSink;
use crate::sourcemap::SourceMapping;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Marker the fake hot wrapper appends to wrapped scripts.
pub const HOT_MARKER: &str = "/* hot: ";

/// Compiler fake.
///
/// Every `<style>` block becomes the stylesheet; the remaining markup is
/// embedded in a default-exported render function. A source containing
/// `{#fail}` is rejected with a located error.
#[derive(Debug, Default)]
pub struct FakeCompiler {
    calls: AtomicUsize,
    warnings: Vec<CompileWarning>,
    last_options: Mutex<Option<CompileOptions>>,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `warnings` on every compile.
    pub fn with_warnings(mut self, warnings: Vec<CompileWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<CompileOptions> {
        self.last_options.lock().clone()
    }
}

#[async_trait]
impl Compiler for FakeCompiler {
    async fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock() = Some(options.clone());

        if let Some(offset) = source.find("{#fail}") {
            let line = source[..offset].matches('\n').count() as u32 + 1;
            let column = source[..offset]
                .rsplit('\n')
                .next()
                .map(|text| text.chars().count())
                .unwrap_or_default() as u32;
            return Err(ToolError {
                code: Some("parse-error".into()),
                filename: Some(options.filename.clone()),
                ..ToolError::new("Unexpected block {#fail}")
                    .with_location(LineColumn::new(line, column), LineColumn::new(line, column + 7))
            });
        }

        let (markup, css) = extract_styles(source);
        let markup = serde_json::Value::String(markup.trim().to_string()).to_string();
        let js = GeneratedCode {
            code: format!(
                "export default function Component(target) {{ target.innerHTML = {}; }}",
                markup
            ),
            map: Some(SourceMapping {
                version: 3,
                file: Some("Component.js".into()),
                source_root: None,
                sources: vec![options.filename.clone(), "internal.js".into()],
                sources_content: Some(vec![Some(source.to_string()), None]),
                names: Vec::new(),
                mappings: "AAAA".into(),
            }),
        };

        Ok(CompileOutput {
            js,
            css: Some(GeneratedCode::new(css)),
            warnings: self.warnings.clone(),
            vars: Vec::new(),
        })
    }
}

fn extract_styles(source: &str) -> (String, String) {
    let mut markup = String::new();
    let mut css = String::new();
    let mut rest = source;

    while let Some(start) = rest.find("<style>") {
        markup.push_str(&rest[..start]);
        let body = &rest[start + "<style>".len()..];
        match body.find("</style>") {
            Some(end) => {
                css.push_str(&body[..end]);
                rest = &body[end + "</style>".len()..];
            }
            None => {
                css.push_str(body);
                rest = "";
            }
        }
    }
    markup.push_str(rest);

    (markup, css)
}

/// Preprocessor fake: returns the source unchanged with a fixed
/// multi-source map and the configured dependency list.
#[derive(Debug, Default)]
pub struct FakePreprocessor {
    dependencies: Vec<PathBuf>,
    error: Option<ToolError>,
    calls: AtomicUsize,
}

impl FakePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dependencies<I, P>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Fail every call with `error`.
    pub fn failing(error: ToolError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Preprocessor for FakePreprocessor {
    async fn preprocess(&self, source: &str, filename: &Path) -> Result<PreprocessOutput, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        Ok(PreprocessOutput {
            code: source.to_string(),
            map: Some(SourceMapping {
                version: 3,
                file: None,
                source_root: None,
                sources: vec![
                    filename.to_string_lossy().into_owned(),
                    "partial.scss".into(),
                ],
                sources_content: None,
                names: Vec::new(),
                mappings: "AAAA".into(),
            }),
            dependencies: self.dependencies.clone(),
        })
    }
}

/// Hot wrapper fake: appends a comment naming the module id.
#[derive(Debug, Default)]
pub struct FakeHotReload {
    calls: AtomicUsize,
}

impl FakeHotReload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HotReloadWrapper for FakeHotReload {
    async fn wrap(&self, request: &HotReloadRequest<'_>) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}\n{}{} */", request.compiled_code, HOT_MARKER, request.id))
    }
}

/// Sink that keeps every batch it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    batches: Mutex<Vec<(String, Vec<Warning>)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<(String, Vec<Warning>)> {
        self.batches.lock().clone()
    }
}

impl WarningSink for RecordingSink {
    fn warn(&self, filename: &str, warnings: &[Warning]) {
        self.batches
            .lock()
            .push((filename.to_string(), warnings.to_vec()));
    }
}
