//! Error types for Svelte compilation

use crate::diagnostic::{PluginDiagnostic, PLUGIN_ORIGIN};
use miette::{Diagnostic, LabeledSpan, Severity, SourceCode};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fob-svelte operations.
pub type Result<T> = std::result::Result<T, SvelteError>;

/// Errors raised while producing or splitting a compiled unit.
///
/// Every variant can be turned into a [`PluginDiagnostic`] for hosts that
/// want the structured form. Template errors and tool failures carry the
/// diagnostic directly; [`SvelteError::MissingProgram`] is an internal
/// consistency failure, not a user error.
#[derive(Debug, Error)]
pub enum SvelteError {
    /// Source file could not be read
    #[error("[{}] failed to read {}: {}", PLUGIN_ORIGIN, .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Preprocessor rejected the source
    #[error("{0}")]
    Preprocess(Box<PluginDiagnostic>),

    /// Compiler rejected the (preprocessed) source
    #[error("{0}")]
    Compile(Box<PluginDiagnostic>),

    /// Hot-reload wrapping failed
    #[error("{0}")]
    HotReload(Box<PluginDiagnostic>),

    /// `type` query value is not one of `main`, `js`, `css`
    #[error("[{}] unknown output type '{}' requested for {}", PLUGIN_ORIGIN, .value, .path.display())]
    UnknownOutputType { path: PathBuf, value: String },

    /// A face was requested for a file that was never compiled
    #[error("[{}] internal error: no compiled program for {}", PLUGIN_ORIGIN, .path.display())]
    MissingProgram { path: PathBuf },
}

impl SvelteError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn missing_program(path: impl Into<PathBuf>) -> Self {
        Self::MissingProgram { path: path.into() }
    }

    /// Whether this error indicates a broken orchestration invariant rather
    /// than a problem in the user's component.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::MissingProgram { .. })
    }

    /// The structured diagnostic for this error.
    pub fn to_diagnostic(&self) -> PluginDiagnostic {
        match self {
            Self::Preprocess(diagnostic)
            | Self::Compile(diagnostic)
            | Self::HotReload(diagnostic) => (**diagnostic).clone(),
            Self::Read { path, source } => PluginDiagnostic::new(path, source.to_string()),
            Self::UnknownOutputType { path, value } => {
                PluginDiagnostic::new(path, format!("unknown output type '{}'", value))
            }
            Self::MissingProgram { path } => {
                PluginDiagnostic::new(path, "no compiled program available")
            }
        }
    }

    fn inner(&self) -> Option<&PluginDiagnostic> {
        match self {
            Self::Preprocess(diagnostic)
            | Self::Compile(diagnostic)
            | Self::HotReload(diagnostic) => Some(diagnostic.as_ref()),
            _ => None,
        }
    }
}

impl Diagnostic for SvelteError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(match self {
            Self::Read { .. } => "fob::svelte::read",
            Self::Preprocess(_) => "fob::svelte::preprocess",
            Self::Compile(_) => "fob::svelte::compile",
            Self::HotReload(_) => "fob::svelte::hot_reload",
            Self::UnknownOutputType { .. } => "fob::svelte::unknown_output_type",
            Self::MissingProgram { .. } => "fob::svelte::missing_program",
        }))
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::Error)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            Self::Preprocess(_) => Some(Box::new(
                "Check the embedded <script lang> / <style lang> blocks and the preprocessor setup",
            )),
            Self::UnknownOutputType { .. } => {
                Some(Box::new("Valid values for ?type= are main, js and css"))
            }
            Self::MissingProgram { .. } => Some(Box::new(
                "The component must be compiled before its js/css outputs are requested. This is a bug in the host integration.",
            )),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        let frame = self.inner()?.code_frames.first()?;
        frame.code.as_ref().map(|code| code as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let diagnostic = self.inner()?;
        let frame = diagnostic.code_frames.first()?;
        let (start, end) = frame.first_byte_range()?;
        let span = LabeledSpan::new(Some(diagnostic.message.clone()), start, (end - start).max(1));
        Some(Box::new(std::iter::once(span)))
    }
}
