//! Warning forwarding

use crate::diagnostic::Warning;
use std::fmt::Debug;

/// Receives the warnings of one compile as a single batch.
pub trait WarningSink: Send + Sync + Debug {
    fn warn(&self, filename: &str, warnings: &[Warning]);
}

/// Default sink: one `tracing` warning event per compiler warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, filename: &str, warnings: &[Warning]) {
        for warning in warnings {
            match warning
                .code_frames
                .first()
                .and_then(|frame| frame.highlights.first())
            {
                Some(highlight) => tracing::warn!(
                    file = filename,
                    code = warning.code.as_deref().unwrap_or_default(),
                    line = highlight.start.line,
                    column = highlight.start.column,
                    "[fob-svelte] {}",
                    warning.message
                ),
                None => tracing::warn!(
                    file = filename,
                    code = warning.code.as_deref().unwrap_or_default(),
                    "[fob-svelte] {}",
                    warning.message
                ),
            }
        }
    }
}
