//! Error types for the Node.js bridge

use crate::diagnostic::ToolError;
use miette::Diagnostic;
use thiserror::Error;

/// Failures of the bridge process itself, as opposed to errors the driven
/// tool reported for the component.
#[derive(Error, Debug, Diagnostic)]
pub enum BridgeError {
    /// Node.js binary not found in PATH
    #[error("Node.js binary '{binary}' not found in PATH")]
    #[diagnostic(
        code(fob::svelte::node_not_found),
        help("Install Node.js or point the plugin at it with `node_binary`")
    )]
    NodeNotFound { binary: String },

    /// Failed to spawn or talk to the Node.js process
    #[error("Failed to run Node.js bridge process: {source}")]
    #[diagnostic(code(fob::svelte::spawn_failed))]
    SpawnFailed {
        #[source]
        source: std::io::Error,
    },

    /// Driver exited with non-zero status
    #[error("Node.js bridge exited with code {exit_code}")]
    #[diagnostic(code(fob::svelte::bridge_exit_error))]
    ExitError {
        exit_code: i32,
        #[help]
        stderr: String,
    },

    /// Reply exceeded the maximum allowed size
    #[error("Bridge output too large: {actual_bytes} bytes (max: {max_bytes} bytes)")]
    #[diagnostic(code(fob::svelte::output_too_large))]
    OutputTooLarge {
        actual_bytes: usize,
        max_bytes: usize,
    },

    /// Reply was not the expected JSON shape
    #[error("Failed to parse bridge reply: {source}")]
    #[diagnostic(
        code(fob::svelte::invalid_reply),
        help("Check that svelte, svelte-preprocess and svelte-hmr are installed in the project")
    )]
    InvalidReply {
        #[source]
        source: serde_json::Error,
    },

    /// Bridge process timed out
    #[error("Node.js bridge timed out after {timeout_secs} seconds")]
    #[diagnostic(
        code(fob::svelte::timeout),
        help("Try increasing `timeout_secs` or check whether the compiler is stuck")
    )]
    Timeout { timeout_secs: u64 },
}

impl BridgeError {
    pub fn spawn_failed(source: std::io::Error) -> Self {
        Self::SpawnFailed { source }
    }

    pub fn exit_error(exit_code: i32, stderr: String) -> Self {
        Self::ExitError { exit_code, stderr }
    }

    pub fn output_too_large(actual_bytes: usize, max_bytes: usize) -> Self {
        Self::OutputTooLarge {
            actual_bytes,
            max_bytes,
        }
    }

    pub fn invalid_reply(source: serde_json::Error) -> Self {
        Self::InvalidReply { source }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        Self::Timeout { timeout_secs }
    }
}

impl From<BridgeError> for ToolError {
    fn from(error: BridgeError) -> Self {
        let mut tool_error = ToolError::new(error.to_string());
        if let BridgeError::ExitError { stderr, .. } = &error {
            if !stderr.is_empty() {
                tool_error.stack = Some(stderr.clone());
            }
        }
        tool_error.code = Some("bridge".to_string());
        tool_error
    }
}
