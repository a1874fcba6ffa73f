//! Svelte plugin configuration types
//!
//! The compiler configuration itself is fixed; these options only pick the
//! build mode and how the Node.js toolchain is reached.

use fob_svelte::bridge::{DEFAULT_NODE_BINARY, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};

/// Configuration for the Svelte plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SveltePluginOptions {
    /// Optimized (production) build
    ///
    /// Unset means optimized. Dev builds (`Some(false)`) keep comments and
    /// whitespace, enable dev diagnostics and wrap components for hot reload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimize: Option<bool>,

    /// Run `svelte-preprocess` before compiling, when it is installed
    pub preprocess: bool,

    /// Wrap components with `svelte-hmr` in dev builds
    pub hot_reload: bool,

    /// Node.js executable used to run the toolchain
    pub node_binary: String,

    /// Timeout for one toolchain call in seconds
    pub timeout_secs: u64,
}

impl Default for SveltePluginOptions {
    fn default() -> Self {
        Self {
            optimize: None,
            preprocess: true,
            hot_reload: true,
            node_binary: DEFAULT_NODE_BINARY.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SveltePluginOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the build mode
    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = Some(optimize);
        self
    }

    /// Enable or disable preprocessing
    pub fn with_preprocess(mut self, enabled: bool) -> Self {
        self.preprocess = enabled;
        self
    }

    /// Enable or disable hot-reload wrapping
    pub fn with_hot_reload(mut self, enabled: bool) -> Self {
        self.hot_reload = enabled;
        self
    }

    /// Set the Node.js executable
    pub fn with_node_binary(mut self, node_binary: impl Into<String>) -> Self {
        self.node_binary = node_binary.into();
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Effective build mode.
    pub fn is_optimized(&self) -> bool {
        self.optimize.unwrap_or(true)
    }
}
