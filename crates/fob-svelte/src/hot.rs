//! Hot-reload wrapping
//!
//! In non-optimized builds the generated script is rewritten to register the
//! component with a hot-module-replacement runtime. The rewrite is purely
//! textual: the stylesheet and the script source map are left as they are.

use crate::compile::CompileOutput;
use crate::diagnostic::ToolError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

/// Expression the wrapped code uses to reach the host's HMR API.
pub const HOT_META: &str = "import.meta.hot";

/// Runtime module that performs the component swap.
pub const HOT_API_MODULE: &str = "svelte-hmr/runtime/hot-api-esm.js";

/// Adapter module that proxies DOM component instances.
pub const HOT_ADAPTER_MODULE: &str = "svelte-hmr/runtime/proxy-adapter-dom.js";

/// Process-wide hot-reload settings. Not user configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotReloadConfig {
    pub meta: &'static str,
    pub hot_api: &'static str,
    pub adapter: &'static str,
    pub absolute_imports: bool,
    pub version_non_absolute_imports: bool,
}

/// The one configuration every wrap uses.
pub const HOT_RELOAD_CONFIG: HotReloadConfig = HotReloadConfig {
    meta: HOT_META,
    hot_api: HOT_API_MODULE,
    adapter: HOT_ADAPTER_MODULE,
    absolute_imports: false,
    version_non_absolute_imports: false,
};

/// Per-component options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotOptions {
    pub inject_css: bool,
}

impl Default for HotOptions {
    fn default() -> Self {
        Self { inject_css: true }
    }
}

/// Everything the wrapper needs for one component.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotReloadRequest<'a> {
    /// Canonical relative path, used as the module id
    pub id: &'a str,
    pub compiled_code: &'a str,
    pub original_code: &'a str,
    pub compiled: &'a CompileOutput,
    pub config: HotReloadConfig,
    pub hot_options: HotOptions,
}

impl<'a> HotReloadRequest<'a> {
    pub fn new(id: &'a str, original_code: &'a str, compiled: &'a CompileOutput) -> Self {
        Self {
            id,
            compiled_code: &compiled.js.code,
            original_code,
            compiled,
            config: HOT_RELOAD_CONFIG,
            hot_options: HotOptions::default(),
        }
    }
}

/// External hot-reload transform. Returns the rewritten script text.
#[async_trait]
pub trait HotReloadWrapper: Send + Sync + Debug {
    async fn wrap(&self, request: &HotReloadRequest<'_>) -> Result<String, ToolError>;
}
