//! Rolldown plugin for Svelte components
//!
//! This plugin compiles `.svelte` files with the project's own Svelte
//! toolchain (through [`fob_svelte`]) and exposes each component to Rolldown
//! as three modules:
//!
//! ```text
//! App.svelte            → load() → entry: imports ?type=css and ?type=js
//! /src/App.svelte?type=js  → resolve_id() → load() → generated script (Js)
//! /src/App.svelte?type=css → resolve_id() → load() → generated stylesheet (Css)
//! ```
//!
//! All three are split from one compiled unit per file version, so a
//! component compiles once no matter how many of its faces are loaded.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_plugin_svelte::{FobSveltePlugin, SveltePluginOptions};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! let options = SveltePluginOptions::new().with_optimize(false);
//! let plugin = Arc::new(FobSveltePlugin::with_options(PathBuf::from("."), options));
//! // Add to your Rolldown bundler configuration
//! ```

pub mod config;

pub use config::SveltePluginOptions;

use anyhow::Context;
use fob_svelte::paths::{resolve_relative, resolve_virtual, split_query};
use fob_svelte::split::TYPE_PARAM;
use fob_svelte::{
    DependencyKind, NodeBridge, OutputKind, SourceMapping, SvelteError, SvelteTransformer,
    VirtualDependency,
};
use indexmap::IndexSet;
use parking_lot::Mutex;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use rolldown_sourcemap::SourceMap;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Rolldown plugin that compiles Svelte components
#[derive(Debug, Clone)]
pub struct FobSveltePlugin {
    options: SveltePluginOptions,

    /// Project root for canonical paths and virtual imports
    project_root: PathBuf,

    transformer: Arc<SvelteTransformer>,

    /// Files pulled in by preprocessing, for the host's watcher
    watched: Arc<Mutex<IndexSet<PathBuf>>>,
}

impl FobSveltePlugin {
    /// Create a plugin with default options
    pub fn new(project_root: PathBuf) -> Self {
        Self::with_options(project_root, SveltePluginOptions::default())
    }

    /// Create a plugin that drives the project's Svelte packages through
    /// Node.js according to `options`
    pub fn with_options(project_root: PathBuf, options: SveltePluginOptions) -> Self {
        let bridge = Arc::new(
            NodeBridge::new(project_root.clone())
                .with_node_binary(options.node_binary.clone())
                .with_timeout_secs(options.timeout_secs),
        );

        let mut transformer = SvelteTransformer::new(project_root.clone(), bridge.clone());
        if options.preprocess {
            transformer = transformer.with_preprocessor(bridge.clone());
        }
        if options.hot_reload {
            transformer = transformer.with_hot_reload(bridge);
        }

        Self::with_transformer(options, transformer)
    }

    /// Create a plugin around an already configured transformer
    pub fn with_transformer(options: SveltePluginOptions, transformer: SvelteTransformer) -> Self {
        Self {
            options,
            project_root: transformer.project_root().to_path_buf(),
            transformer: Arc::new(transformer),
            watched: Arc::new(Mutex::new(IndexSet::new())),
        }
    }

    pub fn options(&self) -> &SveltePluginOptions {
        &self.options
    }

    pub fn transformer(&self) -> &SvelteTransformer {
        &self.transformer
    }

    /// Preprocess dependencies seen so far, in discovery order
    pub fn watched_files(&self) -> Vec<PathBuf> {
        self.watched.lock().iter().cloned().collect()
    }
}

impl Plugin for FobSveltePlugin {
    fn name(&self) -> Cow<'static, str> {
        "fob-svelte".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    /// Resolve ID hook - maps the entry's `/<relative>.svelte?type=...`
    /// imports back onto absolute component paths
    ///
    /// Plain `.svelte` imports are left to Rolldown's resolver.
    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let project_root = self.project_root.clone();

        async move {
            Ok(virtual_id(&project_root, &specifier).map(|id| HookResolveIdOutput {
                id: id.into(),
                ..Default::default()
            }))
        }
    }

    /// Load hook - compiles the component (once per version) and returns
    /// the requested face
    ///
    /// # Returns
    ///
    /// - `Ok(Some(output))` - Entry, script or stylesheet module
    /// - `Ok(None)` - Not a Svelte file, let Rolldown handle it
    /// - `Err(e)` - Read, preprocess, compile or unknown `type` error
    fn load(
        &self,
        ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let ctx = ctx.clone();
        let id = args.id.to_string();
        let project_root = self.project_root.clone();
        let transformer = Arc::clone(&self.transformer);
        let watched = Arc::clone(&self.watched);
        let optimize = self.options.is_optimized();

        async move {
            let (path, query) = split_query(&id);
            if !path.ends_with(".svelte") {
                return Ok(None);
            }

            let file_path = if Path::new(path).is_absolute() {
                PathBuf::from(path)
            } else {
                project_root.join(path)
            };

            let request = transformer.output_request(&file_path, query)?;

            let source = tokio::fs::read_to_string(&file_path)
                .await
                .map_err(|e| SvelteError::read(&file_path, e))?;

            let artifact = transformer
                .transform(&file_path, &source, request, optimize)
                .await
                .with_context(|| format!("Failed to compile Svelte component: {}", id))?;

            let files = dependency_files(&project_root, &artifact.dependencies);
            if !files.is_empty() {
                watch_files(&ctx, &files);
                watched.lock().extend(files);
            }

            let map = artifact.map.as_ref().map(to_source_map).transpose()?;
            let module_type = match artifact.kind {
                OutputKind::Js => ModuleType::Js,
                OutputKind::Css => ModuleType::Css,
            };

            debug!(
                path = %file_path.display(),
                request = %request,
                code_len = artifact.code.len(),
                "[fob-svelte] loaded component output"
            );

            Ok(Some(HookLoadOutput {
                code: artifact.code.into(),
                map,
                module_type: Some(module_type),
                ..Default::default()
            }))
        }
    }
}

/// Absolute id for a `/<relative>.svelte?type=...` import, or `None` when
/// `specifier` is not one.
fn virtual_id(project_root: &Path, specifier: &str) -> Option<String> {
    let (path, query) = split_query(specifier);
    let query = query?;
    if !path.ends_with(".svelte") || !path.starts_with('/') || !has_type_param(query) {
        return None;
    }

    let resolved = resolve_virtual(project_root, path);
    let id = if resolved.exists() || !Path::new(path).exists() {
        resolved
    } else {
        PathBuf::from(path)
    };

    Some(format!("{}?{}", id.to_string_lossy(), query))
}

/// Absolute paths of the files preprocessing read, in entry order.
fn dependency_files(project_root: &Path, dependencies: &[VirtualDependency]) -> Vec<PathBuf> {
    dependencies
        .iter()
        .filter(|dependency| dependency.kind == DependencyKind::File)
        .map(|dependency| resolve_relative(project_root, &dependency.specifier))
        .collect()
}

/// Register `files` with Rolldown's watcher. Only the native context
/// supports this; the napi context is a no-op here.
fn watch_files(ctx: &PluginContext, files: &[PathBuf]) {
    if let PluginContext::Native(_) = ctx {
        for file in files {
            ctx.add_watch_file(&file.to_string_lossy());
        }
    }
}

fn has_type_param(query: &str) -> bool {
    query
        .split('&')
        .any(|pair| pair.split('=').next() == Some(TYPE_PARAM))
}

fn to_source_map(mapping: &SourceMapping) -> anyhow::Result<SourceMap> {
    let json = mapping.to_json()?;
    SourceMap::from_json_string(&json).context("Invalid source map from Svelte compiler")
}
