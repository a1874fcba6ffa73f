//! The transformer: preprocess → compile → (hot wrap) → split
//!
//! [`SvelteTransformer`] is the host-facing surface. Hosts call
//! [`SvelteTransformer::transform`] per import; the first request for a file
//! version compiles it, and every face (entry, script, style) of that
//! version is split from the same stored unit.

use crate::bridge::NodeBridge;
use crate::cache::UnitCache;
use crate::compile::{CompileOptions, Compiler};
use crate::diagnostic::{PluginDiagnostic, ToolError, Warning};
use crate::error::{Result, SvelteError};
use crate::hot::{HotReloadRequest, HotReloadWrapper};
use crate::paths::relative_url;
use crate::preprocess::{PreprocessOutput, Preprocessor};
use crate::sink::{TracingSink, WarningSink};
use crate::split::{split, OutputArtifact, OutputRequest};
use crate::unit::{can_reuse, ArtifactMeta, CompiledUnit};
use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Compiles Svelte components and materializes their build-graph outputs.
#[derive(Debug)]
pub struct SvelteTransformer {
    project_root: PathBuf,
    compiler: Arc<dyn Compiler>,
    preprocessor: Option<Arc<dyn Preprocessor>>,
    hot_reload: Option<Arc<dyn HotReloadWrapper>>,
    sink: Arc<dyn WarningSink>,
    cache: UnitCache,
}

impl SvelteTransformer {
    /// Transformer with only a compiler: no preprocessing, no hot reload,
    /// warnings logged through `tracing`.
    pub fn new(project_root: impl Into<PathBuf>, compiler: Arc<dyn Compiler>) -> Self {
        let project_root = project_root.into();
        Self {
            cache: UnitCache::new(project_root.clone()),
            project_root,
            compiler,
            preprocessor: None,
            hot_reload: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Transformer driving the project's own Svelte packages through `bridge`
    /// for all three stages.
    pub fn with_bridge(bridge: NodeBridge) -> Self {
        let project_root = bridge.project_root().to_path_buf();
        let bridge = Arc::new(bridge);
        Self::new(project_root, bridge.clone())
            .with_preprocessor(bridge.clone())
            .with_hot_reload(bridge)
    }

    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn Preprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn without_preprocessor(mut self) -> Self {
        self.preprocessor = None;
        self
    }

    pub fn with_hot_reload(mut self, hot_reload: Arc<dyn HotReloadWrapper>) -> Self {
        self.hot_reload = Some(hot_reload);
        self
    }

    pub fn without_hot_reload(mut self) -> Self {
        self.hot_reload = None;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn WarningSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn cache(&self) -> &UnitCache {
        &self.cache
    }

    /// Canonical relative path of `path`.
    pub fn canonical_name(&self, path: &Path) -> String {
        relative_url(&self.project_root, path)
    }

    /// Reuse gate for a previously produced unit.
    pub fn can_reuse(&self, meta: &ArtifactMeta) -> bool {
        can_reuse(meta)
    }

    /// Preprocess and compile one version of a component.
    ///
    /// Does not touch the unit store. On error nothing is produced; the
    /// error carries the component path and the plugin origin.
    pub async fn produce(&self, source: &str, path: &Path, optimize: bool) -> Result<CompiledUnit> {
        let filename = self.canonical_name(path);
        let file_path = self.absolute(path);
        debug!("[fob-svelte] compiling file: {}", filename);

        let preprocessed = match &self.preprocessor {
            Some(preprocessor) => preprocessor
                .preprocess(source, &file_path)
                .await
                .map_err(|e| SvelteError::Preprocess(diagnostic(e, &file_path, source)))?,
            None => PreprocessOutput::unchanged(source),
        };
        let code = preprocessed.code.as_str();

        let options = CompileOptions::for_file(
            file_path.to_string_lossy(),
            optimize,
            preprocessed.map.clone().map(|map| map.sanitized(&filename)),
        );
        let mut compiled = self
            .compiler
            .compile(code, &options)
            .await
            .map_err(|e| SvelteError::Compile(diagnostic(e, &file_path, code)))?;

        if !optimize {
            if let Some(hot_reload) = &self.hot_reload {
                let wrapped = {
                    let request = HotReloadRequest::new(&filename, code, &compiled);
                    hot_reload.wrap(&request).await
                }
                .map_err(|e| SvelteError::HotReload(diagnostic(e, &file_path, code)))?;
                compiled.js.code = wrapped;
            }
        }

        let warnings: Vec<Warning> = compiled
            .warnings
            .iter()
            .map(|warning| warning.to_warning(code))
            .collect();
        if !warnings.is_empty() {
            self.sink.warn(&filename, &warnings);
        }

        let dependencies: IndexSet<String> = preprocessed
            .dependencies
            .iter()
            .map(|dependency| relative_url(&self.project_root, dependency))
            .collect();

        Ok(CompiledUnit {
            meta: ArtifactMeta::current(),
            filename,
            js: compiled.js,
            css: compiled.css,
            dependencies: dependencies.into_iter().collect(),
            optimized: optimize,
        })
    }

    /// Materialize one face of `unit`. Pure.
    pub fn split(&self, unit: &CompiledUnit, request: OutputRequest) -> OutputArtifact {
        split(unit, request)
    }

    /// Produce (or reuse) the unit for this source version, then split it.
    pub async fn transform(
        &self,
        path: &Path,
        source: &str,
        request: OutputRequest,
        optimize: bool,
    ) -> Result<OutputArtifact> {
        let filename = self.canonical_name(path);
        let unit = self
            .cache
            .get_or_produce(&filename, source, optimize, || {
                self.produce(source, path, optimize)
            })
            .await?;

        debug!("[fob-svelte] importing {} : {}", request, filename);
        Ok(split(&unit, request))
    }

    /// Split from the stored unit only. Fails with an internal error when
    /// the file was never compiled.
    pub fn materialize(&self, path: &Path, request: OutputRequest) -> Result<OutputArtifact> {
        let filename = self.canonical_name(path);
        let unit = self
            .cache
            .get(&filename)
            .ok_or_else(|| SvelteError::missing_program(self.absolute(path)))?;

        debug!("[fob-svelte] importing {} : {}", request, filename);
        Ok(split(&unit, request))
    }

    /// Parse the `type` discriminator of an import query for `path`.
    pub fn output_request(&self, path: &Path, query: Option<&str>) -> Result<OutputRequest> {
        OutputRequest::from_query(query).map_err(|e| SvelteError::UnknownOutputType {
            path: self.absolute(path),
            value: e.0,
        })
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

fn diagnostic(error: ToolError, file_path: &Path, source: &str) -> Box<PluginDiagnostic> {
    Box::new(PluginDiagnostic::from_tool_error(error, file_path, Some(source)))
}
