//! # fob-svelte
//!
//! Svelte component compilation for fob, independent of any bundler.
//!
//! A component goes through three stages:
//!
//! ```text
//! source ─► preprocess ─► compile ─► (hot wrap, dev only) ─► CompiledUnit
//!                                                              │
//!                        App.svelte?type=main  ◄── split ──────┤
//!                        App.svelte?type=js    ◄───────────────┤
//!                        App.svelte?type=css   ◄───────────────┘
//! ```
//!
//! The real work (parsing, code generation, preprocessing, HMR rewriting) is
//! done by the project's own `svelte`, `svelte-preprocess` and `svelte-hmr`
//! packages, reached through [`NodeBridge`]. This crate orchestrates those
//! calls, sanitizes source maps, and splits one compiled unit into the
//! entry, script and style modules a bundler consumes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fob_svelte::{NodeBridge, OutputRequest, SvelteTransformer};
//! use std::path::Path;
//!
//! # async fn example() -> fob_svelte::Result<()> {
//! let transformer = SvelteTransformer::with_bridge(NodeBridge::new("/app"));
//! let path = Path::new("/app/src/App.svelte");
//! let source = "<h1>Hi</h1><style>h1{color:red}</style>";
//!
//! let entry = transformer.transform(path, source, OutputRequest::Entry, true).await?;
//! assert!(entry.code.contains("/src/App.svelte?type=css"));
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cache;
pub mod compile;
pub mod diagnostic;
pub mod error;
pub mod hot;
pub mod paths;
pub mod preprocess;
pub mod sink;
pub mod sourcemap;
pub mod split;
pub mod transformer;
pub mod unit;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use bridge::{BridgeError, NodeBridge};
pub use cache::UnitCache;
pub use compile::{CompileOptions, CompileOutput, CompileWarning, Compiler, GeneratedCode};
pub use diagnostic::{CodeFrame, LineColumn, PluginDiagnostic, ToolError, Warning, PLUGIN_ORIGIN};
pub use error::{Result, SvelteError};
pub use hot::{HotReloadRequest, HotReloadWrapper};
pub use preprocess::{PreprocessOutput, Preprocessor};
pub use sink::{TracingSink, WarningSink};
pub use sourcemap::SourceMapping;
pub use split::{
    virtual_path, BundleBehavior, DependencyKind, OutputArtifact, OutputKind, OutputRequest,
    VirtualDependency,
};
pub use transformer::SvelteTransformer;
pub use unit::{can_reuse, ArtifactMeta, CompiledUnit, FORMAT_VERSION};
