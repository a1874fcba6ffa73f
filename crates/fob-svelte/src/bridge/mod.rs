//! Node.js bridge to the Svelte toolchain
//!
//! The compiler, the preprocessor and the hot-reload transform are JavaScript
//! packages installed in the user's project. [`NodeBridge`] drives them by
//! running a small ES module driver under `node`, one process per call,
//! exchanging a single JSON request and reply over stdin/stdout.
//!
//! Packages are resolved from the project root, so the versions the project
//! pins are the ones that run. When `svelte-preprocess` is not installed the
//! preprocess call returns the source unchanged.

mod error;

pub use error::BridgeError;

use crate::compile::{CompileOptions, CompileOutput, Compiler};
use crate::diagnostic::ToolError;
use crate::hot::{HotReloadRequest, HotReloadWrapper};
use crate::preprocess::{PreprocessOutput, Preprocessor};
use crate::sourcemap::RawSourceMap;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::trace;

/// Maximum allowed size for a bridge reply (50 MB)
const MAX_OUTPUT_SIZE: usize = 50 * 1024 * 1024;

/// Default timeout for one bridge call (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default Node.js executable
pub const DEFAULT_NODE_BINARY: &str = "node";

const DRIVER: &str = include_str!("driver.mjs");

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum BridgeRequest<'a> {
    Preprocess {
        root: &'a Path,
        source: &'a str,
        filename: &'a Path,
    },
    Compile {
        root: &'a Path,
        source: &'a str,
        options: &'a CompileOptions,
    },
    Hot {
        root: &'a Path,
        request: &'a HotReloadRequest<'a>,
    },
}

#[derive(Debug, Deserialize)]
struct BridgeReply<T> {
    ok: bool,
    value: Option<T>,
    error: Option<ToolError>,
}

impl<T> BridgeReply<T> {
    fn into_result(self) -> Result<T, ToolError> {
        match (self.ok, self.value, self.error) {
            (true, Some(value), _) => Ok(value),
            (false, _, Some(error)) => Err(error),
            (true, None, _) => Err(ToolError::new("bridge reply is missing a value")),
            (false, _, None) => Err(ToolError::new("bridge reported an unknown error")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PreprocessReply {
    code: String,
    #[serde(default)]
    map: Option<RawSourceMap>,
    #[serde(default)]
    dependencies: Vec<PathBuf>,
}

/// Runs the Svelte toolchain through a `node` subprocess.
///
/// Implements [`Preprocessor`], [`Compiler`] and [`HotReloadWrapper`].
#[derive(Debug, Clone)]
pub struct NodeBridge {
    /// Project root, used as working directory and package resolution base
    project_root: PathBuf,

    /// Node.js executable name or path
    node_binary: String,

    /// Timeout for one call in seconds
    timeout_secs: u64,
}

impl NodeBridge {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            node_binary: DEFAULT_NODE_BINARY.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Use a specific Node.js executable
    pub fn with_node_binary(mut self, node_binary: impl Into<String>) -> Self {
        self.node_binary = node_binary.into();
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Check that the Node.js binary is available on the system
    pub async fn validate_binary(&self) -> Result<(), BridgeError> {
        #[cfg(unix)]
        let check_cmd = "which";
        #[cfg(windows)]
        let check_cmd = "where";

        let status = Command::new(check_cmd)
            .arg(&self.node_binary)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(BridgeError::spawn_failed)?;

        if !status.success() {
            return Err(BridgeError::NodeNotFound {
                binary: self.node_binary.clone(),
            });
        }

        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: &BridgeRequest<'_>,
    ) -> Result<BridgeReply<T>, BridgeError> {
        let payload = serde_json::to_vec(request).map_err(BridgeError::invalid_reply)?;

        let mut cmd = Command::new(&self.node_binary);
        cmd.arg("--input-type=module")
            .arg("-e")
            .arg(DRIVER)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .current_dir(&self.project_root)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(BridgeError::spawn_failed)?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            BridgeError::spawn_failed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Failed to capture stdin",
            ))
        })?;
        stdin
            .write_all(&payload)
            .await
            .map_err(BridgeError::spawn_failed)?;
        drop(stdin);

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| BridgeError::timeout(self.timeout_secs))?
        .map_err(BridgeError::spawn_failed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            return Err(BridgeError::exit_error(exit_code, stderr));
        }

        if output.stdout.len() > MAX_OUTPUT_SIZE {
            return Err(BridgeError::output_too_large(
                output.stdout.len(),
                MAX_OUTPUT_SIZE,
            ));
        }

        trace!(bytes = output.stdout.len(), "[fob-svelte] bridge reply received");
        serde_json::from_slice(&output.stdout).map_err(BridgeError::invalid_reply)
    }

    async fn invoke<T: DeserializeOwned>(&self, request: BridgeRequest<'_>) -> Result<T, ToolError> {
        self.call::<T>(&request).await?.into_result()
    }
}

#[async_trait]
impl Preprocessor for NodeBridge {
    async fn preprocess(&self, source: &str, filename: &Path) -> Result<PreprocessOutput, ToolError> {
        trace!(file = %filename.display(), "[fob-svelte] bridge preprocess");
        let reply: PreprocessReply = self
            .invoke(BridgeRequest::Preprocess {
                root: &self.project_root,
                source,
                filename,
            })
            .await?;

        let map = reply
            .map
            .map(RawSourceMap::into_mapping)
            .transpose()
            .map_err(|e| ToolError::new(format!("invalid preprocess source map: {}", e)))?;

        Ok(PreprocessOutput {
            code: reply.code,
            map,
            dependencies: reply.dependencies,
        })
    }
}

#[async_trait]
impl Compiler for NodeBridge {
    async fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompileOutput, ToolError> {
        trace!(file = %options.filename, dev = options.dev, "[fob-svelte] bridge compile");
        self.invoke(BridgeRequest::Compile {
            root: &self.project_root,
            source,
            options,
        })
        .await
    }
}

#[async_trait]
impl HotReloadWrapper for NodeBridge {
    async fn wrap(&self, request: &HotReloadRequest<'_>) -> Result<String, ToolError> {
        trace!(id = request.id, "[fob-svelte] bridge hot wrap");
        self.invoke(BridgeRequest::Hot {
            root: &self.project_root,
            request,
        })
        .await
    }
}
