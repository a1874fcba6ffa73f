//! Per-file store of compiled units
//!
//! One slot per canonical path. A slot belongs to one version of the source,
//! identified by a BLAKE3 fingerprint of the text and the optimize flag, and
//! holds an async once-cell so concurrent requests for the entry, script and
//! style faces of that version share a single compile.
//!
//! A unit also depends on the files its preprocessor read. Their contents are
//! fingerprinted when the unit is stored and re-checked before every reuse,
//! so editing an imported partial recompiles the component.

use crate::error::{Result, SvelteError};
use crate::paths::resolve_relative;
use crate::unit::CompiledUnit;
use dashmap::DashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// Content fingerprint of one preprocess dependency. `None` when the file
/// could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DependencyStamp {
    path: PathBuf,
    hash: Option<blake3::Hash>,
}

impl DependencyStamp {
    async fn read(path: PathBuf) -> Self {
        let hash = tokio::fs::read(&path).await.ok().map(|bytes| blake3::hash(&bytes));
        Self { path, hash }
    }

    async fn is_current(&self) -> bool {
        Self::read(self.path.clone()).await.hash == self.hash
    }
}

#[derive(Debug)]
struct StoredUnit {
    unit: Arc<CompiledUnit>,
    stamps: Vec<DependencyStamp>,
}

#[derive(Debug)]
struct Slot {
    fingerprint: blake3::Hash,
    stored: OnceCell<StoredUnit>,
}

impl Slot {
    fn empty(fingerprint: blake3::Hash) -> Self {
        Self {
            fingerprint,
            stored: OnceCell::new(),
        }
    }

    fn unit(&self) -> Option<&Arc<CompiledUnit>> {
        self.stored.get().map(|stored| &stored.unit)
    }

    fn is_stale(&self, fingerprint: &blake3::Hash) -> bool {
        self.fingerprint != *fingerprint || self.unit().is_some_and(|unit| !unit.is_reusable())
    }
}

/// Fingerprint of one source version.
pub fn fingerprint(source: &str, optimize: bool) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[optimize as u8]);
    hasher.update(source.as_bytes());
    hasher.finalize()
}

/// Thread-safe unit store.
#[derive(Debug, Default)]
pub struct UnitCache {
    /// Base for the root-relative dependency paths recorded on units
    project_root: PathBuf,
    slots: DashMap<String, Arc<Slot>>,
}

impl UnitCache {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            slots: DashMap::new(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Return the unit for this source version, running `produce` at most
    /// once across concurrent callers. A failed produce caches nothing.
    ///
    /// A stored unit whose preprocess dependencies changed on disk is
    /// discarded and produced again.
    pub async fn get_or_produce<F, Fut>(
        &self,
        filename: &str,
        source: &str,
        optimize: bool,
        produce: F,
    ) -> Result<Arc<CompiledUnit>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CompiledUnit>>,
    {
        let mut slot = self.slot(filename, fingerprint(source, optimize));

        if let Some(stored) = slot.stored.get() {
            if self.dependencies_unchanged(stored).await {
                debug!(file = filename, "[fob-svelte] reusing compiled unit");
                return Ok(Arc::clone(&stored.unit));
            }
            debug!(file = filename, "[fob-svelte] dependency changed, discarding unit");
            slot = self.replace(filename, &slot);
        }

        let stored = slot
            .stored
            .get_or_try_init(|| async {
                let unit = produce().await?;
                Ok::<_, SvelteError>(self.stamp(unit).await)
            })
            .await?;
        Ok(Arc::clone(&stored.unit))
    }

    /// The current unit for `filename`, if one was produced and passes the
    /// reuse gate. Dependencies are not re-checked here.
    pub fn get(&self, filename: &str) -> Option<Arc<CompiledUnit>> {
        let slot = self.slots.get(filename)?;
        slot.unit().filter(|unit| unit.is_reusable()).map(Arc::clone)
    }

    /// Store a unit produced elsewhere (e.g. restored from disk) for the
    /// given source version. Its dependencies are fingerprinted as they are
    /// now. Units that fail the reuse gate are ignored on the next lookup
    /// and recompiled.
    pub async fn insert(&self, source: &str, optimize: bool, unit: CompiledUnit) {
        let filename = unit.filename.clone();
        let slot = Slot {
            fingerprint: fingerprint(source, optimize),
            stored: OnceCell::from(self.stamp(unit).await),
        };
        self.slots.insert(filename, Arc::new(slot));
    }

    /// Drop the unit for `filename`.
    pub fn invalidate(&self, filename: &str) -> bool {
        self.slots.remove(filename).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    async fn stamp(&self, unit: CompiledUnit) -> StoredUnit {
        let mut stamps = Vec::with_capacity(unit.dependencies.len());
        for dependency in &unit.dependencies {
            let path = resolve_relative(&self.project_root, dependency);
            stamps.push(DependencyStamp::read(path).await);
        }
        StoredUnit {
            unit: Arc::new(unit),
            stamps,
        }
    }

    async fn dependencies_unchanged(&self, stored: &StoredUnit) -> bool {
        for stamp in &stored.stamps {
            if !stamp.is_current().await {
                return false;
            }
        }
        true
    }

    fn slot(&self, filename: &str, fingerprint: blake3::Hash) -> Arc<Slot> {
        let mut entry = self
            .slots
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(Slot::empty(fingerprint)));

        if entry.is_stale(&fingerprint) {
            debug!(file = filename, "[fob-svelte] source changed, discarding unit");
            *entry = Arc::new(Slot::empty(fingerprint));
        }

        Arc::clone(entry.value())
    }

    /// Swap `stale` for an empty slot of the same version. Callers racing on
    /// the same stale slot all end up sharing the replacement.
    fn replace(&self, filename: &str, stale: &Arc<Slot>) -> Arc<Slot> {
        let mut entry = self
            .slots
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(Slot::empty(stale.fingerprint)));

        if Arc::ptr_eq(entry.value(), stale) {
            *entry = Arc::new(Slot::empty(stale.fingerprint));
        }

        Arc::clone(entry.value())
    }
}
