//! Modification-stamp gated cache of the parsed configuration
//!
//! The cache holds one immutable [`ConfigSnapshot`]. Every read stats the
//! configuration file; when its modification time changed the file is read
//! again and its blake3 hash compared against the snapshot's. Only when the
//! content actually changed is it re-parsed. The new snapshot replaces the
//! old one under a write lock, so readers see either the old or the new
//! snapshot, never a partial one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::SystemTime;

use super::config::AtmosConfig;

/// A parsed configuration together with the file state it was built from
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: AtmosConfig,

    /// Configuration file the snapshot was read from, if any
    pub source: Option<PathBuf>,

    /// Parse failure, when the file existed but could not be parsed
    pub error: Option<String>,

    modified: Option<SystemTime>,
    hash: Option<blake3::Hash>,
}

impl ConfigSnapshot {
    fn defaults() -> Self {
        Self {
            config: AtmosConfig::default(),
            source: None,
            error: None,
            modified: None,
            hash: None,
        }
    }

    fn is_current(&self, source: Option<&Path>, modified: Option<SystemTime>) -> bool {
        self.source.as_deref() == source && self.modified == modified && modified.is_some()
    }
}

/// Shared, lazily refreshed configuration for one project root
#[derive(Debug)]
pub struct ConfigCache {
    root: PathBuf,
    current: RwLock<Option<Arc<ConfigSnapshot>>>,
}

impl ConfigCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: RwLock::new(None),
        }
    }

    /// Returns the current snapshot, reloading it if the file changed
    pub fn get(&self) -> Arc<ConfigSnapshot> {
        let source = AtmosConfig::find_in(&self.root);
        let modified = source
            .as_deref()
            .and_then(|path| fs::metadata(path).and_then(|m| m.modified()).ok());

        let previous = self.read_current();
        if let Some(snapshot) = &previous {
            if snapshot.is_current(source.as_deref(), modified) {
                return Arc::clone(snapshot);
            }
        }

        let snapshot = Arc::new(self.load(source, modified, previous.as_deref()));
        self.swap(Arc::clone(&snapshot));
        snapshot
    }

    /// Drops the snapshot so the next read reloads unconditionally
    pub fn invalidate(&self) {
        *self.write_guard() = None;
    }

    fn read_current(&self) -> Option<Arc<ConfigSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Option<Arc<ConfigSnapshot>>> {
        match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn swap(&self, snapshot: Arc<ConfigSnapshot>) {
        *self.write_guard() = Some(snapshot);
    }

    fn load(
        &self,
        source: Option<PathBuf>,
        modified: Option<SystemTime>,
        previous: Option<&ConfigSnapshot>,
    ) -> ConfigSnapshot {
        let Some(path) = source else {
            tracing::debug!(root = %self.root.display(), "no atmos configuration file, using defaults");
            return ConfigSnapshot::defaults();
        };

        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read atmos configuration");
                return ConfigSnapshot {
                    error: Some(e.to_string()),
                    source: Some(path),
                    ..ConfigSnapshot::defaults()
                };
            }
        };

        let hash = blake3::hash(&content);
        if let Some(previous) = previous {
            if previous.source.as_deref() == Some(path.as_path()) && previous.hash == Some(hash) {
                tracing::debug!(path = %path.display(), "configuration touched but unchanged");
                return ConfigSnapshot {
                    modified,
                    ..previous.clone()
                };
            }
        }

        tracing::debug!(path = %path.display(), "loading atmos configuration");
        let parsed = String::from_utf8(content)
            .map_err(|e| e.to_string())
            .and_then(|text| AtmosConfig::from_yaml(&text).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => ConfigSnapshot {
                config,
                source: Some(path),
                error: None,
                modified,
                hash: Some(hash),
            },
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "failed to parse atmos configuration, using defaults");
                ConfigSnapshot {
                    config: AtmosConfig::default(),
                    source: Some(path),
                    error: Some(error),
                    modified,
                    hash: Some(hash),
                }
            }
        }
    }
}
