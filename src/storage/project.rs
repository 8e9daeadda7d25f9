//! Project management
//!
//! A project is a directory tree rooted at the directory holding
//! `atmos.yaml`. It owns the configuration cache and hands out immutable
//! [`Settings`] snapshots to resolution entry points.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::AtmosConfig;
use super::config_cache::{ConfigCache, ConfigSnapshot};
use super::settings::{normalize_path, Settings};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not an atmos project: no atmos.yaml found in {0} or any parent directory")]
    NotAtmosProject(PathBuf),

    #[error("Project root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Makes a path absolute against the current directory and normalizes it
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;
    Ok(normalize_path(&absolute))
}

/// An atmos project
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    cache: ConfigCache,
}

impl Project {
    /// Opens the project rooted at the given directory.
    ///
    /// A missing `atmos.yaml` is allowed; every setting then has its default.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = absolute_path(root.as_ref())?;
        if !root.is_dir() {
            return Err(ProjectError::NotADirectory(root).into());
        }

        tracing::debug!(root = %root.display(), "opened project");
        Ok(Self {
            cache: ConfigCache::new(&root),
            root,
        })
    }

    /// Opens the project containing `start`, looking for `atmos.yaml` in it
    /// and its parents
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = absolute_path(start.as_ref())?;
        let root = AtmosConfig::find_project_root(&start)
            .ok_or_else(|| ProjectError::NotAtmosProject(start.clone()))?;
        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the current configuration snapshot
    pub fn config_snapshot(&self) -> Arc<ConfigSnapshot> {
        self.cache.get()
    }

    /// Forces the configuration to be re-read on next access
    pub fn invalidate_config(&self) {
        self.cache.invalidate();
    }

    /// Settings built from the current configuration
    pub fn settings(&self) -> Result<Settings> {
        let snapshot = self.config_snapshot();
        let source = snapshot
            .source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "default configuration".to_string());

        Settings::from_config(&self.root, &snapshot.config)
            .with_context(|| format!("Invalid stack path patterns in {}", source))
    }

    /// Checks if a path is inside this project
    pub fn contains(&self, path: &Path) -> bool {
        normalize_path(path).starts_with(&self.root)
    }

    /// Returns a relative path from the project root
    pub fn relative_path(&self, path: &Path) -> Option<PathBuf> {
        normalize_path(path)
            .strip_prefix(&self.root)
            .ok()
            .map(|p| p.to_path_buf())
    }

    /// Path for display: relative to the root when inside the project
    pub fn display_path(&self, path: &Path) -> String {
        self.relative_path(path)
            .unwrap_or_else(|| path.to_path_buf())
            .display()
            .to_string()
    }
}
