//! Import references and their classification
//!
//! An import string is one of:
//! - remote (`git://`, `https://`, `http://`, `s3://`), never resolved locally
//! - relative (starts with `.` or `/`), resolved against the importing file's directory
//! - base-relative (anything else), resolved against the stacks root

use serde::Serialize;
use std::path::{Path, PathBuf};

/// URI schemes that mark an import as remote
pub const REMOTE_SCHEMES: [&str; 4] = ["git://", "https://", "http://", "s3://"];

/// Extensions tried, in order, when the exact import path does not exist.
///
/// The order is the tie-break when several candidates exist.
pub const STACK_EXTENSIONS: [&str; 4] = [".yaml", ".yml", ".yaml.tmpl", ".yml.tmpl"];

/// Suffixes stripped from stack file names, longest first
pub const STACK_SUFFIXES: [&str; 4] = [".yaml.tmpl", ".yml.tmpl", ".yaml", ".yml"];

/// How an import reference should be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Empty or whitespace-only, skipped
    Blank,
    Remote,
    Relative,
    BaseRelative,
}

impl ImportKind {
    pub fn classify(reference: &str) -> Self {
        if reference.trim().is_empty() {
            ImportKind::Blank
        } else if is_remote(reference) {
            ImportKind::Remote
        } else if reference.starts_with('.') || reference.starts_with('/') {
            ImportKind::Relative
        } else {
            ImportKind::BaseRelative
        }
    }
}

/// Returns true if the reference uses a remote URI scheme
pub fn is_remote(reference: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| reference.starts_with(scheme))
}

/// Strips one recognized stack suffix from a name, if present
pub fn strip_stack_suffix(name: &str) -> &str {
    STACK_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .unwrap_or(name)
}

/// Returns true if the file name carries a recognized stack suffix
pub fn has_stack_suffix(name: &str) -> bool {
    STACK_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// A not-yet-resolved reference from one stack file to a path string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportEdge {
    pub from: PathBuf,
    pub reference: String,
}

impl ImportEdge {
    pub fn new(from: impl Into<PathBuf>, reference: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            reference: reference.into(),
        }
    }

    pub fn kind(&self) -> ImportKind {
        ImportKind::classify(&self.reference)
    }
}

/// Result of resolving an import reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolvedImport {
    Local { path: PathBuf },
    Remote { uri: String },
    Unresolved,
}

impl ResolvedImport {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        ResolvedImport::Local { path: path.into() }
    }

    /// Returns the resolved file, if local
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedImport::Local { path } => Some(path),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ResolvedImport::Unresolved)
    }
}
