//! On-disk component catalog
//!
//! A directory under a components base directory is a component when it
//! holds one of its type's marker files (`main.tf`, `variables.tf`,
//! `outputs.tf` for terraform, `helmfile.yaml` for helmfile). Components can
//! nest, so listing descends into every directory, matched or not.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::domain::ComponentType;

use super::settings::{normalize_path, Settings};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read component directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CatalogError + '_ {
    move |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One component directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentCatalogEntry {
    /// Path under the components base directory, `/`-separated
    pub relative_path: String,
    pub component_type: ComponentType,
    pub exists: bool,

    /// Regular files directly in the directory, sorted
    pub files: Vec<String>,
}

/// Metadata for `path`, or None when it does not exist.
///
/// Not-found style failures are `None`; any other I/O failure is an error.
fn stat(path: &Path) -> Result<Option<fs::Metadata>, CatalogError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidInput
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(io_error(path)(e)),
    }
}

/// Returns true if `dir` holds a marker file for `component_type`
fn has_marker(dir: &Path, component_type: ComponentType) -> Result<bool, CatalogError> {
    for marker in component_type.marker_files() {
        if stat(&dir.join(marker))?.is_some_and(|meta| meta.is_file()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Returns true if `relative_path` under `base_dir` is a component of the given type
pub fn exists(base_dir: &Path, relative_path: &str, component_type: ComponentType) -> Result<bool, CatalogError> {
    let relative_path = relative_path.trim_matches('/');
    if relative_path.is_empty() {
        return Ok(false);
    }
    has_marker(&normalize_path(&base_dir.join(relative_path)), component_type)
}

/// Lists every component under `base_dir`, sorted by relative path.
///
/// A missing base directory is an empty catalog. Hidden directories (such
/// as `.terraform`) are skipped and symlinked directories are not followed.
pub fn list_components(base_dir: &Path, component_type: ComponentType) -> Result<Vec<ComponentCatalogEntry>, CatalogError> {
    let mut entries = Vec::new();
    collect(base_dir, base_dir, component_type, &mut entries)?;
    entries.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(entries)
}

fn collect(
    base_dir: &Path,
    dir: &Path,
    component_type: ComponentType,
    out: &mut Vec<ComponentCatalogEntry>,
) -> Result<(), CatalogError> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(io_error(dir)(e)),
    };

    for entry in read {
        let entry = entry.map_err(io_error(dir))?;
        let file_type = entry.file_type().map_err(io_error(dir))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !file_type.is_dir() || name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        if has_marker(&path, component_type)? {
            if let Some(relative) = relative_to(base_dir, &path) {
                out.push(ComponentCatalogEntry {
                    relative_path: relative,
                    component_type,
                    exists: true,
                    files: child_files(&path)?,
                });
            }
        }

        // nested components live under matched directories too
        collect(base_dir, &path, component_type, out)?;
    }
    Ok(())
}

fn relative_to(base_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn child_files(dir: &Path) -> Result<Vec<String>, CatalogError> {
    let read = match fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(io_error(dir)(e)),
    };

    let mut files = Vec::new();
    for entry in read {
        let entry = entry.map_err(io_error(dir))?;
        if entry.file_type().map_err(io_error(dir))?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

/// Details for one component path, or None when the directory does not exist
pub fn describe(
    base_dir: &Path,
    relative_path: &str,
    component_type: ComponentType,
) -> Result<Option<ComponentCatalogEntry>, CatalogError> {
    let relative_path = relative_path.trim_matches('/');
    let dir = normalize_path(&base_dir.join(relative_path));
    if relative_path.is_empty() || !stat(&dir)?.is_some_and(|meta| meta.is_dir()) {
        return Ok(None);
    }

    Ok(Some(ComponentCatalogEntry {
        relative_path: relative_path.to_string(),
        component_type,
        exists: has_marker(&dir, component_type)?,
        files: child_files(&dir)?,
    }))
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^\s*variable\s+"([^"]+)""#).expect("variable pattern compiles")
    })
}

/// Names declared with `variable "<name>"` in a component's `variables.tf`,
/// in declaration order. A missing file yields no variables.
pub fn variables(dir: &Path) -> Result<Vec<String>, CatalogError> {
    let path = dir.join("variables.tf");
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(io_error(&path)(e)),
    };

    Ok(variable_pattern()
        .captures_iter(&content)
        .map(|caps| caps[1].to_string())
        .collect())
}

/// The component catalog of one project, one base directory per type
#[derive(Debug, Clone, Copy)]
pub struct ComponentCatalog<'a> {
    settings: &'a Settings,
}

impl<'a> ComponentCatalog<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn base_dir(&self, component_type: ComponentType) -> &'a Path {
        self.settings.component_dir(component_type)
    }

    /// Directory a component would live in
    pub fn component_path(&self, relative_path: &str, component_type: ComponentType) -> PathBuf {
        normalize_path(&self.base_dir(component_type).join(relative_path.trim_matches('/')))
    }

    pub fn list(&self, component_type: ComponentType) -> Result<Vec<ComponentCatalogEntry>, CatalogError> {
        list_components(self.base_dir(component_type), component_type)
    }

    /// Components of every type, terraform first
    pub fn list_all(&self) -> Result<Vec<ComponentCatalogEntry>, CatalogError> {
        let mut all = Vec::new();
        for component_type in ComponentType::ALL {
            all.extend(self.list(component_type)?);
        }
        Ok(all)
    }

    pub fn exists(&self, relative_path: &str, component_type: ComponentType) -> Result<bool, CatalogError> {
        exists(self.base_dir(component_type), relative_path, component_type)
    }

    pub fn describe(
        &self,
        relative_path: &str,
        component_type: ComponentType,
    ) -> Result<Option<ComponentCatalogEntry>, CatalogError> {
        describe(self.base_dir(component_type), relative_path, component_type)
    }

    pub fn variables(&self, relative_path: &str, component_type: ComponentType) -> Result<Vec<String>, CatalogError> {
        variables(&self.component_path(relative_path, component_type))
    }
}
