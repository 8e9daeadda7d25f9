//! Scaffolding for missing stack files and components
//!
//! Both operations create missing parent directories and never overwrite an
//! existing file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{has_stack_suffix, ComponentType, ImportKind};

use super::resolver::reference_base;
use super::settings::{normalize_path, Settings};

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    #[error("Cannot scaffold remote import '{0}'")]
    Remote(String),

    #[error("Cannot scaffold an empty reference")]
    Blank,

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

const STACK_TEMPLATE: &str = "vars: {}\n\ncomponents:\n  terraform: {}\n";

/// Where a missing import would be created: resolved like an import, with
/// `.yaml` appended unless the reference already carries a stack suffix
pub fn stack_file_target(settings: &Settings, source: &Path, reference: &str) -> Result<PathBuf, ScaffoldError> {
    match ImportKind::classify(reference) {
        ImportKind::Blank => return Err(ScaffoldError::Blank),
        ImportKind::Remote => return Err(ScaffoldError::Remote(reference.to_string())),
        ImportKind::Relative | ImportKind::BaseRelative => {}
    }

    let source = normalize_path(source);
    let Some((base, path)) = reference_base(&source, reference, &settings.stacks_dir) else {
        return Err(ScaffoldError::Blank);
    };

    let file = if has_stack_suffix(path) {
        path.to_string()
    } else {
        format!("{}.yaml", path)
    };
    Ok(normalize_path(&base.join(file)))
}

/// Creates a new file with `content`, failing if it exists
fn create_new(path: &Path, content: &str) -> Result<(), ScaffoldError> {
    let io_err = |source| ScaffoldError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ScaffoldError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => return Err(io_err(e)),
    };
    file.write_all(content.as_bytes()).map_err(io_err)
}

/// Creates the stack file a missing import refers to, returning its path
pub fn create_stack_file(settings: &Settings, source: &Path, reference: &str) -> Result<PathBuf, ScaffoldError> {
    let target = stack_file_target(settings, source, reference)?;
    create_new(&target, STACK_TEMPLATE)?;
    tracing::info!(path = %target.display(), "created stack file");
    Ok(target)
}

fn component_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn terraform_files(name: &str) -> Vec<(&'static str, String)> {
    vec![
        (
            "main.tf",
            format!("# Component: {}\n\nlocals {{\n  enabled = var.enabled\n}}\n", name),
        ),
        (
            "variables.tf",
            concat!(
                "variable \"region\" {\n",
                "  type        = string\n",
                "  description = \"AWS region\"\n",
                "}\n\n",
                "variable \"enabled\" {\n",
                "  type        = bool\n",
                "  default     = true\n",
                "  description = \"Set to false to prevent the module from creating any resources\"\n",
                "}\n",
            )
            .to_string(),
        ),
        ("outputs.tf", "# Component outputs\n".to_string()),
        (
            "versions.tf",
            concat!(
                "terraform {\n",
                "  required_version = \">= 1.0.0\"\n\n",
                "  required_providers {\n",
                "    aws = {\n",
                "      source  = \"hashicorp/aws\"\n",
                "      version = \">= 4.0\"\n",
                "    }\n",
                "  }\n",
                "}\n",
            )
            .to_string(),
        ),
    ]
}

fn helmfile_files(name: &str) -> Vec<(&'static str, String)> {
    vec![(
        "helmfile.yaml",
        format!("# Component: {}\n\nrepositories: []\n\nreleases: []\n", name),
    )]
}

/// Creates a component directory with scaffold files, returning the files written.
///
/// Fails with [`ScaffoldError::AlreadyExists`] when the directory is already a
/// component of that type. Other existing files are left untouched.
pub fn create_component(
    base_dir: &Path,
    relative_path: &str,
    component_type: ComponentType,
) -> Result<Vec<PathBuf>, ScaffoldError> {
    let relative_path = relative_path.trim_matches('/');
    if relative_path.trim().is_empty() {
        return Err(ScaffoldError::Blank);
    }

    let dir = normalize_path(&base_dir.join(relative_path));
    if let Some(marker) = component_type
        .marker_files()
        .iter()
        .map(|m| dir.join(m))
        .find(|p| p.is_file())
    {
        return Err(ScaffoldError::AlreadyExists(marker));
    }

    let name = component_name(&dir);
    let files = match component_type {
        ComponentType::Terraform => terraform_files(&name),
        ComponentType::Helmfile => helmfile_files(&name),
    };

    let mut written = Vec::new();
    for (file_name, content) in files {
        let path = dir.join(file_name);
        match create_new(&path, &content) {
            Ok(()) => written.push(path),
            Err(ScaffoldError::AlreadyExists(_)) => {
                tracing::debug!(path = %path.display(), "keeping existing file");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(dir = %dir.display(), %component_type, "created component");
    Ok(written)
}
