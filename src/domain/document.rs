//! Parsed stack documents
//!
//! A stack document is parsed once, top-down, into an immutable [`StackFile`]
//! holding only what the resolution engine needs: the import list and the
//! component declarations. No node keeps a reference to its parent; each
//! declaration records its key frames instead.

use serde::Serialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::component::{scalar_text, ComponentDeclaration, ComponentType};
use super::import::ImportEdge;

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("Malformed stack document: {0}")]
    Malformed(String),
}

/// Parses YAML text into a generic node tree.
///
/// An empty document parses to `Value::Null`.
pub fn parse_value(content: &str) -> Result<Value, DocumentError> {
    serde_yaml::from_str(content).map_err(|e| DocumentError::Malformed(e.to_string()))
}

/// Extracts the top-level `import` list from a parsed document.
///
/// Accepts a sequence of strings or a single string. Non-string items and
/// any other shape are ignored.
pub fn imports_of(document: &Value) -> Vec<String> {
    match document.get("import") {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Parses only far enough to read the import list
pub fn parse_imports(content: &str) -> Result<Vec<String>, DocumentError> {
    parse_value(content).map(|doc| imports_of(&doc))
}

/// Extracts `components.terraform.*` and `components.helmfile.*` declarations
pub fn components_of(document: &Value) -> Vec<ComponentDeclaration> {
    let Some(components) = document.get("components") else {
        return Vec::new();
    };

    let mut declarations = Vec::new();
    for component_type in ComponentType::ALL {
        let Some(Value::Mapping(entries)) = components.get(component_type.as_str()) else {
            continue;
        };

        for (key, node) in entries {
            if let Some(name) = scalar_text(key) {
                declarations.push(ComponentDeclaration::new(name, component_type, node));
            }
        }
    }
    declarations
}

/// A read-only view of one stack document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackFile {
    /// Absolute path of the document
    pub path: PathBuf,

    /// Path relative to the stacks root, when the file lives under it
    pub relative_path: Option<PathBuf>,

    /// Raw import strings in document order
    pub imports: Vec<String>,

    pub components: Vec<ComponentDeclaration>,
}

impl StackFile {
    /// Parses a stack document's content
    pub fn parse(
        path: impl Into<PathBuf>,
        stacks_root: Option<&Path>,
        content: &str,
    ) -> Result<Self, DocumentError> {
        let path = path.into();
        let document = parse_value(content)?;

        let relative_path = stacks_root
            .and_then(|root| path.strip_prefix(root).ok())
            .map(Path::to_path_buf);

        Ok(Self {
            relative_path,
            imports: imports_of(&document),
            components: components_of(&document),
            path,
        })
    }

    /// Import edges leaving this file, in document order
    pub fn edges(&self) -> impl Iterator<Item = ImportEdge> + '_ {
        self.imports
            .iter()
            .map(|reference| ImportEdge::new(self.path.clone(), reference.clone()))
    }
}
