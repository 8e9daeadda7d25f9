//! Component declarations and inheritance metadata
//!
//! A component declaration lives under `components.terraform.<name>` or
//! `components.helmfile.<name>` in a stack document. Its optional
//! `metadata` block controls how the declaration is validated:
//!
//! - `type: abstract` exempts it from on-disk existence checks
//! - `component: <path>` names the physical component when it differs
//!   from the declared key
//! - `inherits` lists the components it inherits from

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ComponentError {
    #[error("Unknown component type: '{0}' (expected terraform or helmfile)")]
    UnknownType(String),
}

/// The kind of infrastructure module a component refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Terraform,
    Helmfile,
}

impl ComponentType {
    /// All component types, in catalog order
    pub const ALL: [ComponentType; 2] = [ComponentType::Terraform, ComponentType::Helmfile];

    /// The key used under `components:` in stack documents
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Terraform => "terraform",
            ComponentType::Helmfile => "helmfile",
        }
    }

    /// Files whose presence marks a directory as a component of this type
    pub fn marker_files(&self) -> &'static [&'static str] {
        match self {
            ComponentType::Terraform => &["main.tf", "variables.tf", "outputs.tf"],
            ComponentType::Helmfile => &["helmfile.yaml"],
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terraform" => Ok(ComponentType::Terraform),
            "helmfile" => Ok(ComponentType::Helmfile),
            _ => Err(ComponentError::UnknownType(s.to_string())),
        }
    }
}

/// Whether a declaration is a real deployable component or a base for inheritance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    #[default]
    Real,
    Abstract,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Real => "real",
            ComponentKind::Abstract => "abstract",
        }
    }
}

/// Parsed `metadata` block of a component declaration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ComponentMetadata {
    /// `metadata.type`, defaults to real
    pub kind: ComponentKind,

    /// `metadata.inherits`, in declaration order
    pub inherits: Vec<String>,

    /// `metadata.component`, the physical component path
    pub component_override: Option<String>,
}

impl ComponentMetadata {
    /// Extracts metadata from a component's YAML node.
    ///
    /// Anything other than a mapping yields the defaults. `inherits` accepts
    /// either a single scalar or a sequence; non-scalar items are skipped.
    pub fn extract(component: &Value) -> Self {
        let Some(metadata @ Value::Mapping(_)) = component.get("metadata") else {
            return Self::default();
        };

        let kind = match metadata.get("type").and_then(scalar_text).as_deref() {
            Some("abstract") => ComponentKind::Abstract,
            _ => ComponentKind::Real,
        };

        let inherits = match metadata.get("inherits") {
            Some(Value::Sequence(items)) => items.iter().filter_map(scalar_text).collect(),
            Some(value) => scalar_text(value).into_iter().collect(),
            None => Vec::new(),
        };

        let component_override = metadata
            .get("component")
            .and_then(scalar_text)
            .filter(|s| !s.trim().is_empty());

        Self {
            kind,
            inherits,
            component_override,
        }
    }

    /// Returns true if the declaration is exempt from existence checks
    pub fn is_abstract(&self) -> bool {
        self.kind == ComponentKind::Abstract
    }
}

/// Returns the text of a scalar node, or None for mappings, sequences and null
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// A component declared in a stack document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDeclaration {
    /// Declared key under `components.<type>`
    pub name: String,

    pub component_type: ComponentType,

    pub metadata: ComponentMetadata,

    /// Key frames from the document root down to this declaration
    pub key_path: Vec<String>,
}

impl ComponentDeclaration {
    pub fn new(name: impl Into<String>, component_type: ComponentType, node: &Value) -> Self {
        let name = name.into();
        let key_path = vec![
            "components".to_string(),
            component_type.as_str().to_string(),
            name.clone(),
        ];

        Self {
            name,
            component_type,
            metadata: ComponentMetadata::extract(node),
            key_path,
        }
    }

    /// The catalog lookup key: the metadata override if present, else the declared name
    pub fn lookup_key(&self) -> &str {
        self.metadata
            .component_override
            .as_deref()
            .unwrap_or(&self.name)
    }

    /// Returns true if existence validation applies to this declaration
    pub fn requires_existence(&self) -> bool {
        !self.metadata.is_abstract()
    }
}
