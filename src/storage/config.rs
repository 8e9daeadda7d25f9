//! Atmos configuration handling
//!
//! Configuration is read from `atmos.yaml` (or `atmos.yml`) at the project
//! root. Only the keys that drive path resolution are modelled; everything
//! else in the file is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use thiserror::Error;

use crate::domain::ComponentType;

/// Configuration file names, in lookup order
pub const CONFIG_FILE_NAMES: [&str; 2] = ["atmos.yaml", "atmos.yml"];

const DEFAULT_STACKS_BASE_PATH: &str = "stacks";
const DEFAULT_TERRAFORM_BASE_PATH: &str = "components/terraform";
const DEFAULT_HELMFILE_BASE_PATH: &str = "components/helmfile";
const DEFAULT_WORKFLOWS_BASE_PATH: &str = "stacks/workflows";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Deserializes an optional value, treating null and wrongly typed values
/// as absent so one bad key does not discard the rest of the file
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match serde_yaml::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(error) => {
            tracing::warn!(%error, "ignoring invalid atmos configuration value, using its default");
            Ok(None)
        }
    }
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient(deserializer).map(Option::unwrap_or_default)
}

/// Stack discovery and naming settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawStacksConfig")]
pub struct StacksConfig {
    /// Stacks directory, relative to the project base path
    pub base_path: String,

    /// Globs a stack file must match (relative to the stacks directory)
    pub included_paths: Vec<String>,

    /// Globs that exclude otherwise included files
    pub excluded_paths: Vec<String>,

    /// Naming pattern, e.g. `{tenant}-{environment}-{stage}`
    pub name_pattern: Option<String>,
}

impl Default for StacksConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_STACKS_BASE_PATH.to_string(),
            included_paths: vec!["**/*".to_string()],
            excluded_paths: vec![],
            name_pattern: None,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawStacksConfig {
    #[serde(deserialize_with = "lenient")]
    base_path: Option<String>,
    #[serde(deserialize_with = "lenient")]
    included_paths: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    excluded_paths: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient")]
    name_pattern: Option<String>,
}

impl From<RawStacksConfig> for StacksConfig {
    fn from(raw: RawStacksConfig) -> Self {
        let defaults = Self::default();
        Self {
            base_path: raw.base_path.unwrap_or(defaults.base_path),
            included_paths: raw.included_paths.unwrap_or(defaults.included_paths),
            excluded_paths: raw.excluded_paths.unwrap_or(defaults.excluded_paths),
            name_pattern: raw.name_pattern,
        }
    }
}

/// Base path settings for one component type
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ComponentTypeConfig {
    #[serde(deserialize_with = "lenient")]
    pub base_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ComponentsConfig {
    #[serde(deserialize_with = "lenient_or_default")]
    pub terraform: ComponentTypeConfig,
    #[serde(deserialize_with = "lenient_or_default")]
    pub helmfile: ComponentTypeConfig,
}

impl ComponentsConfig {
    /// Components directory for a type, relative to the project base path
    pub fn base_path(&self, component_type: ComponentType) -> &str {
        match component_type {
            ComponentType::Terraform => self
                .terraform
                .base_path
                .as_deref()
                .unwrap_or(DEFAULT_TERRAFORM_BASE_PATH),
            ComponentType::Helmfile => self
                .helmfile
                .base_path
                .as_deref()
                .unwrap_or(DEFAULT_HELMFILE_BASE_PATH),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawWorkflowsConfig")]
pub struct WorkflowsConfig {
    pub base_path: String,
}

impl Default for WorkflowsConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_WORKFLOWS_BASE_PATH.to_string(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawWorkflowsConfig {
    #[serde(deserialize_with = "lenient")]
    base_path: Option<String>,
}

impl From<RawWorkflowsConfig> for WorkflowsConfig {
    fn from(raw: RawWorkflowsConfig) -> Self {
        raw.base_path
            .map(|base_path| Self { base_path })
            .unwrap_or_default()
    }
}

/// The parsed `atmos.yaml`.
///
/// Each key falls back to its default on its own when missing, null or of
/// the wrong type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AtmosConfig {
    /// Base path all other paths are relative to (relative to the project root)
    #[serde(deserialize_with = "lenient_or_default")]
    pub base_path: String,

    #[serde(deserialize_with = "lenient_or_default")]
    pub stacks: StacksConfig,

    #[serde(deserialize_with = "lenient_or_default")]
    pub components: ComponentsConfig,

    #[serde(deserialize_with = "lenient_or_default")]
    pub workflows: WorkflowsConfig,
}

impl AtmosConfig {
    /// Parses configuration text. An empty document yields the defaults; only
    /// invalid YAML or a non-mapping document is an error.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if value.is_null() {
            return Ok(Self::default());
        }

        serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Finds the configuration file in `dir`, preferring `atmos.yaml`
    pub fn find_in(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Finds the project root by walking up from `start` looking for a configuration file
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| Self::find_in(dir).is_some())
            .map(Path::to_path_buf)
    }
}
