//! Stack name derivation
//!
//! A stack's logical name is derived from its file location under the
//! stacks root:
//!
//! | Relative path | Pattern | Name |
//! |---------------|---------|------|
//! | `orgs/acme/prod.yaml` | none | `orgs-acme-prod` |
//! | `catalog/vpc/defaults.yaml` | none | `catalog/vpc/defaults` |
//! | `prod.yaml` | set | `prod` |
//! | `ue2/prod.yaml` | set | `ue2-prod` |
//! | `acme/ue2/prod.yaml` | set | `acme-ue2-prod` |
//!
//! When a name pattern is configured the segments are combined by position
//! (stage, environment-stage, tenant-environment-stage). The pattern's
//! placeholders are not bound to segments by name.

use serde::Serialize;
use std::path::{Component, Path};

use super::import::strip_stack_suffix;

/// First path segments whose files are reusable fragments, named by full path
const UNFLATTENED_ROOTS: [&str; 2] = ["catalog", "mixins"];

/// Splits a path relative to the stacks root into its normal segments
fn segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Derives the stack name for `file`, or None when it is not under `stacks_root`
pub fn derive_stack_name(file: &Path, stacks_root: &Path, name_pattern: Option<&str>) -> Option<String> {
    let relative = file.strip_prefix(stacks_root).ok()?;
    let parts = segments(relative);
    if parts.is_empty() {
        return None;
    }

    let joined = parts.join("/");
    let stripped = strip_stack_suffix(&joined);

    match name_pattern {
        None => Some(name_from_path(stripped)),
        Some(_) => name_from_segments(stripped),
    }
}

fn name_from_path(relative: &str) -> String {
    let first = relative.split('/').next().unwrap_or_default();
    if UNFLATTENED_ROOTS.contains(&first) {
        relative.to_string()
    } else {
        relative.replace('/', "-")
    }
}

fn name_from_segments(relative: &str) -> Option<String> {
    let parts: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();

    match parts.as_slice() {
        [] => None,
        [stage] => Some(stage.to_string()),
        [environment, stage] => Some(format!("{}-{}", environment, stage)),
        [tenant, environment, stage] => Some(format!("{}-{}-{}", tenant, environment, stage)),
        _ => Some(parts.join("-")),
    }
}

/// Tenant, environment and stage recovered from a stack name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackMetadata {
    pub tenant: Option<String>,
    pub environment: Option<String>,
    pub stage: String,
}

impl StackMetadata {
    /// Splits a dash-joined stack name.
    ///
    /// With more than three parts, every part before the last two forms the tenant.
    pub fn from_stack_name(stack_name: &str) -> Self {
        let parts: Vec<&str> = stack_name.split('-').collect();

        match parts.as_slice() {
            [stage] => Self {
                tenant: None,
                environment: None,
                stage: stage.to_string(),
            },
            [environment, stage] => Self {
                tenant: None,
                environment: Some(environment.to_string()),
                stage: stage.to_string(),
            },
            [tenant, environment, stage] => Self {
                tenant: Some(tenant.to_string()),
                environment: Some(environment.to_string()),
                stage: stage.to_string(),
            },
            _ => {
                let n = parts.len();
                Self {
                    tenant: Some(parts[..n - 2].join("-")),
                    environment: Some(parts[n - 2].to_string()),
                    stage: parts[n - 1].to_string(),
                }
            }
        }
    }

    pub fn full_name(&self) -> String {
        [self.tenant.as_deref(), self.environment.as_deref(), Some(self.stage.as_str())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn display_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(tenant) = &self.tenant {
            parts.push(format!("Tenant: {}", tenant));
        }
        if let Some(environment) = &self.environment {
            parts.push(format!("Environment: {}", environment));
        }
        parts.push(format!("Stage: {}", self.stage));
        parts.join(", ")
    }
}
