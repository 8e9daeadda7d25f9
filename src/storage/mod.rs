//! # Storage Layer
//!
//! Everything that touches the filesystem.
//!
//! ## Project Structure
//!
//! ```text
//! <root>/
//! ├── atmos.yaml              # Project configuration (or atmos.yml)
//! ├── stacks/                 # stacks.base_path
//! │   ├── catalog/            # Reusable fragments, named by path
//! │   ├── mixins/
//! │   ├── orgs/acme/prod.yaml # Deployable stack files
//! │   └── workflows/          # workflows.base_path
//! └── components/
//!     ├── terraform/vpc/      # main.tf, variables.tf, outputs.tf
//!     └── helmfile/nginx/     # helmfile.yaml
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point; owns the configuration cache
//! - [`Settings`] - Absolute directories and path filters for one snapshot
//! - [`PathResolver`] - Import resolution, also the walker's [`ImportSource`](crate::domain::ImportSource)
//! - [`ComponentCatalog`] - Marker-file based component lookup
//! - [`ConfigCache`] - Modification-stamp gated `atmos.yaml` cache

pub mod catalog;
mod config;
mod config_cache;
mod project;
mod resolver;
pub mod scaffold;
mod settings;

pub use catalog::{CatalogError, ComponentCatalog, ComponentCatalogEntry};
pub use config::{
    AtmosConfig, ComponentTypeConfig, ComponentsConfig, ConfigError, StacksConfig, WorkflowsConfig,
    CONFIG_FILE_NAMES,
};
pub use config_cache::{ConfigCache, ConfigSnapshot};
pub use project::{absolute_path, Project, ProjectError};
pub use resolver::{resolve, resolve_with_extensions, PathResolver};
pub use scaffold::{create_component, create_stack_file, stack_file_target, ScaffoldError};
pub use settings::{normalize_path, Settings};
