//! atmos-lint - Import resolution and validation for Atmos stack repositories
//!
//! Resolves `import` references between stack documents, finds import
//! cycles, derives stack names from file locations and checks component
//! references against the on-disk component catalog.

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod storage;

pub use analysis::{FileReport, Inspector};
pub use domain::{
    derive_stack_name, ComponentMetadata, ComponentType, CyclePath, Diagnostic, ImportWalker, ResolvedImport,
    StackFile,
};
pub use storage::{ComponentCatalog, PathResolver, Project, Settings};
