//! Domain models for atmos-lint
//!
//! Contains the resolution logic without any filesystem access. Everything
//! here operates on parsed values and paths; reading files is the job of
//! the storage layer.

mod cancel;
mod component;
mod diagnostic;
mod document;
mod glob;
mod graph;
mod import;
mod stack_name;
mod walk;

pub use cancel::CancellationToken;
pub use component::{ComponentDeclaration, ComponentError, ComponentKind, ComponentMetadata, ComponentType};
pub use diagnostic::{Diagnostic, FindingKind, QuickFix, Severity};
pub use document::{components_of, imports_of, parse_imports, parse_value, DocumentError, StackFile};
pub use glob::{Glob, GlobError, GlobSet};
pub use graph::ImportGraph;
pub use import::{
    has_stack_suffix, is_remote, strip_stack_suffix, ImportEdge, ImportKind, ResolvedImport, REMOTE_SCHEMES,
    STACK_EXTENSIONS, STACK_SUFFIXES,
};
pub use stack_name::{derive_stack_name, StackMetadata};
pub use walk::{CyclePath, ImportSource, ImportWalker, ResolveError, WalkError, DEFAULT_MAX_DEPTH};
