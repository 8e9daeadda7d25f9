//! # Analysis
//!
//! Inspections that combine the storage layer (resolution, catalog) with the
//! domain algorithms (cycle walking, metadata) into per-file diagnostics.
//!
//! | Finding | Severity | Quick fix |
//! |---------|----------|-----------|
//! | unresolved import | error | create stack file |
//! | circular import | error | none |
//! | unknown component | warning | create component |
//! | import depth exceeded | warning | none |
//! | outside stacks root | info | none |
//!
//! An [`Inspector`] works against one [`Settings`](crate::storage::Settings)
//! snapshot and holds no state between calls, so several may run at once.

mod inspections;

pub use inspections::{ComponentCheck, FileReport, ImportCheck, InspectError, Inspector, Summary};
