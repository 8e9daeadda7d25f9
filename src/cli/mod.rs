//! # Command-Line Interface
//!
//! A thin consumer of the library: each subcommand opens the project,
//! takes one settings snapshot and prints what the library returns.
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Checks | Diagnostics for stack files | `check`, `watch` |
//! | Queries | Resolution and naming | `resolve`, `cycle`, `stack-name`, `imports`, `stacks` |
//! | Catalog | Components on disk | `components`, `component` |
//! | Scaffold | Create missing files | `scaffold stack`, `scaffold component` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr; it also raises the
//! default log level to `debug`:
//! ```bash
//! atmos-lint --verbose check
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command,
//! or [`execute()`] with an already parsed [`Cli`].

mod app;
mod check;
mod components;
mod inspect;
mod output;
mod scaffold_cmd;
mod watch;

pub use app::{execute, run, Cli, Commands, ScaffoldCommands};
pub use output::{Output, OutputFormat};
