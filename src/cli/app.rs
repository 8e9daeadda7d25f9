//! Main CLI application structure

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::{check, components, inspect, scaffold_cmd, watch};
use crate::domain::ComponentType;
use crate::storage::Project;

#[derive(Parser)]
#[command(name = "atmos-lint")]
#[command(author, version, about = "Import resolution and validation for Atmos stack repositories")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (defaults to the nearest directory holding atmos.yaml)
    #[arg(long, global = true, env = "ATMOS_LINT_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect stack files for missing imports, cycles and unknown components
    Check {
        /// Stack files to check (defaults to every stack file)
        files: Vec<PathBuf>,
    },

    /// Resolve an import reference as written in a stack file
    Resolve {
        /// The importing stack file
        file: PathBuf,

        /// The import string
        reference: String,
    },

    /// Find the first import cycle reachable from a stack file
    Cycle {
        file: PathBuf,
    },

    /// Print the stack name derived from a file's location
    StackName {
        file: PathBuf,
    },

    /// List stack files with their stack names
    Stacks,

    /// List components in the catalog
    Components {
        /// Only list components of this type
        #[arg(long = "type", short = 't')]
        component_type: Option<ComponentType>,
    },

    /// Show one component's files and variables
    Component {
        /// Path under the components directory
        name: String,

        #[arg(long = "type", short = 't', default_value = "terraform")]
        component_type: ComponentType,
    },

    /// Show a stack file's imports and the files importing it
    Imports {
        file: PathBuf,
    },

    /// Create missing stack files or components
    #[command(subcommand)]
    Scaffold(ScaffoldCommands),

    /// Re-run checks whenever stack files or atmos.yaml change
    Watch {
        /// Quiet period before a batch of changes is checked
        #[arg(long, default_value = "300")]
        debounce_ms: u64,
    },
}

#[derive(Subcommand)]
pub enum ScaffoldCommands {
    /// Create the stack file an unresolved import refers to
    Stack {
        /// The importing stack file
        file: PathBuf,

        /// The unresolved import string
        reference: String,
    },

    /// Create a component directory with starter files
    Component {
        /// Path under the components directory
        path: String,

        #[arg(long = "type", short = 't', default_value = "terraform")]
        component_type: ComponentType,
    },
}

/// Opens the project from `--root`, or discovers it from the current directory
fn open_project(root: Option<&PathBuf>, output: &Output) -> Result<Project> {
    let project = match root {
        Some(root) => Project::open(root)?,
        None => Project::discover(".")?,
    };
    output.verbose_ctx("project", &format!("Opened project at: {}", project.root().display()));

    let snapshot = project.config_snapshot();
    match (&snapshot.source, &snapshot.error) {
        (Some(source), None) => output.verbose_ctx("project", &format!("Loaded {}", source.display())),
        (Some(source), Some(error)) => output.verbose_ctx(
            "project",
            &format!("Ignoring {} ({}), using defaults", source.display(), error),
        ),
        (None, _) => output.verbose_ctx("project", "No atmos.yaml, using defaults"),
    }

    Ok(project)
}

/// Runs a parsed command line
pub fn execute(cli: Cli) -> Result<ExitCode> {
    let output = Output::new(cli.format, cli.verbose);
    output.verbose("atmos-lint starting");

    let project = open_project(cli.root.as_ref(), &output)?;

    let code = match cli.command {
        Commands::Check { files } => check::run(&output, &project, &files)?,
        Commands::Resolve { file, reference } => {
            inspect::resolve(&output, &project, &file, &reference)?;
            ExitCode::SUCCESS
        }
        Commands::Cycle { file } => inspect::cycle(&output, &project, &file)?,
        Commands::StackName { file } => {
            inspect::stack_name(&output, &project, &file)?;
            ExitCode::SUCCESS
        }
        Commands::Stacks => {
            inspect::stacks(&output, &project)?;
            ExitCode::SUCCESS
        }
        Commands::Components { component_type } => {
            components::list(&output, &project, component_type)?;
            ExitCode::SUCCESS
        }
        Commands::Component { name, component_type } => {
            components::show(&output, &project, &name, component_type)?;
            ExitCode::SUCCESS
        }
        Commands::Imports { file } => {
            inspect::imports(&output, &project, &file)?;
            ExitCode::SUCCESS
        }
        Commands::Scaffold(cmd) => {
            scaffold_cmd::run(cmd, &output, &project)?;
            ExitCode::SUCCESS
        }
        Commands::Watch { debounce_ms } => {
            watch::run(&output, &project, debounce_ms)?;
            ExitCode::SUCCESS
        }
    };

    output.verbose("Command completed");
    Ok(code)
}

/// Main entry point for the CLI
pub fn run() -> Result<ExitCode> {
    execute(Cli::parse())
}
