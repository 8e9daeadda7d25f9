//! `check` command

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};

use super::output::Output;
use crate::analysis::{FileReport, Inspector, Summary};
use crate::storage::{absolute_path, Project, Settings};

/// Files to inspect: the given ones, or every stack file of the project
pub(super) fn target_files(settings: &Settings, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if files.is_empty() {
        return settings
            .stack_files()
            .with_context(|| format!("Failed to list stack files in {}", settings.stacks_dir.display()));
    }
    files.iter().map(|f| absolute_path(f)).collect()
}

/// Prints reports and a summary line
pub(super) fn render(output: &Output, project: &Project, reports: &[FileReport]) -> Summary {
    let summary = Summary::of(reports);

    if output.is_json() {
        output.data(&serde_json::json!({
            "files": reports,
            "summary": summary,
        }));
        return summary;
    }

    for report in reports {
        let path = project.display_path(&report.file);
        if let Some(error) = &report.malformed {
            output.verbose_ctx("check", &format!("{}: skipped, {}", path, error));
        }
        for component in report.components.iter().filter(|c| !c.inherits.is_empty()) {
            output.verbose_ctx(
                "check",
                &format!("{}: {} inherits from {}", path, component.name, component.inherits.join(", ")),
            );
        }
        for diagnostic in &report.diagnostics {
            output.diagnostic(&path, diagnostic);
        }
    }

    println!(
        "Checked {} file(s): {} error(s), {} warning(s){}",
        summary.files,
        summary.errors,
        summary.warnings,
        if summary.malformed > 0 {
            format!(", {} unparseable", summary.malformed)
        } else {
            String::new()
        }
    );
    summary
}

/// Inspect stack files; fails when any error-severity finding exists
pub fn run(output: &Output, project: &Project, files: &[PathBuf]) -> Result<ExitCode> {
    let settings = project.settings()?;
    let files = target_files(&settings, files)?;
    output.verbose_ctx("check", &format!("Checking {} file(s)", files.len()));

    let reports = Inspector::new(&settings)
        .inspect_files(&files)
        .context("Inspection failed")?;

    let summary = render(output, project, &reports);
    Ok(if summary.errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
