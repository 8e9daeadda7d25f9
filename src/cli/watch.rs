//! `watch` command
//!
//! Watches the project root and re-runs the full check after each debounced
//! batch of changes. A batch arriving while a check is still running cancels
//! that check before the next one starts.

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::new_debouncer;

use super::check;
use super::output::Output;
use crate::analysis::Inspector;
use crate::domain::CancellationToken;
use crate::storage::{Project, CONFIG_FILE_NAMES};

/// File suffixes that can change a check result
const WATCHED_SUFFIXES: [&str; 4] = [".yaml", ".yml", ".tmpl", ".tf"];

/// Returns true if a change to `path` should trigger a new check
fn is_relevant(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };

    // .git, .terraform and friends
    let hidden = relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
    if hidden {
        return false;
    }

    let name = relative.to_string_lossy();
    WATCHED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn is_config_file(root: &Path, path: &Path) -> bool {
    CONFIG_FILE_NAMES.iter().any(|name| path == root.join(name))
}

/// One check pass, stopping early when `token` is cancelled
fn check_once(output: &Output, project: &Project, token: &CancellationToken) {
    let settings = match project.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return;
        }
    };

    match Inspector::new(&settings).with_cancellation(token).inspect_project() {
        Ok(reports) => {
            check::render(output, project, &reports);
        }
        Err(e) if e.is_cancelled() => output.verbose_ctx("watch", "Check cancelled by newer changes"),
        Err(e) => eprintln!("Error: {}", e),
    }
}

pub fn run(output: &Output, project: &Project, debounce_ms: u64) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(debounce_ms), tx)
        .context("Failed to start file watcher")?;
    debouncer
        .watcher()
        .watch(project.root(), RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", project.root().display()))?;

    if !output.is_json() {
        println!(
            "Watching {} (debounce: {}ms, Ctrl-C to stop)",
            project.root().display(),
            debounce_ms
        );
    }

    thread::scope(|scope| {
        let spawn = |token: CancellationToken| {
            scope.spawn(move || check_once(output, project, &token))
        };

        let mut token = CancellationToken::new();
        let mut in_flight = Some(spawn(token.clone()));

        loop {
            match rx.recv() {
                Ok(Ok(events)) => {
                    let root = project.root();
                    let relevant: Vec<_> = events
                        .iter()
                        .filter(|e| is_relevant(root, &e.path))
                        .collect();
                    if relevant.is_empty() {
                        continue;
                    }

                    if relevant.iter().any(|e| is_config_file(root, &e.path)) {
                        output.verbose_ctx("watch", "Configuration changed");
                        project.invalidate_config();
                    }
                    output.verbose_ctx("watch", &format!("Detected {} change(s)", relevant.len()));
                    tracing::debug!(changes = relevant.len(), "re-running checks");

                    token.cancel();
                    if let Some(handle) = in_flight.take() {
                        if handle.join().is_err() {
                            tracing::warn!("check thread panicked");
                        }
                    }

                    token = CancellationToken::new();
                    in_flight = Some(spawn(token.clone()));
                }
                Ok(Err(error)) => {
                    tracing::warn!(?error, "watch error");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "watch channel closed");
                    break;
                }
            }
        }

        token.cancel();
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_paths() {
        let root = Path::new("/repo");
        assert!(is_relevant(root, Path::new("/repo/stacks/orgs/prod.yaml")));
        assert!(is_relevant(root, Path::new("/repo/stacks/catalog/vpc.yml.tmpl")));
        assert!(is_relevant(root, Path::new("/repo/components/terraform/vpc/main.tf")));
        assert!(is_relevant(root, Path::new("/repo/atmos.yaml")));

        assert!(!is_relevant(root, Path::new("/repo/.git/index")));
        assert!(!is_relevant(root, Path::new("/repo/components/terraform/vpc/.terraform/x.tf")));
        assert!(!is_relevant(root, Path::new("/repo/README.md")));
        assert!(!is_relevant(root, Path::new("/elsewhere/prod.yaml")));
    }

    #[test]
    fn config_file_detection() {
        let root = Path::new("/repo");
        assert!(is_config_file(root, Path::new("/repo/atmos.yaml")));
        assert!(is_config_file(root, Path::new("/repo/atmos.yml")));
        assert!(!is_config_file(root, Path::new("/repo/stacks/atmos.yaml")));
    }
}
