//! Scaffold commands

use std::path::Path;

use anyhow::{Context, Result};

use super::app::ScaffoldCommands;
use super::output::Output;
use crate::storage::{absolute_path, create_component, create_stack_file, Project};

pub fn run(cmd: ScaffoldCommands, output: &Output, project: &Project) -> Result<()> {
    match cmd {
        ScaffoldCommands::Stack { file, reference } => stack(output, project, &file, &reference),
        ScaffoldCommands::Component { path, component_type } => {
            let settings = project.settings()?;
            let base = settings.component_dir(component_type);
            output.verbose_ctx(
                "scaffold",
                &format!("Creating {} component '{}' in {}", component_type, path, base.display()),
            );

            let written = create_component(base, &path, component_type)
                .with_context(|| format!("Failed to create component '{}'", path))?;

            if output.is_json() {
                output.data(&serde_json::json!({
                    "component": path,
                    "type": component_type,
                    "created": written,
                }));
            } else {
                output.success(&format!("Created {} component '{}'", component_type, path));
                for file in &written {
                    println!("  {}", project.display_path(file));
                }
            }
            Ok(())
        }
    }
}

fn stack(output: &Output, project: &Project, file: &Path, reference: &str) -> Result<()> {
    let settings = project.settings()?;
    let file = absolute_path(file)?;
    output.verbose_ctx(
        "scaffold",
        &format!("Creating stack file for '{}' imported from {}", reference, file.display()),
    );

    let created = create_stack_file(&settings, &file, reference)
        .with_context(|| format!("Failed to create stack file for '{}'", reference))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "reference": reference,
            "created": created,
        }));
    } else {
        output.success(&format!("Created stack file {}", project.display_path(&created)));
    }
    Ok(())
}
