//! Component catalog commands

use anyhow::{bail, Result};

use super::output::Output;
use crate::domain::ComponentType;
use crate::storage::{ComponentCatalog, Project};

/// List components, optionally of one type
pub fn list(output: &Output, project: &Project, component_type: Option<ComponentType>) -> Result<()> {
    let settings = project.settings()?;
    let catalog = ComponentCatalog::new(&settings);

    let entries = match component_type {
        Some(component_type) => catalog.list(component_type)?,
        None => catalog.list_all()?,
    };
    output.verbose_ctx("components", &format!("Found {} component(s)", entries.len()));

    if output.is_json() {
        output.data(&entries);
    } else if entries.is_empty() {
        println!("No components found.");
    } else {
        println!("{:<12} COMPONENT", "TYPE");
        println!("{}", "-".repeat(50));
        for entry in &entries {
            println!("{:<12} {}", entry.component_type, entry.relative_path);
        }
    }

    Ok(())
}

/// Show one component's files and declared variables
pub fn show(output: &Output, project: &Project, name: &str, component_type: ComponentType) -> Result<()> {
    let settings = project.settings()?;
    let catalog = ComponentCatalog::new(&settings);

    let Some(entry) = catalog.describe(name, component_type)? else {
        bail!(
            "No {} component directory '{}' in {}",
            component_type,
            name,
            project.display_path(catalog.base_dir(component_type))
        );
    };

    let variables = match component_type {
        ComponentType::Terraform => catalog.variables(name, component_type)?,
        ComponentType::Helmfile => Vec::new(),
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "component": entry,
            "path": catalog.component_path(name, component_type),
            "variables": variables,
        }));
    } else {
        println!("{} ({})", entry.relative_path, entry.component_type);
        println!(
            "Path: {}",
            project.display_path(&catalog.component_path(name, component_type))
        );
        if !entry.exists {
            println!("Not a component: no {} found", component_type.marker_files().join(", "));
        }

        println!();
        println!("Files:");
        for file in &entry.files {
            println!("  {}", file);
        }

        if !variables.is_empty() {
            println!();
            println!("Variables:");
            for variable in &variables {
                println!("  {}", variable);
            }
        }
    }

    Ok(())
}
