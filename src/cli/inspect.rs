//! Single-file queries (resolve, cycle, stack-name, stacks, imports)

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use super::output::Output;
use crate::domain::{
    parse_imports, ImportGraph, ImportKind, ImportWalker, ResolvedImport, StackMetadata,
};
use crate::storage::{absolute_path, stack_file_target, PathResolver, Project, Settings};

fn describe_resolution(project: &Project, resolution: &ResolvedImport) -> String {
    match resolution {
        ResolvedImport::Local { path } => project.display_path(path),
        ResolvedImport::Remote { uri } => format!("{} (remote)", uri),
        ResolvedImport::Unresolved => "unresolved".to_string(),
    }
}

/// Resolve one import reference made from `file`
pub fn resolve(output: &Output, project: &Project, file: &Path, reference: &str) -> Result<()> {
    let settings = project.settings()?;
    let file = absolute_path(file)?;
    output.verbose_ctx(
        "resolve",
        &format!("Resolving '{}' from {}", reference, file.display()),
    );

    let resolution = PathResolver::new(&settings).resolve(&file, reference)?;
    let suggestion = resolution
        .is_unresolved()
        .then(|| stack_file_target(&settings, &file, reference).ok())
        .flatten();

    if output.is_json() {
        output.data(&serde_json::json!({
            "file": file,
            "reference": reference,
            "resolution": resolution,
            "suggested_path": suggestion,
        }));
    } else {
        println!("{}", describe_resolution(project, &resolution));
        if let Some(path) = suggestion {
            println!("  create with: atmos-lint scaffold stack {} {}", project.display_path(&file), reference);
            output.verbose_ctx("resolve", &format!("Would create {}", path.display()));
        }
    }

    Ok(())
}

/// Find the first import cycle reachable from `file`
pub fn cycle(output: &Output, project: &Project, file: &Path) -> Result<ExitCode> {
    let settings = project.settings()?;
    let file = absolute_path(file)?;

    let resolver = PathResolver::new(&settings);
    let cycle = ImportWalker::new(&resolver)
        .find_cycle(&file)
        .with_context(|| format!("Failed to walk imports of {}", file.display()))?;

    let names = cycle
        .as_ref()
        .map(|c| c.relative_names(&settings.stacks_dir));

    if output.is_json() {
        output.data(&serde_json::json!({
            "file": file,
            "cycle": names,
        }));
    } else {
        match &names {
            Some(names) => println!("Circular import detected: {}", names.join(" → ")),
            None => println!("No import cycle reachable from {}", project.display_path(&file)),
        }
    }

    Ok(if cycle.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Print the stack name for `file`
pub fn stack_name(output: &Output, project: &Project, file: &Path) -> Result<()> {
    let settings = project.settings()?;
    let file = absolute_path(file)?;

    let Some(name) = settings.stack_name(&file) else {
        bail!(
            "{} is not under the stacks directory {}",
            file.display(),
            settings.stacks_dir.display()
        );
    };
    let metadata = StackMetadata::from_stack_name(&name);

    if output.is_json() {
        output.data(&serde_json::json!({
            "file": file,
            "stack": name,
            "metadata": metadata,
        }));
    } else {
        println!("{}", name);
        output.verbose_ctx("stack-name", &metadata.display_name());
    }

    Ok(())
}

fn stack_files(settings: &Settings) -> Result<Vec<PathBuf>> {
    settings
        .stack_files()
        .with_context(|| format!("Failed to list stack files in {}", settings.stacks_dir.display()))
}

/// List stack files, their stack names, import cycles among them and workflow files
pub fn stacks(output: &Output, project: &Project) -> Result<()> {
    let settings = project.settings()?;
    let files = stack_files(&settings)?;
    output.verbose_ctx("stacks", &format!("Found {} stack file(s)", files.len()));

    let resolver = PathResolver::new(&settings);
    let graph = ImportGraph::build(&resolver, files.iter().map(PathBuf::as_path), None)?;
    let cycles = graph.cycles();
    let workflows = settings
        .workflow_files()
        .with_context(|| format!("Failed to list workflows in {}", settings.workflows_dir.display()))?;

    if output.is_json() {
        let items: Vec<_> = files
            .iter()
            .map(|f| {
                serde_json::json!({
                    "file": settings.stacks_relative(f),
                    "stack": settings.stack_name(f),
                })
            })
            .collect();
        let cycles: Vec<Vec<String>> = cycles
            .iter()
            .map(|group| group.iter().map(|f| project.display_path(f)).collect())
            .collect();
        let workflows: Vec<String> = workflows.iter().map(|f| project.display_path(f)).collect();
        output.data(&serde_json::json!({
            "stacks": items,
            "cycles": cycles,
            "workflows": workflows,
        }));
    } else if files.is_empty() {
        println!("No stack files found in {}", project.display_path(&settings.stacks_dir));
    } else {
        println!("{:<40} STACK", "FILE");
        println!("{}", "-".repeat(70));
        for file in &files {
            println!(
                "{:<40} {}",
                settings.stacks_relative(file).unwrap_or_default(),
                settings.stack_name(file).unwrap_or_default()
            );
        }

        if !cycles.is_empty() {
            println!();
            println!("Import cycles ({}):", cycles.len());
            for group in &cycles {
                let names: Vec<String> = group.iter().map(|f| project.display_path(f)).collect();
                println!("  {}", names.join(", "));
            }
        }
    }

    if !output.is_json() && !workflows.is_empty() {
        println!();
        println!("Workflows ({}):", workflows.len());
        for workflow in &workflows {
            println!("  {}", project.display_path(workflow));
        }
    }

    Ok(())
}

/// Show what `file` imports and which stack files import it
pub fn imports(output: &Output, project: &Project, file: &Path) -> Result<()> {
    let settings = project.settings()?;
    let file = absolute_path(file)?;
    let resolver = PathResolver::new(&settings);

    let content = fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
    let references = parse_imports(&content).with_context(|| format!("Failed to parse {}", file.display()))?;

    let mut resolved = Vec::new();
    for reference in references {
        if ImportKind::classify(&reference) == ImportKind::Blank {
            continue;
        }
        let resolution = resolver.resolve(&file, &reference)?;
        resolved.push((reference, resolution));
    }

    let mut files = stack_files(&settings)?;
    if !files.contains(&file) {
        files.push(file.clone());
    }
    let graph = ImportGraph::build(&resolver, files.iter().map(PathBuf::as_path), None)?;
    let importers = graph.importers_of(&file);
    output.verbose_ctx(
        "imports",
        &format!("Import graph: {} file(s), {} edge(s)", graph.len(), graph.edge_count()),
    );

    if output.is_json() {
        let imports: Vec<_> = resolved
            .iter()
            .map(|(reference, resolution)| {
                serde_json::json!({
                    "reference": reference,
                    "resolution": resolution,
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "file": file,
            "imports": imports,
            "imported_by": importers,
        }));
    } else {
        println!("Imports ({}):", resolved.len());
        for (reference, resolution) in &resolved {
            println!("  {:<30} {}", reference, describe_resolution(project, resolution));
        }
        println!();
        println!("Imported by ({}):", importers.len());
        for importer in &importers {
            println!("  {}", project.display_path(importer));
        }
    }

    Ok(())
}
