//! Stack file inspections
//!
//! Three checks run per stack file:
//! - missing import: a local import that resolves to no file
//! - circular import: an import that leads back onto its own import path
//! - unknown component: a non-abstract declaration with no catalog entry
//!
//! Documents that fail to parse are reported on the [`FileReport`] but
//! produce no diagnostics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::domain::{
    CancellationToken, ComponentType, CyclePath, Diagnostic, FindingKind, ImportEdge, ImportKind, ImportWalker,
    QuickFix, ResolveError, ResolvedImport, Severity, StackFile, WalkError, DEFAULT_MAX_DEPTH,
};
use crate::storage::{normalize_path, stack_file_target, CatalogError, ComponentCatalog, PathResolver, Settings};

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl InspectError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InspectError::Walk(WalkError::Cancelled))
    }
}

impl From<ResolveError> for InspectError {
    fn from(error: ResolveError) -> Self {
        InspectError::Walk(error.into())
    }
}

/// Outcome of checking one import entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportCheck {
    #[serde(flatten)]
    pub edge: ImportEdge,
    pub resolution: ResolvedImport,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<CyclePath>,

    /// Set when the walk through this import hit the depth cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_exceeded: Option<usize>,
}

/// Outcome of checking one component declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentCheck {
    pub name: String,
    pub lookup_key: String,
    pub component_type: ComponentType,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inherits: Vec<String>,

    /// Abstract declarations are not checked against the catalog
    pub exempt: bool,
    pub exists: bool,

    /// Where the component would be scaffolded, when it is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix_path: Option<PathBuf>,
}

/// Everything found in one stack file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub file: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,

    pub diagnostics: Vec<Diagnostic>,

    /// Per-entry results behind the diagnostics, empty for malformed files
    pub imports: Vec<ImportCheck>,
    pub components: Vec<ComponentCheck>,

    /// Parse failure, when the document could not be read as YAML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub malformed: Option<String>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Runs inspections against one settings snapshot
pub struct Inspector<'a> {
    settings: &'a Settings,
    resolver: PathResolver<'a>,
    catalog: ComponentCatalog<'a>,
    cancel: Option<&'a CancellationToken>,
    max_depth: usize,
}

impl<'a> Inspector<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            resolver: PathResolver::new(settings),
            catalog: ComponentCatalog::new(settings),
            cancel: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn walker(&self) -> ImportWalker<'_, PathResolver<'a>> {
        let walker = ImportWalker::new(&self.resolver).with_max_depth(self.max_depth);
        match self.cancel {
            Some(token) => walker.with_cancellation(token),
            None => walker,
        }
    }

    /// Resolves every import of `file` and looks for a cycle through each
    /// local one. Blank references are skipped.
    pub fn check_imports(&self, file: &StackFile) -> Result<Vec<ImportCheck>, WalkError> {
        let walker = self.walker();
        let mut checks = Vec::new();

        for edge in file.edges() {
            if edge.kind() == ImportKind::Blank {
                continue;
            }

            let resolution = self.resolver.resolve(&edge.from, &edge.reference)?;
            let mut check = ImportCheck {
                edge,
                resolution,
                cycle: None,
                depth_exceeded: None,
            };

            if check.resolution.path().is_some() {
                match walker.find_cycle_via(&check.edge.from, &check.edge.reference) {
                    Ok(cycle) => check.cycle = cycle,
                    Err(WalkError::DepthExceeded { limit, path }) => {
                        tracing::debug!(file = %file.path.display(), reference = %check.edge.reference, limit, depth = path.len(), "import walk hit depth cap");
                        check.depth_exceeded = Some(limit);
                    }
                    Err(e) => return Err(e),
                }
            }

            checks.push(check);
        }

        Ok(checks)
    }

    /// Checks every component declaration of `file` against the catalog.
    /// A catalog entry that cannot be read is an error, not a missing
    /// component.
    pub fn check_components(&self, file: &StackFile) -> Result<Vec<ComponentCheck>, CatalogError> {
        file.components
            .iter()
            .map(|declaration| {
                let lookup_key = declaration.lookup_key().to_string();
                let exempt = !declaration.requires_existence();
                let exists = self.catalog.exists(&lookup_key, declaration.component_type)?;
                let suggested_fix_path = (!exempt && !exists)
                    .then(|| self.catalog.component_path(&lookup_key, declaration.component_type));

                Ok(ComponentCheck {
                    name: declaration.name.clone(),
                    lookup_key,
                    component_type: declaration.component_type,
                    inherits: declaration.metadata.inherits.clone(),
                    exempt,
                    exists,
                    suggested_fix_path,
                })
            })
            .collect()
    }

    /// Turns the check results of one file into diagnostics
    pub fn diagnose(&self, file: &StackFile, imports: &[ImportCheck], components: &[ComponentCheck]) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for check in imports {
            if check.resolution.is_unresolved() {
                let mut diagnostic = Diagnostic::new(
                    FindingKind::UnresolvedImport,
                    &file.path,
                    &check.edge.reference,
                    format!("Cannot resolve import '{}'", check.edge.reference),
                );
                if let Ok(target) = stack_file_target(self.settings, &file.path, &check.edge.reference) {
                    diagnostic = diagnostic.with_fix(QuickFix::CreateStackFile { path: target });
                }
                diagnostics.push(diagnostic);
            }

            if let Some(cycle) = &check.cycle {
                diagnostics.push(Diagnostic::new(
                    FindingKind::CircularImport,
                    &file.path,
                    &check.edge.reference,
                    format!(
                        "Circular import detected: {}",
                        cycle.relative_names(&self.settings.stacks_dir).join(" → ")
                    ),
                ));
            }

            if let Some(limit) = check.depth_exceeded {
                diagnostics.push(Diagnostic::new(
                    FindingKind::ImportDepthExceeded,
                    &file.path,
                    &check.edge.reference,
                    format!("Import chain through '{}' exceeds {} files", check.edge.reference, limit),
                ));
            }
        }

        for check in components {
            let Some(path) = &check.suggested_fix_path else {
                continue;
            };

            let base = self.settings.component_dir(check.component_type);
            let base = base.strip_prefix(&self.settings.root).unwrap_or(base);
            diagnostics.push(
                Diagnostic::new(
                    FindingKind::UnknownComponent,
                    &file.path,
                    &check.name,
                    format!("Cannot find component '{}' in {}", check.lookup_key, base.display()),
                )
                .with_fix(QuickFix::CreateComponent {
                    path: path.clone(),
                    component_type: check.component_type,
                }),
            );
        }

        diagnostics
    }

    /// Reads, parses and inspects one stack file
    pub fn inspect_file(&self, path: &Path) -> Result<FileReport, InspectError> {
        if self.cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(WalkError::Cancelled.into());
        }

        let path = normalize_path(path);
        let content = fs::read_to_string(&path).map_err(|source| ResolveError::Io {
            path: path.clone(),
            source,
        })?;

        let mut report = FileReport {
            stack_name: self.settings.stack_name(&path),
            file: path.clone(),
            diagnostics: Vec::new(),
            imports: Vec::new(),
            components: Vec::new(),
            malformed: None,
        };

        if report.stack_name.is_none() {
            report.diagnostics.push(Diagnostic::new(
                FindingKind::OutsideStacksRoot,
                &path,
                path.display().to_string(),
                format!("File is not under the stacks directory {}", self.settings.stacks_dir.display()),
            ));
        }

        let stack_file = match StackFile::parse(&path, Some(&self.settings.stacks_dir), &content) {
            Ok(stack_file) => stack_file,
            Err(e) => {
                tracing::debug!(file = %path.display(), error = %e, "skipping malformed stack file");
                report.malformed = Some(e.to_string());
                return Ok(report);
            }
        };

        report.imports = self.check_imports(&stack_file)?;
        report.components = self.check_components(&stack_file)?;
        let diagnostics = self.diagnose(&stack_file, &report.imports, &report.components);
        report.diagnostics.extend(diagnostics);

        tracing::debug!(file = %path.display(), diagnostics = report.diagnostics.len(), "inspected stack file");
        Ok(report)
    }

    /// Inspects the given files in order
    pub fn inspect_files(&self, files: &[PathBuf]) -> Result<Vec<FileReport>, InspectError> {
        files.iter().map(|file| self.inspect_file(file)).collect()
    }

    /// Inspects every stack file of the project
    pub fn inspect_project(&self) -> Result<Vec<FileReport>, InspectError> {
        let files = self.settings.stack_files().map_err(|source| stacks_dir_error(self.settings, source))?;
        self.inspect_files(&files)
    }
}

fn stacks_dir_error(settings: &Settings, source: io::Error) -> ResolveError {
    ResolveError::Io {
        path: settings.stacks_dir.clone(),
        source,
    }
}

/// Diagnostic counts across reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub errors: usize,
    pub warnings: usize,
    pub malformed: usize,
}

impl Summary {
    pub fn of(reports: &[FileReport]) -> Self {
        let mut summary = Summary {
            files: reports.len(),
            ..Default::default()
        };
        for report in reports {
            if report.malformed.is_some() {
                summary.malformed += 1;
            }
            for diagnostic in &report.diagnostics {
                match diagnostic.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => {}
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        settings: Settings,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let settings = Settings::with_defaults(dir.path());
            Self { dir, settings }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn inspect(&self, path: &Path) -> FileReport {
            Inspector::new(&self.settings).inspect_file(path).unwrap()
        }
    }

    fn kinds(report: &FileReport) -> Vec<FindingKind> {
        report.diagnostics.iter().map(|d| d.kind).collect()
    }

    #[test]
    fn clean_file() {
        let fx = Fixture::new();
        fx.write("stacks/catalog/vpc.yaml", "vars: {}\n");
        fx.write("components/terraform/vpc/main.tf", "");
        let prod = fx.write(
            "stacks/orgs/prod.yaml",
            "import:\n  - catalog/vpc\n  - https://example.com/x.yaml\n  - \"\"\ncomponents:\n  terraform:\n    vpc: {}\n",
        );

        let report = fx.inspect(&prod);
        assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
        assert_eq!(report.stack_name.as_deref(), Some("orgs-prod"));
        assert!(!report.has_errors());
    }

    #[test]
    fn missing_import_offers_stack_file() {
        let fx = Fixture::new();
        let prod = fx.write("stacks/orgs/prod.yaml", "import:\n  - catalog/missing\n");

        let report = fx.inspect(&prod);
        assert_eq!(kinds(&report), vec![FindingKind::UnresolvedImport]);
        assert!(report.has_errors());
        assert_eq!(
            report.diagnostics[0].quick_fix,
            Some(QuickFix::CreateStackFile {
                path: fx.settings.stacks_dir.join("catalog/missing.yaml")
            })
        );
    }

    #[test]
    fn circular_import_reported_on_entry() {
        let fx = Fixture::new();
        let a = fx.write("stacks/orgs/a.yaml", "import:\n  - orgs/b\n  - catalog/ok\n");
        fx.write("stacks/orgs/b.yaml", "import:\n  - orgs/c\n");
        fx.write("stacks/orgs/c.yaml", "import:\n  - orgs/a\n");
        fx.write("stacks/catalog/ok.yaml", "");

        let report = fx.inspect(&a);
        assert_eq!(kinds(&report), vec![FindingKind::CircularImport]);
        let diagnostic = &report.diagnostics[0];
        assert_eq!(diagnostic.subject, "orgs/b");
        assert_eq!(
            diagnostic.message,
            "Circular import detected: orgs/a.yaml → orgs/b.yaml → orgs/c.yaml → orgs/a.yaml"
        );
        assert_eq!(diagnostic.quick_fix, None);
    }

    #[test]
    fn diamond_is_clean() {
        let fx = Fixture::new();
        let a = fx.write("stacks/orgs/a.yaml", "import:\n  - mixins/b\n  - mixins/c\n");
        fx.write("stacks/mixins/b.yaml", "import:\n  - mixins/d\n");
        fx.write("stacks/mixins/c.yaml", "import: mixins/d\n");
        fx.write("stacks/mixins/d.yaml", "vars: {}\n");

        assert!(fx.inspect(&a).diagnostics.is_empty());
    }

    #[test]
    fn depth_cap_is_a_warning() {
        let fx = Fixture::new();
        for i in 0..6 {
            fx.write(&format!("stacks/chain/n{}.yaml", i), &format!("import:\n  - chain/n{}\n", i + 1));
        }
        fx.write("stacks/chain/n6.yaml", "");

        let report = Inspector::new(&fx.settings)
            .with_max_depth(3)
            .inspect_file(&fx.settings.stacks_dir.join("chain/n0.yaml"))
            .unwrap();
        assert_eq!(kinds(&report), vec![FindingKind::ImportDepthExceeded]);
        assert!(!report.has_errors());
    }

    #[test]
    fn unknown_component_and_exemptions() {
        let fx = Fixture::new();
        fx.write("components/terraform/vpc/main.tf", "");
        fx.write("components/terraform/vpc-base/README.md", "");
        let prod = fx.write(
            "stacks/orgs/prod.yaml",
            r#"
components:
  terraform:
    vpc-base:
      metadata:
        type: abstract
    vpc-prod:
      metadata:
        component: vpc
        inherits: vpc-base
    eks: {}
  helmfile:
    nginx: {}
"#,
        );

        let report = fx.inspect(&prod);
        let subjects: Vec<(&str, FindingKind)> = report
            .diagnostics
            .iter()
            .map(|d| (d.subject.as_str(), d.kind))
            .collect();
        assert_eq!(
            subjects,
            vec![("eks", FindingKind::UnknownComponent), ("nginx", FindingKind::UnknownComponent)]
        );
        assert_eq!(
            report.diagnostics[0].message,
            "Cannot find component 'eks' in components/terraform"
        );
        assert_eq!(
            report.diagnostics[1].quick_fix,
            Some(QuickFix::CreateComponent {
                path: fx.settings.helmfile_dir.join("nginx"),
                component_type: ComponentType::Helmfile,
            })
        );
    }

    #[test]
    fn component_checks_expose_exemption() {
        let fx = Fixture::new();
        let file = StackFile::parse(
            fx.settings.stacks_dir.join("orgs/prod.yaml"),
            Some(&fx.settings.stacks_dir),
            "components:\n  terraform:\n    base:\n      metadata:\n        type: abstract\n",
        )
        .unwrap();

        let checks = Inspector::new(&fx.settings).check_components(&file).unwrap();
        assert_eq!(checks.len(), 1);
        assert!(checks[0].exempt);
        assert!(!checks[0].exists);
        assert_eq!(checks[0].suggested_fix_path, None);
    }

    #[test]
    fn malformed_document_has_no_diagnostics() {
        let fx = Fixture::new();
        let bad = fx.write("stacks/orgs/bad.yaml", "import: [unclosed\n");

        let report = fx.inspect(&bad);
        assert!(report.malformed.is_some());
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn outside_stacks_root_is_info() {
        let fx = Fixture::new();
        let stray = fx.write("elsewhere/x.yaml", "vars: {}\n");

        let report = fx.inspect(&stray);
        assert_eq!(kinds(&report), vec![FindingKind::OutsideStacksRoot]);
        assert!(!report.has_errors());
        assert_eq!(report.stack_name, None);
    }

    #[test]
    fn project_inspection_and_summary() {
        let fx = Fixture::new();
        fx.write("stacks/orgs/a.yaml", "import:\n  - orgs/missing\n");
        fx.write("stacks/orgs/b.yaml", "components:\n  terraform:\n    nope: {}\n");
        fx.write("stacks/orgs/c.yaml", "import: [bad\n");

        let reports = Inspector::new(&fx.settings).inspect_project().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(
            Summary::of(&reports),
            Summary {
                files: 3,
                errors: 1,
                warnings: 1,
                malformed: 1,
            }
        );
    }

    #[test]
    fn cancelled_inspection() {
        let fx = Fixture::new();
        let a = fx.write("stacks/orgs/a.yaml", "");
        let token = CancellationToken::new();
        token.cancel();

        let result = Inspector::new(&fx.settings).with_cancellation(&token).inspect_file(&a);
        assert!(matches!(result, Err(ref e) if e.is_cancelled()));
    }

    #[test]
    fn import_checks_carry_their_edge() {
        let fx = Fixture::new();
        fx.write("stacks/catalog/vpc.yaml", "");
        let prod = fx.write("stacks/orgs/prod.yaml", "import:\n  - catalog/vpc\n  - \"\"\n  - catalog/gone\n");

        let report = fx.inspect(&prod);
        let edges: Vec<(&Path, &str)> = report
            .imports
            .iter()
            .map(|c| (c.edge.from.as_path(), c.edge.reference.as_str()))
            .collect();
        assert_eq!(edges, vec![(prod.as_path(), "catalog/vpc"), (prod.as_path(), "catalog/gone")]);
        assert!(report.imports[1].resolution.is_unresolved());

        let json = serde_json::to_value(&report.imports[1]).unwrap();
        assert_eq!(json["reference"], "catalog/gone");
        assert_eq!(json["from"], prod.display().to_string());
    }

    #[test]
    fn component_checks_carry_inherits() {
        let fx = Fixture::new();
        fx.write("components/terraform/vpc/main.tf", "");
        let prod = fx.write(
            "stacks/orgs/prod.yaml",
            "components:\n  terraform:\n    vpc:\n      metadata:\n        inherits: [vpc-defaults, tagging]\n    plain-vpc:\n      metadata:\n        component: vpc\n",
        );

        let report = fx.inspect(&prod);
        assert_eq!(report.components.len(), 2);
        assert_eq!(report.components[0].inherits, vec!["vpc-defaults", "tagging"]);
        assert!(report.components[1].inherits.is_empty());

        let json = serde_json::to_value(&report.components).unwrap();
        assert_eq!(json[0]["inherits"], serde_json::json!(["vpc-defaults", "tagging"]));
        assert!(json[1].get("inherits").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_catalog_entry_fails_inspection() {
        let fx = Fixture::new();
        let marker = fx.settings.terraform_dir.join("vpc/main.tf");
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        std::os::unix::fs::symlink(&marker, &marker).unwrap();
        let prod = fx.write("stacks/orgs/prod.yaml", "components:\n  terraform:\n    vpc: {}\n");

        let result = Inspector::new(&fx.settings).inspect_file(&prod);
        assert!(matches!(result, Err(InspectError::Catalog(_))), "{:?}", result);
    }
}
