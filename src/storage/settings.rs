//! Resolved, absolute project settings
//!
//! [`Settings`] is built from one configuration snapshot and passed
//! explicitly to every resolution entry point. It holds no mutable state.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::domain::{derive_stack_name, has_stack_suffix, ComponentType, GlobError, GlobSet};

use super::config::AtmosConfig;

/// Lexically normalizes a path: drops `.` and folds `..` into its parent.
///
/// Does not touch the filesystem, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Paths and patterns derived from `atmos.yaml` for one project root
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub base_dir: PathBuf,
    pub stacks_dir: PathBuf,
    pub terraform_dir: PathBuf,
    pub helmfile_dir: PathBuf,
    pub workflows_dir: PathBuf,
    pub name_pattern: Option<String>,
    included: GlobSet,
    excluded: GlobSet,
}

impl Settings {
    pub fn from_config(root: &Path, config: &AtmosConfig) -> Result<Self, GlobError> {
        let root = normalize_path(root);
        let base_dir = normalize_path(&root.join(&config.base_path));
        let under_base = |p: &str| normalize_path(&base_dir.join(p));

        Ok(Self {
            stacks_dir: under_base(&config.stacks.base_path),
            terraform_dir: under_base(config.components.base_path(ComponentType::Terraform)),
            helmfile_dir: under_base(config.components.base_path(ComponentType::Helmfile)),
            workflows_dir: under_base(&config.workflows.base_path),
            name_pattern: config.stacks.name_pattern.clone(),
            included: GlobSet::new(&config.stacks.included_paths)?,
            excluded: GlobSet::new(&config.stacks.excluded_paths)?,
            base_dir,
            root,
        })
    }

    /// Settings for a project with no configuration file
    pub fn with_defaults(root: &Path) -> Self {
        Self::from_config(root, &AtmosConfig::default()).expect("default glob patterns compile")
    }

    /// Components directory for a type
    pub fn component_dir(&self, component_type: ComponentType) -> &Path {
        match component_type {
            ComponentType::Terraform => &self.terraform_dir,
            ComponentType::Helmfile => &self.helmfile_dir,
        }
    }

    /// Path relative to the stacks directory, `/`-separated
    pub fn stacks_relative(&self, path: &Path) -> Option<String> {
        let relative = normalize_path(path);
        let relative = relative.strip_prefix(&self.stacks_dir).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    /// Returns true if the path is a stack file: under the stacks directory,
    /// with a stack suffix, included and not excluded
    pub fn is_stack_file(&self, path: &Path) -> bool {
        let Some(relative) = self.stacks_relative(path) else {
            return false;
        };

        has_stack_suffix(&relative)
            && self.included.is_match(&relative)
            && !self.excluded.is_match(&relative)
    }

    /// Stack name for a file, or None when it is outside the stacks directory
    pub fn stack_name(&self, path: &Path) -> Option<String> {
        derive_stack_name(&normalize_path(path), &self.stacks_dir, self.name_pattern.as_deref())
    }

    /// All stack files, sorted. A missing stacks directory yields no files.
    pub fn stack_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_files(&self.stacks_dir, &mut files)?;
        files.retain(|f| self.is_stack_file(f));
        files.sort();
        Ok(files)
    }

    /// Workflow files directly inside the workflows directory, sorted
    pub fn workflow_files(&self) -> io::Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.workflows_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && (name.ends_with(".yaml") || name.ends_with(".yml")) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "vars: {}\n").unwrap();
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("/a/b/../../..")), PathBuf::from("/"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("./x")), PathBuf::from("x"));
    }

    #[test]
    fn default_directories() {
        let settings = Settings::with_defaults(Path::new("/repo"));
        assert_eq!(settings.stacks_dir, PathBuf::from("/repo/stacks"));
        assert_eq!(settings.terraform_dir, PathBuf::from("/repo/components/terraform"));
        assert_eq!(settings.helmfile_dir, PathBuf::from("/repo/components/helmfile"));
        assert_eq!(settings.workflows_dir, PathBuf::from("/repo/stacks/workflows"));
        assert_eq!(
            settings.component_dir(ComponentType::Helmfile),
            Path::new("/repo/components/helmfile")
        );
    }

    #[test]
    fn base_path_prefixes_everything() {
        let config = AtmosConfig::from_yaml("base_path: ./infra\nstacks:\n  base_path: configs\n").unwrap();
        let settings = Settings::from_config(Path::new("/repo"), &config).unwrap();
        assert_eq!(settings.base_dir, PathBuf::from("/repo/infra"));
        assert_eq!(settings.stacks_dir, PathBuf::from("/repo/infra/configs"));
        assert_eq!(settings.terraform_dir, PathBuf::from("/repo/infra/components/terraform"));
    }

    #[test]
    fn stack_file_filters() {
        let config = AtmosConfig::from_yaml(
            "stacks:\n  included_paths: [\"orgs/**/*\", \"catalog/**/*\"]\n  excluded_paths: [\"**/_defaults.yaml\"]\n",
        )
        .unwrap();
        let settings = Settings::from_config(Path::new("/repo"), &config).unwrap();

        assert!(settings.is_stack_file(Path::new("/repo/stacks/orgs/acme/prod.yaml")));
        assert!(settings.is_stack_file(Path::new("/repo/stacks/catalog/vpc/base.yml.tmpl")));
        assert!(!settings.is_stack_file(Path::new("/repo/stacks/orgs/acme/_defaults.yaml")));
        assert!(!settings.is_stack_file(Path::new("/repo/stacks/orgs/acme/README.md")));
        assert!(!settings.is_stack_file(Path::new("/repo/stacks/top.yaml")));
        assert!(!settings.is_stack_file(Path::new("/repo/other/orgs/a/prod.yaml")));
    }

    #[test]
    fn stack_name_uses_pattern() {
        let config = AtmosConfig::from_yaml("stacks:\n  name_pattern: \"{environment}-{stage}\"\n").unwrap();
        let settings = Settings::from_config(Path::new("/repo"), &config).unwrap();
        assert_eq!(
            settings.stack_name(Path::new("/repo/stacks/ue2/prod.yaml")).as_deref(),
            Some("ue2-prod")
        );
        assert_eq!(settings.stack_name(Path::new("/elsewhere/prod.yaml")), None);
    }

    #[test]
    fn enumerates_stack_files_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "stacks/orgs/b.yaml");
        write(dir.path(), "stacks/orgs/a.yml");
        write(dir.path(), "stacks/catalog/vpc.yaml.tmpl");
        write(dir.path(), "stacks/notes.txt");

        let settings = Settings::with_defaults(dir.path());
        let files = settings.stack_files().unwrap();
        let relative: Vec<String> = files
            .iter()
            .filter_map(|f| settings.stacks_relative(f))
            .collect();

        assert_eq!(relative, vec!["catalog/vpc.yaml.tmpl", "orgs/a.yml", "orgs/b.yaml"]);
    }

    #[test]
    fn missing_directories_are_empty() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::with_defaults(dir.path());
        assert!(settings.stack_files().unwrap().is_empty());
        assert!(settings.workflow_files().unwrap().is_empty());
    }

    #[test]
    fn workflow_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "stacks/workflows/deploy.yaml");
        write(dir.path(), "stacks/workflows/nested/skip.yaml");
        write(dir.path(), "stacks/workflows/readme.md");

        let settings = Settings::with_defaults(dir.path());
        let files = settings.workflow_files().unwrap();
        assert_eq!(files, vec![dir.path().join("stacks/workflows/deploy.yaml")]);
    }
}
