//! Import path resolution against the filesystem
//!
//! Resolution order for a local reference:
//! 1. Pick the base directory: the importing file's directory for relative
//!    references (`.`/`/` prefix, leading `./` stripped), the stacks
//!    directory otherwise.
//! 2. Try the exact path, then the path with `.yaml`, `.yml`, `.yaml.tmpl`,
//!    `.yml.tmpl` appended. The first regular file wins.
//!
//! Paths are normalized lexically; `..` may leave the stacks directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::{
    parse_imports, ImportKind, ImportSource, ResolveError, ResolvedImport, STACK_EXTENSIONS,
};

use super::settings::{normalize_path, Settings};

/// Returns true if the file exists and is a regular file.
///
/// Not-found style failures are `false`; any other I/O failure is an error.
fn is_file(path: &Path) -> Result<bool, ResolveError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file()),
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::NotADirectory | io::ErrorKind::InvalidInput
            ) =>
        {
            Ok(false)
        }
        Err(source) => Err(ResolveError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Tries `base/path` and then each stack extension, in priority order
pub fn resolve_with_extensions(base: &Path, path: &str) -> Result<Option<PathBuf>, ResolveError> {
    let exact = normalize_path(&base.join(path));
    if is_file(&exact)? {
        return Ok(Some(exact));
    }

    for extension in STACK_EXTENSIONS {
        let candidate = normalize_path(&base.join(format!("{}{}", path, extension)));
        if is_file(&candidate)? {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Strips the relative-reference prefixes so the rest can be joined to a directory
pub(crate) fn relative_tail(reference: &str) -> &str {
    let tail = reference.strip_prefix("./").unwrap_or(reference);
    tail.trim_start_matches('/')
}

/// Base directory and remaining path for a local reference
pub(crate) fn reference_base<'a>(
    source: &Path,
    reference: &'a str,
    base_dir: &Path,
) -> Option<(PathBuf, &'a str)> {
    match ImportKind::classify(reference) {
        ImportKind::Relative => {
            let dir = source.parent()?;
            Some((dir.to_path_buf(), relative_tail(reference)))
        }
        ImportKind::BaseRelative => Some((base_dir.to_path_buf(), reference)),
        ImportKind::Blank | ImportKind::Remote => None,
    }
}

/// Resolves `reference` made from `source`, with base-relative references
/// resolved against `base_dir`
pub fn resolve(source: &Path, reference: &str, base_dir: &Path) -> Result<ResolvedImport, ResolveError> {
    if ImportKind::classify(reference) == ImportKind::Remote {
        return Ok(ResolvedImport::Remote {
            uri: reference.to_string(),
        });
    }

    let Some((base, path)) = reference_base(source, reference, base_dir) else {
        return Ok(ResolvedImport::Unresolved);
    };

    Ok(match resolve_with_extensions(&base, path)? {
        Some(file) => ResolvedImport::Local { path: file },
        None => ResolvedImport::Unresolved,
    })
}

/// Resolves import references for one project
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    settings: &'a Settings,
}

impl<'a> PathResolver<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Resolves an import made from `source` against the stacks directory
    pub fn resolve(&self, source: &Path, reference: &str) -> Result<ResolvedImport, ResolveError> {
        let resolved = resolve(&normalize_path(source), reference, &self.settings.stacks_dir)?;
        tracing::trace!(source = %source.display(), reference, ?resolved, "resolved import");
        Ok(resolved)
    }
}

impl ImportSource for PathResolver<'_> {
    fn imports(&self, file: &Path) -> Result<Vec<String>, ResolveError> {
        let content = match fs::read_to_string(file) {
            Ok(content) => content,
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::InvalidData) => {
                return Ok(vec![]);
            }
            Err(source) => {
                return Err(ResolveError::Io {
                    path: file.to_path_buf(),
                    source,
                })
            }
        };

        match parse_imports(&content) {
            Ok(imports) => Ok(imports),
            Err(e) => {
                tracing::debug!(file = %file.display(), error = %e, "unparseable stack file, treating as a dead end");
                Ok(vec![])
            }
        }
    }

    fn resolve(&self, from: &Path, reference: &str) -> Result<ResolvedImport, ResolveError> {
        PathResolver::resolve(self, from, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        settings: Settings,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let settings = Settings::with_defaults(dir.path());
            fs::create_dir_all(&settings.stacks_dir).unwrap();
            Self { _dir: dir, settings }
        }

        fn write(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.settings.stacks_dir.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn stacks(&self, relative: &str) -> PathBuf {
            self.settings.stacks_dir.join(relative)
        }

        fn resolve(&self, source: &Path, reference: &str) -> ResolvedImport {
            PathResolver::new(&self.settings).resolve(source, reference).unwrap()
        }
    }

    #[test]
    fn base_relative_with_extension() {
        let fx = Fixture::new();
        let target = fx.write("catalog/vpc.yaml", "");
        let source = fx.write("orgs/acme/prod.yaml", "");

        assert_eq!(fx.resolve(&source, "catalog/vpc"), ResolvedImport::local(target));
    }

    #[test]
    fn exact_path_first() {
        let fx = Fixture::new();
        let exact = fx.write("catalog/vpc.yaml", "");
        fx.write("catalog/vpc.yaml.yaml", "");
        let source = fx.write("orgs/prod.yaml", "");

        assert_eq!(fx.resolve(&source, "catalog/vpc.yaml"), ResolvedImport::local(exact));
    }

    #[test]
    fn extension_priority() {
        let fx = Fixture::new();
        let source = fx.write("orgs/prod.yaml", "");
        fx.write("catalog/x.yml.tmpl", "");
        assert_eq!(fx.resolve(&source, "catalog/x"), ResolvedImport::local(fx.stacks("catalog/x.yml.tmpl")));

        fx.write("catalog/x.yaml.tmpl", "");
        assert_eq!(fx.resolve(&source, "catalog/x"), ResolvedImport::local(fx.stacks("catalog/x.yaml.tmpl")));

        fx.write("catalog/x.yml", "");
        assert_eq!(fx.resolve(&source, "catalog/x"), ResolvedImport::local(fx.stacks("catalog/x.yml")));

        fx.write("catalog/x.yaml", "");
        assert_eq!(fx.resolve(&source, "catalog/x"), ResolvedImport::local(fx.stacks("catalog/x.yaml")));
    }

    #[test]
    fn directory_is_not_a_match() {
        let fx = Fixture::new();
        let source = fx.write("orgs/prod.yaml", "");
        fx.write("catalog/vpc/defaults.yaml", "");
        let file = fx.write("catalog/vpc.yaml", "");

        assert_eq!(fx.resolve(&source, "catalog/vpc"), ResolvedImport::local(file));
    }

    #[test]
    fn relative_references() {
        let fx = Fixture::new();
        let source = fx.write("orgs/acme/prod.yaml", "");
        let sibling = fx.write("orgs/acme/_defaults.yaml", "");
        let parent = fx.write("orgs/_defaults.yml", "");

        assert_eq!(fx.resolve(&source, "./_defaults"), ResolvedImport::local(&sibling));
        assert_eq!(fx.resolve(&source, "../_defaults"), ResolvedImport::local(&parent));
        assert_eq!(fx.resolve(&source, "/_defaults"), ResolvedImport::local(&sibling));
    }

    #[test]
    fn equivalent_references_resolve_identically() {
        let fx = Fixture::new();
        let source = fx.write("top.yaml", "");
        let target = fx.write("base.yaml", "");

        let plain = fx.resolve(&source, "base");
        let dotted = fx.resolve(&source, "./base");
        let roundabout = fx.resolve(&source, "./catalog/../base");
        assert_eq!(plain, ResolvedImport::local(&target));
        assert_eq!(plain, dotted);
        assert_eq!(plain, roundabout);
    }

    #[test]
    fn parent_escape_is_allowed() {
        let fx = Fixture::new();
        let outside = fx.settings.root.join("shared.yaml");
        fs::write(&outside, "").unwrap();
        let source = fx.write("prod.yaml", "");

        assert_eq!(fx.resolve(&source, "../shared"), ResolvedImport::local(outside));
    }

    #[test]
    fn remote_never_touches_disk() {
        let fx = Fixture::new();
        let source = fx.write("prod.yaml", "");
        fx.write("https:/example.com/x.yaml", "");

        assert_eq!(
            fx.resolve(&source, "https://example.com/x.yaml"),
            ResolvedImport::Remote {
                uri: "https://example.com/x.yaml".to_string()
            }
        );
    }

    #[test]
    fn unresolved_and_blank() {
        let fx = Fixture::new();
        let source = fx.write("prod.yaml", "");
        assert_eq!(fx.resolve(&source, "catalog/missing"), ResolvedImport::Unresolved);
        assert_eq!(fx.resolve(&source, "  "), ResolvedImport::Unresolved);
    }

    #[test]
    fn import_source_reads_imports() {
        let fx = Fixture::new();
        let good = fx.write("a.yaml", "import:\n  - b\n  - c\n");
        let bad = fx.write("bad.yaml", "import: [unclosed\n");
        let resolver = PathResolver::new(&fx.settings);

        assert_eq!(ImportSource::imports(&resolver, &good).unwrap(), vec!["b", "c"]);
        assert!(ImportSource::imports(&resolver, &bad).unwrap().is_empty());
        assert!(ImportSource::imports(&resolver, &fx.stacks("missing.yaml")).unwrap().is_empty());
    }
}
