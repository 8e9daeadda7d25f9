//! Import cycle detection
//!
//! Depth-first traversal of the import graph from a starting file. The
//! `visiting` set holds only the nodes on the current path from the root,
//! so a file reached through two independent branches (a diamond) is not a
//! cycle. Remote imports are terminal, unresolved imports and unparseable
//! documents are dead ends.
//!
//! The walker does no I/O itself; it asks an [`ImportSource`] to read import
//! lists and resolve references, so tests can drive it with in-memory graphs.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::cancel::CancellationToken;
use super::import::{ImportKind, ResolvedImport};

/// Default cap on the number of files on one import path
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Unexpected I/O failure while reading or resolving an import
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Import chain exceeds {limit} files")]
    DepthExceeded { limit: usize, path: Vec<PathBuf> },

    #[error("Import walk cancelled")]
    Cancelled,

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Read access to the import graph
pub trait ImportSource {
    /// Returns the raw import strings of a file.
    ///
    /// Implementations return an empty list for documents that fail to parse.
    fn imports(&self, file: &Path) -> Result<Vec<String>, ResolveError>;

    /// Resolves one reference made from `from`
    fn resolve(&self, from: &Path, reference: &str) -> Result<ResolvedImport, ResolveError>;
}

/// An import cycle: the path from the root to the repeated file, with the
/// repeated file appended again
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CyclePath {
    pub nodes: Vec<PathBuf>,
}

impl CyclePath {
    /// File names along the cycle
    pub fn names(&self) -> Vec<String> {
        self.nodes
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect()
    }

    /// Paths along the cycle, relative to `base` where possible
    pub fn relative_names(&self, base: &Path) -> Vec<String> {
        self.nodes
            .iter()
            .map(|p| p.strip_prefix(base).unwrap_or(p).display().to_string())
            .collect()
    }
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(" → "))
    }
}

/// Per-call traversal state
struct Walk {
    /// Files on the current path, in order
    path: Vec<PathBuf>,

    /// Same files as `path`, for lookup
    visiting: HashSet<PathBuf>,

    /// Files whose every reachable path was explored without finding a cycle
    finished: HashSet<PathBuf>,
}

/// Finds import cycles starting from a file
pub struct ImportWalker<'a, S: ImportSource> {
    source: &'a S,
    max_depth: usize,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, S: ImportSource> ImportWalker<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the first cycle reachable from `root`, if any
    pub fn find_cycle(&self, root: &Path) -> Result<Option<CyclePath>, WalkError> {
        let mut walk = Walk {
            path: Vec::new(),
            visiting: HashSet::new(),
            finished: HashSet::new(),
        };
        self.visit(root, &mut walk)
    }

    /// Returns the first cycle that starts with the edge `root` → `reference`.
    ///
    /// Used to attribute a cycle to one import entry of `root`.
    pub fn find_cycle_via(&self, root: &Path, reference: &str) -> Result<Option<CyclePath>, WalkError> {
        let mut walk = Walk {
            path: vec![root.to_path_buf()],
            visiting: HashSet::from([root.to_path_buf()]),
            finished: HashSet::new(),
        };
        self.follow(root, reference, &mut walk)
    }

    fn check_cancelled(&self) -> Result<(), WalkError> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(WalkError::Cancelled),
            _ => Ok(()),
        }
    }

    fn visit(&self, node: &Path, walk: &mut Walk) -> Result<Option<CyclePath>, WalkError> {
        self.check_cancelled()?;

        if walk.path.len() >= self.max_depth {
            let mut path = walk.path.clone();
            path.push(node.to_path_buf());
            return Err(WalkError::DepthExceeded {
                limit: self.max_depth,
                path,
            });
        }

        walk.path.push(node.to_path_buf());
        walk.visiting.insert(node.to_path_buf());

        for reference in self.source.imports(node)? {
            if let Some(cycle) = self.follow(node, &reference, walk)? {
                return Ok(Some(cycle));
            }
        }

        walk.path.pop();
        walk.visiting.remove(node);
        walk.finished.insert(node.to_path_buf());
        Ok(None)
    }

    fn follow(&self, from: &Path, reference: &str, walk: &mut Walk) -> Result<Option<CyclePath>, WalkError> {
        if matches!(ImportKind::classify(reference), ImportKind::Blank | ImportKind::Remote) {
            return Ok(None);
        }

        let target = match self.source.resolve(from, reference)? {
            ResolvedImport::Local { path } => path,
            ResolvedImport::Remote { .. } | ResolvedImport::Unresolved => return Ok(None),
        };

        if walk.visiting.contains(&target) {
            let mut nodes = walk.path.clone();
            nodes.push(target);
            tracing::debug!(cycle = ?nodes, "import cycle detected");
            return Ok(Some(CyclePath { nodes }));
        }

        // a cycle through a finished node would have been found when it was explored
        if walk.finished.contains(&target) {
            return Ok(None);
        }

        self.visit(&target, walk)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory import graph: file -> raw imports. References resolve to
    /// `/stacks/<reference>.yaml` when that file is known.
    #[derive(Default)]
    pub(crate) struct MemorySource {
        files: HashMap<PathBuf, Vec<String>>,
    }

    impl MemorySource {
        pub(crate) fn with(mut self, name: &str, imports: &[&str]) -> Self {
            self.files.insert(
                Self::path(name),
                imports.iter().map(|s| s.to_string()).collect(),
            );
            self
        }

        pub(crate) fn path(name: &str) -> PathBuf {
            PathBuf::from(format!("/stacks/{}.yaml", name))
        }
    }

    impl ImportSource for MemorySource {
        fn imports(&self, file: &Path) -> Result<Vec<String>, ResolveError> {
            Ok(self.files.get(file).cloned().unwrap_or_default())
        }

        fn resolve(&self, _from: &Path, reference: &str) -> Result<ResolvedImport, ResolveError> {
            let path = Self::path(reference.trim_start_matches("./"));
            if self.files.contains_key(&path) {
                Ok(ResolvedImport::local(path))
            } else {
                Ok(ResolvedImport::Unresolved)
            }
        }
    }

    fn names(cycle: &CyclePath) -> Vec<String> {
        cycle.names()
    }

    #[test]
    fn three_node_cycle() {
        let source = MemorySource::default()
            .with("a", &["b"])
            .with("b", &["c"])
            .with("c", &["a"]);

        let cycle = ImportWalker::new(&source)
            .find_cycle(&MemorySource::path("a"))
            .unwrap()
            .unwrap();

        assert_eq!(names(&cycle), vec!["a.yaml", "b.yaml", "c.yaml", "a.yaml"]);
        assert_eq!(cycle.to_string(), "a.yaml → b.yaml → c.yaml → a.yaml");
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let source = MemorySource::default()
            .with("a", &["b", "c"])
            .with("b", &["d"])
            .with("c", &["d"])
            .with("d", &[]);

        let result = ImportWalker::new(&source).find_cycle(&MemorySource::path("a")).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn cycle_not_through_root() {
        let source = MemorySource::default()
            .with("a", &["b"])
            .with("b", &["c"])
            .with("c", &["b"]);

        let cycle = ImportWalker::new(&source)
            .find_cycle(&MemorySource::path("a"))
            .unwrap()
            .unwrap();
        assert_eq!(names(&cycle), vec!["a.yaml", "b.yaml", "c.yaml", "b.yaml"]);
    }

    #[test]
    fn self_import() {
        let source = MemorySource::default().with("a", &["./a"]);
        let cycle = ImportWalker::new(&source)
            .find_cycle(&MemorySource::path("a"))
            .unwrap()
            .unwrap();
        assert_eq!(names(&cycle), vec!["a.yaml", "a.yaml"]);
    }

    #[test]
    fn remote_blank_and_missing_are_terminal() {
        let source = MemorySource::default()
            .with("a", &["https://example.com/x.yaml", "", "missing", "b"])
            .with("b", &["s3://bucket/a"]);

        let result = ImportWalker::new(&source).find_cycle(&MemorySource::path("a")).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn idempotent() {
        let source = MemorySource::default()
            .with("a", &["b", "c"])
            .with("b", &["d"])
            .with("c", &["d"])
            .with("d", &["c"]);

        let walker = ImportWalker::new(&source);
        let first = walker.find_cycle(&MemorySource::path("a")).unwrap();
        let second = walker.find_cycle(&MemorySource::path("a")).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn cycle_after_finished_sibling() {
        // d is finished via b before c closes a loop through a
        let source = MemorySource::default()
            .with("a", &["b", "c"])
            .with("b", &["d"])
            .with("c", &["d", "a"])
            .with("d", &[]);

        let cycle = ImportWalker::new(&source)
            .find_cycle(&MemorySource::path("a"))
            .unwrap()
            .unwrap();
        assert_eq!(names(&cycle), vec!["a.yaml", "c.yaml", "a.yaml"]);
    }

    #[test]
    fn find_cycle_via_single_edge() {
        let source = MemorySource::default()
            .with("a", &["b", "c"])
            .with("b", &[])
            .with("c", &["a"]);

        let walker = ImportWalker::new(&source);
        let root = MemorySource::path("a");
        assert_eq!(walker.find_cycle_via(&root, "b").unwrap(), None);

        let cycle = walker.find_cycle_via(&root, "c").unwrap().unwrap();
        assert_eq!(names(&cycle), vec!["a.yaml", "c.yaml", "a.yaml"]);
    }

    #[test]
    fn depth_exceeded_on_long_chain() {
        let mut source = MemorySource::default();
        for i in 0..10 {
            let next = format!("n{}", i + 1);
            source = source.with(&format!("n{}", i), &[next.as_str()]);
        }
        source = source.with("n10", &[]);

        let walker = ImportWalker::new(&source).with_max_depth(5);
        let result = walker.find_cycle(&MemorySource::path("n0"));
        match result {
            Err(WalkError::DepthExceeded { limit, path }) => {
                assert_eq!(limit, 5);
                assert_eq!(path.len(), 6);
            }
            other => panic!("expected DepthExceeded, got {:?}", other),
        }

        let unlimited = ImportWalker::new(&source).find_cycle(&MemorySource::path("n0"));
        assert_eq!(unlimited.unwrap(), None);
    }

    #[test]
    fn cancelled_walk() {
        let source = MemorySource::default().with("a", &["b"]).with("b", &[]);
        let token = CancellationToken::new();
        token.cancel();

        let result = ImportWalker::new(&source)
            .with_cancellation(&token)
            .find_cycle(&MemorySource::path("a"));
        assert!(matches!(result, Err(WalkError::Cancelled)));
    }

    #[test]
    fn wide_diamond_lattice_terminates() {
        // 20 layers of 2 nodes, each importing both nodes of the next layer
        let mut source = MemorySource::default();
        for layer in 0..20 {
            let next: Vec<String> = if layer == 19 {
                vec![]
            } else {
                vec![format!("l{}x", layer + 1), format!("l{}y", layer + 1)]
            };
            let refs: Vec<&str> = next.iter().map(String::as_str).collect();
            source = source
                .with(&format!("l{}x", layer), &refs)
                .with(&format!("l{}y", layer), &refs);
        }

        let result = ImportWalker::new(&source).find_cycle(&MemorySource::path("l0x"));
        assert_eq!(result.unwrap(), None);
    }
}
