//! Repository-wide import graph
//!
//! Holds one node per stack file and one edge per resolved local import.
//! Used for "imported by" queries and whole-repository cycle summaries.
//! Uses petgraph for graph operations.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::cancel::CancellationToken;
use super::import::{ImportKind, ResolvedImport};
use super::walk::{ImportSource, WalkError};

/// A directed graph of stack files: edge `a -> b` means `a` imports `b`
#[derive(Debug, Default)]
pub struct ImportGraph {
    /// The underlying directed graph
    graph: DiGraph<PathBuf, ()>,

    /// Map from file path to node index
    node_map: HashMap<PathBuf, NodeIndex>,
}

impl ImportGraph {
    /// Creates an empty import graph
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Builds the graph for `files`, following each file's local imports.
    ///
    /// Imported files outside `files` are added as nodes too, so the graph
    /// covers every file reachable in one step.
    pub fn build<'a, S: ImportSource>(
        source: &S,
        files: impl IntoIterator<Item = &'a Path>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Self, WalkError> {
        let mut graph = Self::new();

        for file in files {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(WalkError::Cancelled);
            }

            graph.add_file(file.to_path_buf());
            for reference in source.imports(file)? {
                if matches!(ImportKind::classify(&reference), ImportKind::Blank | ImportKind::Remote) {
                    continue;
                }
                if let ResolvedImport::Local { path } = source.resolve(file, &reference)? {
                    graph.add_import(file, path);
                }
            }
        }

        Ok(graph)
    }

    /// Adds a file to the graph
    pub fn add_file(&mut self, file: PathBuf) -> NodeIndex {
        if let Some(idx) = self.node_map.get(&file) {
            return *idx;
        }
        let idx = self.graph.add_node(file.clone());
        self.node_map.insert(file, idx);
        idx
    }

    /// Adds an import edge, adding either file if missing
    pub fn add_import(&mut self, from: &Path, to: PathBuf) {
        let from_idx = self.add_file(from.to_path_buf());
        let to_idx = self.add_file(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Files imported by `file`, sorted
    pub fn imports_of(&self, file: &Path) -> Vec<PathBuf> {
        self.neighbors(file, Direction::Outgoing)
    }

    /// Files that import `file`, sorted
    pub fn importers_of(&self, file: &Path) -> Vec<PathBuf> {
        self.neighbors(file, Direction::Incoming)
    }

    fn neighbors(&self, file: &Path, direction: Direction) -> Vec<PathBuf> {
        let Some(idx) = self.node_map.get(file) else {
            return vec![];
        };

        let mut files: Vec<PathBuf> = self
            .graph
            .neighbors_directed(*idx, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect();
        files.sort();
        files
    }

    /// Groups of files that import each other, directly or transitively.
    ///
    /// Each group is sorted, and groups are sorted by their first file.
    pub fn cycles(&self) -> Vec<Vec<PathBuf>> {
        let mut groups: Vec<Vec<PathBuf>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.graph.find_edge(scc[0], scc[0]).is_some()
            })
            .map(|scc| {
                let mut files: Vec<PathBuf> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                files.sort();
                files
            })
            .collect();
        groups.sort();
        groups
    }

    /// Returns true if the graph contains the file
    pub fn contains(&self, file: &Path) -> bool {
        self.node_map.contains_key(file)
    }

    /// Returns the number of files in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Returns the number of import edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
