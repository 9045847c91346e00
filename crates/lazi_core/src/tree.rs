//! Dependency trees for diagnostics.
//!
//! Records created while another record was materializing become its
//! dependencies. [`Resolver::dependency_tree`] renders those edges as a
//! nested name map, optionally restricted by a [`TreeFilter`].

use core::fmt;

use hashbrown::HashSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::materializer::State;
use crate::record::Record;
use crate::resolver::Resolver;

/// Which records appear in a dependency tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TreeFilter {
    /// Every registered record.
    #[default]
    All,
    /// Records in `LOADED`.
    Materialized,
    /// Records created but not yet run (`CREATED` or `LAZY`).
    Pending,
    /// Records behind a deferring proxy.
    Hooked,
}

impl TreeFilter {
    /// Returns `true` if `record` passes the filter.
    #[must_use]
    pub fn matches(self, record: &Record) -> bool {
        match self {
            TreeFilter::All => true,
            TreeFilter::Materialized => record.state() == State::Loaded,
            TreeFilter::Pending => record.state().is_pending(),
            TreeFilter::Hooked => record.is_hooked(),
        }
    }
}

/// Nested `name → children` map. Serializes as nested JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyTree(IndexMap<String, DependencyTree>);

impl DependencyTree {
    /// Returns the subtree under `name` at this level.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DependencyTree> {
        self.0.get(name)
    }

    /// Returns the names at this level, in resolution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of entries at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no entries at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the total number of entries at every level.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.values().map(|child| 1 + child.count()).sum()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        for (name, child) in &self.0 {
            writeln!(f, "{:indent$}{name}", "", indent = depth * 2)?;
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for DependencyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

impl Resolver {
    /// Builds the dependency forest over registered records that pass
    /// `filter`.
    ///
    /// Roots are records without a live parent, or whose parent is filtered
    /// out.
    #[must_use]
    pub fn dependency_tree(&self, filter: TreeFilter) -> DependencyTree {
        let records: Vec<Record> = self
            .records()
            .into_iter()
            .filter(|record| filter.matches(record))
            .collect();
        let included = |record: &Record| records.iter().any(|r| r.ptr_eq(record));

        let mut visited = HashSet::new();
        let mut tree = DependencyTree::default();
        for record in &records {
            let is_root = record.parent().is_none_or(|parent| !included(&parent));
            if is_root {
                let children = subtree(record, &included, &mut visited);
                tree.0.insert(record.name().to_owned(), children);
            }
        }
        tree
    }
}

fn subtree(
    record: &Record,
    included: &dyn Fn(&Record) -> bool,
    visited: &mut HashSet<String>,
) -> DependencyTree {
    let mut tree = DependencyTree::default();
    if !visited.insert(record.name().to_owned()) {
        return tree;
    }
    for dependency in record.dependencies() {
        if included(&dependency) && !visited.contains(dependency.name()) {
            let child = subtree(&dependency, included, visited);
            tree.0.insert(dependency.name().to_owned(), child);
        }
    }
    tree
}
