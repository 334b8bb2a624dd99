//! Solver configuration.

use serde::{Deserialize, Serialize};

/// Blocks with more normal predecessors than this keep their entry state
/// as an incrementally joined accumulator.
pub const DEFAULT_ENTRY_CACHE_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataflowOptions {
    /// Walk straight-line chains of blocks as a single unit. Blocks inside
    /// a chain get no exit state of their own.
    pub collapse_trivial_edges: bool,

    pub entry_cache_threshold: usize,
}

impl Default for DataflowOptions {
    fn default() -> Self {
        Self {
            collapse_trivial_edges: true,
            entry_cache_threshold: DEFAULT_ENTRY_CACHE_THRESHOLD,
        }
    }
}

impl DataflowOptions {
    /// Options recording an exit state for every reachable block.
    #[must_use]
    pub fn no_collapse() -> Self {
        Self::default().with_collapse(false)
    }

    #[must_use]
    pub fn with_collapse(mut self, collapse: bool) -> Self {
        self.collapse_trivial_edges = collapse;
        self
    }

    #[must_use]
    pub fn with_entry_cache_threshold(mut self, threshold: usize) -> Self {
        self.entry_cache_threshold = threshold;
        self
    }
}
