//! Dependency recording.
//!
//! Keeps the outgoing edges the host reports for each module, keyed by the
//! specifier used in the source.

use crate::ids::{NodeId, Target};
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;
use tracing::trace;

/// Outgoing edges of a module: specifier -> target.
pub type EdgeMap = BTreeMap<String, Target>;

/// Adjacency view of the bundled graph, filled from the dependency stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyRecorder {
    edges: HashMap<NodeId, EdgeMap>,
}

impl DependencyRecorder {
    /// Create a new empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the edges of one module. A repeated row replaces the earlier one.
    pub fn record(&mut self, id: NodeId, edges: EdgeMap) {
        trace!(node = %id, count = edges.len(), "Recorded dependencies");
        self.edges.insert(id, edges);
    }

    /// Edges of a module, if the stream reported it.
    #[must_use]
    pub fn edges(&self, id: &NodeId) -> Option<&EdgeMap> {
        self.edges.get(id)
    }

    /// Look up the target of `specifier` from module `from`.
    #[must_use]
    pub fn target(&self, from: &NodeId, specifier: &str) -> Option<&Target> {
        self.edges.get(from).and_then(|edges| edges.get(specifier))
    }

    /// Whether the dependency stream reported this module.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.edges.contains_key(id)
    }

    /// Number of recorded modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
