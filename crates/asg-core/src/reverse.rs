//! Derived index from edge targets back to their sources.
//!
//! For each `(target, edge kind)` pair the index holds the ordered set of
//! source ids pointing at the target through that kind. The data is never
//! authoritative: the factory rebuilds it wholesale from forward edges when
//! the index is enabled, and the linkage choke-point keeps it in step with
//! every attach and detach afterwards.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::edge::EdgeKind;
use crate::id::NodeId;

type SourceSet = SmallVec<[NodeId; 2]>;

/// Target → incoming-source index. Sources are kept sorted by id, unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReverseEdgeIndex {
    map: IndexMap<(NodeId, EdgeKind), SourceSet>,
}

impl ReverseEdgeIndex {
    pub fn new() -> Self {
        ReverseEdgeIndex::default()
    }

    /// Records `source --edge--> target`. Inserting an already-present
    /// source is a no-op (the sources form a set).
    pub fn insert(&mut self, target: NodeId, edge: EdgeKind, source: NodeId) {
        let sources = self.map.entry((target, edge)).or_default();
        if let Err(pos) = sources.binary_search(&source) {
            sources.insert(pos, source);
        }
    }

    /// Removes `source --edge--> target` if present.
    pub fn remove(&mut self, target: NodeId, edge: EdgeKind, source: NodeId) {
        if let Some(sources) = self.map.get_mut(&(target, edge)) {
            if let Ok(pos) = sources.binary_search(&source) {
                sources.remove(pos);
            }
            if sources.is_empty() {
                self.map.swap_remove(&(target, edge));
            }
        }
    }

    /// Drops every entry that mentions `id` on either end. Used by
    /// teardown.
    pub fn purge(&mut self, id: NodeId) {
        self.map.retain(|&(target, _), sources| {
            if target == id {
                return false;
            }
            if let Ok(pos) = sources.binary_search(&id) {
                sources.remove(pos);
            }
            !sources.is_empty()
        });
    }

    /// Ordered sources with an `edge` edge into `target`. Empty if none.
    pub fn sources(&self, target: NodeId, edge: EdgeKind) -> &[NodeId] {
        self.map
            .get(&(target, edge))
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Every `(edge kind, source)` pair pointing into `target`, across all
    /// edge kinds.
    pub fn incoming(&self, target: NodeId) -> impl Iterator<Item = (EdgeKind, NodeId)> + '_ {
        self.map
            .iter()
            .filter(move |((t, _), _)| *t == target)
            .flat_map(|(&(_, edge), sources)| sources.iter().map(move |&s| (edge, s)))
    }

    /// True if no edges are recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total number of recorded `(source, edge, target)` triples.
    pub fn edge_count(&self) -> usize {
        self.map.values().map(|s| s.len()).sum()
    }
}
