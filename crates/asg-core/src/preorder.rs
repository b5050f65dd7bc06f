//! Depth-first pre/post-order traversal over the containment forest.
//!
//! [`Preorder`] drives a [`Visitor`] over owning edges in declared order:
//! the pre-order hook fires, the children are walked, the post-order hook
//! fires. Filtered nodes are skipped entirely, subtree included. Reference
//! edges are not followed unless [`Preorder::follow_references`] turns them
//! on, in which case a visited set guards against the cycles reference
//! edges are allowed to form.

use std::collections::HashSet;

use crate::edge::{edges_of, Cardinality};
use crate::error::AsgError;
use crate::factory::Factory;
use crate::id::NodeId;
use crate::visitor::{dispatch, dispatch_end, Visitor};

/// Traversal driver. Construct, optionally flip modes, then `run`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preorder {
    follow_references: bool,
}

impl Preorder {
    pub fn new() -> Preorder {
        Preorder::default()
    }

    /// Also descend through reference edges. Cycle-guarded: each node is
    /// entered at most once per run.
    pub fn follow_references(mut self, on: bool) -> Preorder {
        self.follow_references = on;
        self
    }

    /// Walks every containment root in ascending id order.
    pub fn run<V: Visitor + ?Sized>(
        &self,
        factory: &Factory,
        visitor: &mut V,
    ) -> Result<(), AsgError> {
        let roots: Vec<NodeId> = factory
            .nodes()
            .filter(|n| n.parent_link().is_none())
            .map(|n| n.id)
            .collect();
        let mut visited = HashSet::new();
        for root in roots {
            self.walk(factory, root, visitor, &mut visited)?;
        }
        Ok(())
    }

    /// Walks the subtree rooted at `start`. Fails with
    /// [`AsgError::DanglingReference`] if `start` is unknown; a filtered
    /// start is silently skipped.
    pub fn run_from<V: Visitor + ?Sized>(
        &self,
        factory: &Factory,
        start: NodeId,
        visitor: &mut V,
    ) -> Result<(), AsgError> {
        let mut visited = HashSet::new();
        self.walk(factory, start, visitor, &mut visited)
    }

    fn walk<V: Visitor + ?Sized>(
        &self,
        factory: &Factory,
        id: NodeId,
        visitor: &mut V,
        visited: &mut HashSet<NodeId>,
    ) -> Result<(), AsgError> {
        let node = factory.get(id)?;
        if node.is_filtered() {
            return Ok(());
        }
        if self.follow_references && !visited.insert(id) {
            return Ok(());
        }

        dispatch(visitor, node);
        for decl in edges_of(node.kind()) {
            if !decl.semantics.is_owning() && !self.follow_references {
                continue;
            }
            match decl.cardinality {
                Cardinality::Single => {
                    // The public view already hides filtered targets.
                    if let Some(child) = factory.single_target(id, decl.kind)? {
                        self.walk(factory, child, visitor, visited)?;
                    }
                }
                Cardinality::Multi => {
                    for child in factory.multi_targets(id, decl.kind)? {
                        self.walk(factory, child, visitor, visited)?;
                    }
                }
            }
        }
        dispatch_end(visitor, node);
        Ok(())
    }
}
