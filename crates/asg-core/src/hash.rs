//! Structural hashing: 32-bit content signatures for subtree comparison.
//!
//! A node's signature is a crc32 seeded with its category-qualified kind
//! name, folding in the signature of every declared edge target in declared
//! order. Structurally identical subtrees hash identically regardless of
//! ids, string keys or source positions, which is what clone detection
//! keys on.
//!
//! The cache is a side table owned by the [`StructuralHasher`], not by the
//! factory: concurrent read-only traversal stays possible by giving each
//! reader its own hasher. Invalidation is the caller's job — drop the entry
//! (or the ancestor path) whenever an owned child set changes.

use std::collections::{HashMap, HashSet};

use crate::edge::{edges_of, Cardinality};
use crate::error::AsgError;
use crate::factory::Factory;
use crate::id::NodeId;

/// Sentinel folded for an absent single edge, and returned for a branch
/// that re-enters a node already being hashed.
const CYCLE_SENTINEL: u32 = 0;

/// Switches for [`StructuralHasher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HashConfig {
    /// Also fold scalar attributes (string values and enum tags) into each
    /// node's signature. Off by default: the signature then captures shape
    /// and kind only, deduplicating at the type level.
    pub include_scalars: bool,
}

/// Memoizing structural hasher over one factory's graph.
///
/// The memo table maps ids to finished signatures. A value computed while
/// the cycle guard fired anywhere beneath it is returned but not memoized;
/// only clean computations are trusted as final.
#[derive(Debug, Default)]
pub struct StructuralHasher {
    config: HashConfig,
    cache: HashMap<NodeId, u32>,
}

impl StructuralHasher {
    pub fn new() -> StructuralHasher {
        StructuralHasher::default()
    }

    pub fn with_config(config: HashConfig) -> StructuralHasher {
        StructuralHasher {
            config,
            cache: HashMap::new(),
        }
    }

    /// The structural signature of `id`. Never fails on cycles; only an
    /// unknown id is an error.
    pub fn structural_hash(&mut self, factory: &Factory, id: NodeId) -> Result<u32, AsgError> {
        let mut in_progress = HashSet::new();
        let (hash, _clean) = self.hash_node(factory, id, &mut in_progress)?;
        Ok(hash)
    }

    /// Drops the memoized signature of one node.
    pub fn invalidate(&mut self, id: NodeId) {
        self.cache.remove(&id);
    }

    /// Drops the memoized signatures of `id` and every containment
    /// ancestor. Call after a child-set mutation so stale parent
    /// signatures cannot be served.
    pub fn invalidate_path(&mut self, factory: &Factory, id: NodeId) -> Result<(), AsgError> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            self.cache.remove(&current);
            cursor = factory.get(current)?.parent_link().map(|l| l.parent);
        }
        Ok(())
    }

    /// Drops every memoized signature.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of memoized entries.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Returns `(hash, clean)`; `clean` is false when the cycle guard fired
    /// in this subtree, in which case the result is not memoized.
    fn hash_node(
        &mut self,
        factory: &Factory,
        id: NodeId,
        in_progress: &mut HashSet<NodeId>,
    ) -> Result<(u32, bool), AsgError> {
        if let Some(&hash) = self.cache.get(&id) {
            return Ok((hash, true));
        }
        if !in_progress.insert(id) {
            return Ok((CYCLE_SENTINEL, false));
        }

        let node = factory.get(id)?;
        let mut crc = crc32fast::Hasher::new();
        crc.update(node.kind().qualified_name().as_bytes());

        if self.config.include_scalars {
            for (_, key) in node.data.string_attrs() {
                match key {
                    // Values, not keys: keys are renumbered by compaction
                    // and persistence.
                    Some(key) => crc.update(factory.strings().lookup(key)?.as_bytes()),
                    None => crc.update(&[0]),
                }
            }
            for (_, tag) in node.data.enum_attrs() {
                crc.update(&tag.to_le_bytes());
            }
        }

        let mut clean = true;
        for decl in edges_of(node.kind()) {
            match decl.cardinality {
                Cardinality::Single => {
                    let child = match factory.single_target(id, decl.kind)? {
                        Some(child) => {
                            let (hash, child_clean) = self.hash_node(factory, child, in_progress)?;
                            clean &= child_clean;
                            hash
                        }
                        None => CYCLE_SENTINEL,
                    };
                    crc.update(&child.to_le_bytes());
                }
                Cardinality::Multi => {
                    let children = factory.multi_targets(id, decl.kind)?;
                    crc.update(&(children.len() as u32).to_le_bytes());
                    for child in children {
                        let (hash, child_clean) = self.hash_node(factory, child, in_progress)?;
                        clean &= child_clean;
                        crc.update(&hash.to_le_bytes());
                    }
                }
            }
        }

        in_progress.remove(&id);
        let hash = crc.finalize();
        if clean {
            self.cache.insert(id, hash);
        }
        Ok((hash, clean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;
    use crate::kind::NodeKind;

    /// While(cond = Literal, body = Block[...n returns]).
    fn while_tree(factory: &mut Factory, statements: usize) -> NodeId {
        let w = factory.create(NodeKind::While);
        let cond = factory.create(NodeKind::Literal);
        let body = factory.create(NodeKind::Block);
        factory.set_edge(w, EdgeKind::Condition, Some(cond)).unwrap();
        factory.set_edge(w, EdgeKind::Body, Some(body)).unwrap();
        for _ in 0..statements {
            let ret = factory.create(NodeKind::Return);
            factory.add_edge(body, EdgeKind::Statements, ret).unwrap();
        }
        w
    }

    #[test]
    fn hash_is_idempotent_and_memoized() {
        let mut factory = Factory::new();
        let w = while_tree(&mut factory, 2);
        let mut hasher = StructuralHasher::new();

        let first = hasher.structural_hash(&factory, w).unwrap();
        let cached = hasher.cached();
        let second = hasher.structural_hash(&factory, w).unwrap();

        assert_eq!(first, second);
        assert_eq!(hasher.cached(), cached, "second call served from cache");
        assert_ne!(first, 0, "real signatures never collide with the sentinel");
    }

    #[test]
    fn identical_shapes_hash_identically_across_factories() {
        let mut a = Factory::new();
        let mut b = Factory::new();
        // Pad b so the ids differ; the signatures must not.
        let _pad = b.create(NodeKind::Literal);
        let wa = while_tree(&mut a, 3);
        let wb = while_tree(&mut b, 3);

        let mut hasher = StructuralHasher::new();
        let ha = hasher.structural_hash(&a, wa).unwrap();
        let mut hasher_b = StructuralHasher::new();
        let hb = hasher_b.structural_hash(&b, wb).unwrap();
        assert_eq!(ha, hb);
    }

    #[test]
    fn different_shapes_hash_differently() {
        let mut factory = Factory::new();
        let two = while_tree(&mut factory, 2);
        let three = while_tree(&mut factory, 3);

        let mut hasher = StructuralHasher::new();
        let h2 = hasher.structural_hash(&factory, two).unwrap();
        let h3 = hasher.structural_hash(&factory, three).unwrap();
        assert_ne!(h2, h3);
    }

    #[test]
    fn absent_and_present_single_edges_differ() {
        let mut factory = Factory::new();
        let bare = factory.create(NodeKind::Return);
        let full = factory.create(NodeKind::Return);
        let value = factory.create(NodeKind::Literal);
        factory.set_edge(full, EdgeKind::Value, Some(value)).unwrap();

        let mut hasher = StructuralHasher::new();
        let hb = hasher.structural_hash(&factory, bare).unwrap();
        let hf = hasher.structural_hash(&factory, full).unwrap();
        assert_ne!(hb, hf);
    }

    #[test]
    fn sibling_change_only_affects_ancestors() {
        let mut factory = Factory::new();
        let block = factory.create(NodeKind::Block);
        let left = factory.create(NodeKind::Return);
        factory.add_edge(block, EdgeKind::Statements, left).unwrap();

        let mut before = StructuralHasher::new();
        let left_before = before.structural_hash(&factory, left).unwrap();
        let block_before = before.structural_hash(&factory, block).unwrap();

        let sibling = factory.create(NodeKind::ExpressionStatement);
        factory.add_edge(block, EdgeKind::Statements, sibling).unwrap();

        let mut after = StructuralHasher::new();
        assert_eq!(after.structural_hash(&factory, left).unwrap(), left_before);
        assert_ne!(after.structural_hash(&factory, block).unwrap(), block_before);
    }

    #[test]
    fn reference_cycle_terminates_with_stable_nonzero_hash() {
        let mut factory = Factory::new();
        // Function owns Block owns ExpressionStatement owns Identifier;
        // the identifier's reference edge points back at the function.
        let func = factory.create(NodeKind::Function);
        let block = factory.create(NodeKind::Block);
        let stmt = factory.create(NodeKind::ExpressionStatement);
        let ident = factory.create(NodeKind::Identifier);
        factory.set_edge(func, EdgeKind::Body, Some(block)).unwrap();
        factory.add_edge(block, EdgeKind::Statements, stmt).unwrap();
        factory.set_edge(stmt, EdgeKind::Expression, Some(ident)).unwrap();
        factory.set_edge(ident, EdgeKind::Declaration, Some(func)).unwrap();

        let mut hasher = StructuralHasher::new();
        let first = hasher.structural_hash(&factory, func).unwrap();
        let second = hasher.structural_hash(&factory, func).unwrap();
        assert_ne!(first, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn cycle_tainted_inner_values_are_not_memoized() {
        let mut factory = Factory::new();
        let ident = factory.create(NodeKind::Identifier);
        let func = factory.create(NodeKind::Function);
        let block = factory.create(NodeKind::Block);
        let stmt = factory.create(NodeKind::ExpressionStatement);
        factory.set_edge(func, EdgeKind::Body, Some(block)).unwrap();
        factory.add_edge(block, EdgeKind::Statements, stmt).unwrap();
        factory.set_edge(stmt, EdgeKind::Expression, Some(ident)).unwrap();
        factory.set_edge(ident, EdgeKind::Declaration, Some(func)).unwrap();

        let mut hasher = StructuralHasher::new();
        // Hashing from inside the cycle taints everything on the loop; no
        // entry may be cached with the sentinel folded in at the top.
        let from_ident = hasher.structural_hash(&factory, ident).unwrap();
        assert_eq!(hasher.cached(), 0);
        // A fresh computation from the same entry point agrees.
        assert_eq!(hasher.structural_hash(&factory, ident).unwrap(), from_ident);
    }

    #[test]
    fn scalars_fold_only_when_configured() {
        let mut factory = Factory::new();
        let a = factory.create(NodeKind::Identifier);
        let b = factory.create(NodeKind::Identifier);
        factory.set_name(a, "x").unwrap();
        factory.set_name(b, "y").unwrap();

        let mut plain = StructuralHasher::new();
        assert_eq!(
            plain.structural_hash(&factory, a).unwrap(),
            plain.structural_hash(&factory, b).unwrap()
        );

        let mut scalar = StructuralHasher::with_config(HashConfig { include_scalars: true });
        assert_ne!(
            scalar.structural_hash(&factory, a).unwrap(),
            scalar.structural_hash(&factory, b).unwrap()
        );
    }

    #[test]
    fn invalidate_path_clears_node_and_ancestors() {
        let mut factory = Factory::new();
        let w = while_tree(&mut factory, 1);
        let body = factory.single_target(w, EdgeKind::Body).unwrap().unwrap();

        let mut hasher = StructuralHasher::new();
        hasher.structural_hash(&factory, w).unwrap();
        let cached = hasher.cached();
        assert!(cached >= 3);

        hasher.invalidate_path(&factory, body).unwrap();
        // The body and the while are gone; the condition literal stays.
        assert_eq!(hasher.cached(), cached - 2);
    }
}
