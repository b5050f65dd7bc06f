//! The factory: arena-backed node store and the linkage choke-point.
//!
//! All nodes live in one arena (`Vec<Option<Node>>`) indexed by [`NodeId`].
//! Slot 0 is permanently empty so that id 0 can serve as the on-wire
//! "absent" sentinel; ids are allocated monotonically and never reused,
//! destroyed nodes leave a permanent hole.
//!
//! Every linkage mutation — attach, replace, append, detach — goes through
//! `set_edge`/`add_edge`/`remove_edge` here. That single choke-point is what
//! enforces the containment invariants: validation before mutation,
//! detach-before-attach re-parenting, parent links kept in step with owning
//! slots, and the reverse index updated together with every forward change.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::edge::{decl_of, edges_of, Cardinality, EdgeDecl, EdgeKind};
use crate::error::AsgError;
use crate::id::{NodeId, StringKey};
use crate::kind::NodeKind;
use crate::node::{BinaryOperator, LiteralKind, Node, NodeData, ParentLink};
use crate::position::SourcePosition;
use crate::reverse::ReverseEdgeIndex;
use crate::strings::StringTable;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Construction-time switches for a [`Factory`]. Both are also runtime
/// togglable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryOptions {
    /// Maintain the reverse-edge index from the start.
    pub reverse_edges: bool,
    /// `exists()` reports filtered nodes as nonexistent.
    pub filtered_as_missing: bool,
}

impl Default for FactoryOptions {
    fn default() -> Self {
        FactoryOptions {
            reverse_edges: false,
            filtered_as_missing: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Arena-backed node store owning every node and the string table.
///
/// Serde note: the reverse-edge index is derived data and is not
/// serialized; a deserialized factory comes back with the index disabled
/// and [`Factory::enable_reverse_edges`] rebuilds it on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factory {
    /// Slot `i` backs `NodeId(i)`. Slot 0 stays empty forever.
    arena: Vec<Option<Node>>,
    strings: StringTable,
    filtered_as_missing: bool,
    /// `Some` = enabled and consistent with forward edges.
    #[serde(skip)]
    reverse: Option<ReverseEdgeIndex>,
}

impl Default for Factory {
    fn default() -> Self {
        Factory::new()
    }
}

impl Factory {
    /// Empty factory with default options.
    pub fn new() -> Factory {
        Factory::with_options(FactoryOptions::default())
    }

    /// Empty factory with the given options.
    pub fn with_options(options: FactoryOptions) -> Factory {
        Factory {
            arena: vec![None],
            strings: StringTable::new(),
            filtered_as_missing: options.filtered_as_missing,
            reverse: options.reverse_edges.then(ReverseEdgeIndex::new),
        }
    }

    // -------------------------------------------------------------------
    // Node lifecycle
    // -------------------------------------------------------------------

    /// Creates a node of `kind` and returns its id. Ids are monotonic and
    /// never reused, even after `destroy`.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.arena.len() as u32);
        self.arena.push(Some(Node::new(id, kind)));
        id
    }

    /// Materializes a node under an explicit id. Only ids beyond every id
    /// this factory has issued are accepted, which keeps retired ids
    /// unrecyclable. Used by the persistence layer when rebuilding a store.
    pub fn create_with_id(&mut self, id: NodeId, kind: NodeKind) -> Result<NodeId, AsgError> {
        if (id.0 as usize) < self.arena.len() {
            return Err(AsgError::DuplicateNodeId { id });
        }
        self.arena.resize_with(id.0 as usize, || None);
        self.arena.push(Some(Node::new(id, kind)));
        Ok(id)
    }

    /// Whether `id` currently resolves. Filtered nodes count as missing
    /// when the `filtered_as_missing` toggle is on.
    pub fn exists(&self, id: NodeId) -> bool {
        match self.slot(id) {
            Some(node) => !(self.filtered_as_missing && node.base.filtered),
            None => false,
        }
    }

    /// Resolves a node. Filtered nodes resolve; only unknown ids fail.
    pub fn get(&self, id: NodeId) -> Result<&Node, AsgError> {
        self.slot(id).ok_or(AsgError::DanglingReference { id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, AsgError> {
        self.slot_mut(id).ok_or(AsgError::DanglingReference { id })
    }

    /// Marks or unmarks a node as filtered (logically deleted).
    pub fn set_filtered(&mut self, id: NodeId, filtered: bool) -> Result<(), AsgError> {
        self.get_mut(id)?.base.filtered = filtered;
        Ok(())
    }

    pub fn is_filtered(&self, id: NodeId) -> Result<bool, AsgError> {
        Ok(self.get(id)?.base.filtered)
    }

    /// Runtime toggle for "filtered counts as nonexistent" in `exists()`.
    pub fn set_filtered_as_missing(&mut self, on: bool) {
        self.filtered_as_missing = on;
    }

    pub fn filtered_as_missing(&self) -> bool {
        self.filtered_as_missing
    }

    /// Unfiltered nodes, ascending id. Filtered nodes never appear here.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.arena.iter().flatten().filter(|n| !n.base.filtered)
    }

    /// Every stored node including filtered ones, ascending id. This is the
    /// persistence and bookkeeping view, not the public query view.
    pub fn stored_nodes(&self) -> impl Iterator<Item = &Node> {
        self.arena.iter().flatten()
    }

    /// Number of stored nodes, filtered included.
    pub fn node_count(&self) -> usize {
        self.stored_nodes().count()
    }

    /// The store's root: the lowest-id compilation unit, if one exists.
    pub fn root(&self) -> Option<NodeId> {
        self.stored_nodes()
            .find(|n| n.kind() == NodeKind::CompilationUnit)
            .map(|n| n.id)
    }

    /// Destroys a node and its whole owned subtree: every edge touching the
    /// subtree is detached (children before parents) and the ids are
    /// retired. Fails only if `id` is unknown; teardown itself cannot fail.
    pub fn destroy(&mut self, id: NodeId) -> Result<(), AsgError> {
        if self.slot(id).is_none() {
            return Err(AsgError::DanglingReference { id });
        }

        let mut doomed = Vec::new();
        self.collect_owned_subtree(id, &mut doomed);
        let doomed_set: HashSet<NodeId> = doomed.iter().copied().collect();

        // Detach the subtree root from its surviving parent first so the
        // parent never holds a retired id.
        self.detach_current_owner(id);

        // Clear forward edges from survivors into the doomed set.
        if let Some(rev) = self.reverse.as_ref() {
            let mut incoming = Vec::new();
            for &d in &doomed {
                for (edge, source) in rev.incoming(d) {
                    if !doomed_set.contains(&source) {
                        incoming.push((source, edge, d));
                    }
                }
            }
            for (source, edge, target) in incoming {
                self.clear_forward_occurrences(source, edge, target);
            }
        } else {
            let survivors: Vec<NodeId> = self
                .stored_nodes()
                .map(|n| n.id)
                .filter(|i| !doomed_set.contains(i))
                .collect();
            for s in survivors {
                self.clear_edges_into_set(s, &doomed_set);
            }
        }

        // Retire the subtree, children before parents, and purge the
        // reverse index of every mention.
        for &d in &doomed {
            if let Some(rev) = self.reverse.as_mut() {
                rev.purge(d);
            }
            self.arena[d.0 as usize] = None;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Linkage choke-point
    // -------------------------------------------------------------------

    /// Sets a single edge, or appends to a multi edge when `edge` has multi
    /// cardinality. `target = None` is the "reset to absent" request: it
    /// fails with [`AsgError::CannotClearRequiredEdge`] on an occupied
    /// single slot, is a no-op on an empty one, and does nothing for multi
    /// slots (elements are detached individually via [`Factory::remove_edge`]).
    pub fn set_edge(
        &mut self,
        source: NodeId,
        edge: EdgeKind,
        target: Option<NodeId>,
    ) -> Result<(), AsgError> {
        let decl = self.declared(source, edge)?;
        match target {
            Some(target) => match decl.cardinality {
                Cardinality::Single => self.attach_single(source, decl, target),
                Cardinality::Multi => self.append_multi(source, decl, target),
            },
            None => {
                if decl.cardinality == Cardinality::Single {
                    let occupied = self
                        .slot(source)
                        .and_then(|n| n.data.single_slot(edge))
                        .flatten()
                        .is_some();
                    if occupied {
                        return Err(AsgError::CannotClearRequiredEdge { node: source, edge });
                    }
                }
                Ok(())
            }
        }
    }

    /// Appends to an ordered-multi edge (or sets a single edge when `edge`
    /// has single cardinality). Duplicate appends on a unique multi edge
    /// are silent no-ops.
    pub fn add_edge(&mut self, source: NodeId, edge: EdgeKind, target: NodeId) -> Result<(), AsgError> {
        let decl = self.declared(source, edge)?;
        match decl.cardinality {
            Cardinality::Single => self.attach_single(source, decl, target),
            Cardinality::Multi => self.append_multi(source, decl, target),
        }
    }

    /// Detaches `(source, edge, target)` if that exact edge exists; no-op
    /// otherwise. For multi edges only the first occurrence is removed and
    /// the remaining order is preserved.
    pub fn remove_edge(
        &mut self,
        source: NodeId,
        edge: EdgeKind,
        target: NodeId,
    ) -> Result<(), AsgError> {
        let decl = self.declared(source, edge)?;
        match decl.cardinality {
            Cardinality::Single => {
                let current = self
                    .slot(source)
                    .and_then(|n| n.data.single_slot(edge))
                    .flatten();
                if current != Some(target) {
                    return Ok(());
                }
                if let Some(node) = self.slot_mut(source) {
                    if let Some(slot) = node.data.single_slot_mut(edge) {
                        *slot = None;
                    }
                }
                self.unlink_target(source, decl, target);
            }
            Cardinality::Multi => {
                let Some(pos) = self
                    .slot(source)
                    .and_then(|n| n.data.multi_slot(edge))
                    .and_then(|v| v.iter().position(|&t| t == target))
                else {
                    return Ok(());
                };
                let mut still_present = false;
                if let Some(node) = self.slot_mut(source) {
                    if let Some(vec) = node.data.multi_slot_mut(edge) {
                        vec.remove(pos);
                        still_present = vec.contains(&target);
                    }
                }
                if !still_present {
                    self.unlink_target(source, decl, target);
                }
            }
        }
        Ok(())
    }

    /// Resolves a single edge through the public view: filtered targets
    /// read as absent.
    pub fn single_target(&self, source: NodeId, edge: EdgeKind) -> Result<Option<NodeId>, AsgError> {
        let node = self.get(source)?;
        let slot = node
            .data
            .single_slot(edge)
            .ok_or(AsgError::UndeclaredEdge {
                kind: node.kind(),
                edge,
            })?;
        Ok(slot.filter(|&t| !self.target_filtered(t)))
    }

    /// Resolves a multi edge through the public view: filtered targets are
    /// skipped, order otherwise preserved.
    pub fn multi_targets(&self, source: NodeId, edge: EdgeKind) -> Result<Vec<NodeId>, AsgError> {
        let node = self.get(source)?;
        let vec = node.data.multi_slot(edge).ok_or(AsgError::UndeclaredEdge {
            kind: node.kind(),
            edge,
        })?;
        Ok(vec
            .iter()
            .copied()
            .filter(|&t| !self.target_filtered(t))
            .collect())
    }

    // -------------------------------------------------------------------
    // Reverse-edge index
    // -------------------------------------------------------------------

    /// Enables or disables the reverse index. Enabling rebuilds it from the
    /// forward edges; disabling drops it.
    pub fn enable_reverse_edges(&mut self, enabled: bool) {
        if !enabled {
            self.reverse = None;
            return;
        }
        if self.reverse.is_some() {
            return;
        }
        let mut index = ReverseEdgeIndex::new();
        for node in self.stored_nodes() {
            for decl in edges_of(node.kind()) {
                match decl.cardinality {
                    Cardinality::Single => {
                        if let Some(Some(target)) = node.data.single_slot(decl.kind) {
                            index.insert(target, decl.kind, node.id);
                        }
                    }
                    Cardinality::Multi => {
                        if let Some(vec) = node.data.multi_slot(decl.kind) {
                            for &target in vec {
                                index.insert(target, decl.kind, node.id);
                            }
                        }
                    }
                }
            }
        }
        self.reverse = Some(index);
    }

    pub fn reverse_edges_enabled(&self) -> bool {
        self.reverse.is_some()
    }

    /// Sources with an `edge` edge into `target`, ordered by id. Filtered
    /// sources are excluded from the result.
    pub fn reverse_lookup(&self, target: NodeId, edge: EdgeKind) -> Result<Vec<NodeId>, AsgError> {
        let index = self.reverse.as_ref().ok_or(AsgError::IndexDisabled)?;
        if self.slot(target).is_none() {
            return Err(AsgError::DanglingReference { id: target });
        }
        Ok(index
            .sources(target, edge)
            .iter()
            .copied()
            .filter(|&s| !self.target_filtered(s))
            .collect())
    }

    // -------------------------------------------------------------------
    // Scalar attributes
    // -------------------------------------------------------------------

    /// Attaches a source position to a node.
    pub fn set_position(&mut self, id: NodeId, position: SourcePosition) -> Result<(), AsgError> {
        self.get_mut(id)?.base.position = Some(position);
        Ok(())
    }

    /// Fails with [`AsgError::UnknownAttribute`] unless the node's payload
    /// satisfies `carries`. Guards the scalar setters.
    fn require_attr(
        &self,
        id: NodeId,
        attribute: &'static str,
        carries: impl FnOnce(&NodeData) -> bool,
    ) -> Result<(), AsgError> {
        let node = self.get(id)?;
        if carries(&node.data) {
            Ok(())
        } else {
            Err(AsgError::UnknownAttribute {
                kind: node.kind(),
                attribute,
            })
        }
    }

    /// Sets the `name` attribute (Function, Parameter, Identifier).
    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<(), AsgError> {
        self.require_attr(id, "name", |data| {
            matches!(
                data,
                NodeData::Function(_) | NodeData::Parameter(_) | NodeData::Identifier(_)
            )
        })?;
        let key = self.strings.intern(name);
        match &mut self.get_mut(id)?.data {
            NodeData::Function(n) => n.name = Some(key),
            NodeData::Parameter(n) => n.name = Some(key),
            NodeData::Identifier(n) => n.name = Some(key),
            _ => unreachable!("kind checked above"),
        }
        Ok(())
    }

    /// The `name` attribute as an interned key.
    pub fn name_key(&self, id: NodeId) -> Result<Option<StringKey>, AsgError> {
        let node = self.get(id)?;
        match &node.data {
            NodeData::Function(n) => Ok(n.name),
            NodeData::Parameter(n) => Ok(n.name),
            NodeData::Identifier(n) => Ok(n.name),
            _ => Err(AsgError::UnknownAttribute {
                kind: node.kind(),
                attribute: "name",
            }),
        }
    }

    /// The `name` attribute resolved to its string.
    pub fn name(&self, id: NodeId) -> Result<Option<&str>, AsgError> {
        match self.name_key(id)? {
            Some(key) => Ok(Some(self.strings.lookup(key)?)),
            None => Ok(None),
        }
    }

    /// Sets the `path` attribute (CompilationUnit).
    pub fn set_path(&mut self, id: NodeId, path: &str) -> Result<(), AsgError> {
        self.require_attr(id, "path", |data| matches!(data, NodeData::CompilationUnit(_)))?;
        let key = self.strings.intern(path);
        if let NodeData::CompilationUnit(n) = &mut self.get_mut(id)?.data {
            n.path = Some(key);
        }
        Ok(())
    }

    pub fn path_key(&self, id: NodeId) -> Result<Option<StringKey>, AsgError> {
        let node = self.get(id)?;
        match &node.data {
            NodeData::CompilationUnit(n) => Ok(n.path),
            _ => Err(AsgError::UnknownAttribute {
                kind: node.kind(),
                attribute: "path",
            }),
        }
    }

    pub fn path(&self, id: NodeId) -> Result<Option<&str>, AsgError> {
        match self.path_key(id)? {
            Some(key) => Ok(Some(self.strings.lookup(key)?)),
            None => Ok(None),
        }
    }

    /// Sets the `text` attribute (Literal).
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), AsgError> {
        self.require_attr(id, "text", |data| matches!(data, NodeData::Literal(_)))?;
        let key = self.strings.intern(text);
        if let NodeData::Literal(n) = &mut self.get_mut(id)?.data {
            n.text = Some(key);
        }
        Ok(())
    }

    pub fn text_key(&self, id: NodeId) -> Result<Option<StringKey>, AsgError> {
        let node = self.get(id)?;
        match &node.data {
            NodeData::Literal(n) => Ok(n.text),
            _ => Err(AsgError::UnknownAttribute {
                kind: node.kind(),
                attribute: "text",
            }),
        }
    }

    pub fn text(&self, id: NodeId) -> Result<Option<&str>, AsgError> {
        match self.text_key(id)? {
            Some(key) => Ok(Some(self.strings.lookup(key)?)),
            None => Ok(None),
        }
    }

    /// Sets the operator of a BinaryExpression.
    pub fn set_operator(&mut self, id: NodeId, operator: BinaryOperator) -> Result<(), AsgError> {
        let node = self.get_mut(id)?;
        match &mut node.data {
            NodeData::BinaryExpression(n) => {
                n.operator = operator;
                Ok(())
            }
            _ => Err(AsgError::UnknownAttribute {
                kind: node.kind(),
                attribute: "operator",
            }),
        }
    }

    /// Sets the literal kind of a Literal.
    pub fn set_literal_kind(&mut self, id: NodeId, kind: LiteralKind) -> Result<(), AsgError> {
        let node = self.get_mut(id)?;
        match &mut node.data {
            NodeData::Literal(n) => {
                n.literal_kind = kind;
                Ok(())
            }
            _ => Err(AsgError::UnknownAttribute {
                kind: node.kind(),
                attribute: "literal_kind",
            }),
        }
    }

    // -------------------------------------------------------------------
    // Strings
    // -------------------------------------------------------------------

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut StringTable {
        &mut self.strings
    }

    /// Rebuilds the string table keeping only values referenced by stored
    /// nodes (names, literal text, position paths) plus explicitly
    /// persistence-tagged entries, rewriting every node key through the
    /// old→new mapping. Tags survive the move.
    pub fn compact_strings(&mut self) -> Result<(), AsgError> {
        let mut new_table = StringTable::new();
        let mut mapping: IndexMap<StringKey, StringKey> = IndexMap::new();

        for index in 0..self.arena.len() {
            let Some(node) = self.arena[index].as_ref() else {
                continue;
            };
            let mut keys: Vec<StringKey> = node
                .data
                .string_attrs()
                .iter()
                .filter_map(|(_, key)| *key)
                .collect();
            if let Some(pos) = &node.base.position {
                if let Some(path) = pos.path {
                    keys.push(path);
                }
            }
            for old in keys {
                if !mapping.contains_key(&old) {
                    let value = self.strings.lookup(old)?.to_string();
                    let new_key = new_table.intern(&value);
                    if self.strings.is_persistent(old)? {
                        new_table.mark_for_persistence(new_key)?;
                    }
                    mapping.insert(old, new_key);
                }
            }
            let Some(node) = self.arena[index].as_mut() else {
                continue;
            };
            for key_ref in node.data.string_attrs_mut() {
                if let Some(old) = *key_ref {
                    *key_ref = Some(mapping[&old]);
                }
            }
            if let Some(pos) = node.base.position.as_mut() {
                if let Some(old) = pos.path {
                    pos.path = Some(mapping[&old]);
                }
            }
        }

        // Explicitly tagged values survive even when no node references
        // them.
        for (old, value) in self.strings.persistent_entries() {
            if !mapping.contains_key(&old) {
                let new_key = new_table.intern(value);
                new_table.mark_for_persistence(new_key)?;
                mapping.insert(old, new_key);
            }
        }

        self.strings = new_table;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Consistency checking (debug builds)
    // -------------------------------------------------------------------

    /// Verifies the structural invariants: slot/id agreement, owning slots
    /// vs parent links, at most one owning in-edge per node, acyclic
    /// containment, reverse index consistent with forward edges.
    #[cfg(debug_assertions)]
    pub fn assert_consistency(&self) {
        assert!(self.arena[0].is_none(), "slot 0 must stay empty");
        for (i, slot) in self.arena.iter().enumerate() {
            if let Some(node) = slot {
                assert_eq!(node.id.0 as usize, i, "node id must match its slot");
            }
        }

        let mut owners: IndexMap<NodeId, ParentLink> = IndexMap::new();
        for node in self.stored_nodes() {
            for decl in edges_of(node.kind()) {
                let targets: Vec<NodeId> = match decl.cardinality {
                    Cardinality::Single => {
                        node.data.single_slot(decl.kind).flatten().into_iter().collect()
                    }
                    Cardinality::Multi => node
                        .data
                        .multi_slot(decl.kind)
                        .map(|v| v.to_vec())
                        .unwrap_or_default(),
                };
                for target in targets {
                    assert!(
                        self.slot(target).is_some(),
                        "edge {} of {} dangles",
                        decl.kind,
                        node.id
                    );
                    if decl.semantics.is_owning() {
                        let link = ParentLink {
                            parent: node.id,
                            edge: decl.kind,
                        };
                        let prior = owners.insert(target, link);
                        assert!(
                            prior.is_none(),
                            "node {} has more than one owning in-edge",
                            target
                        );
                        let stored = self.slot(target).and_then(|n| n.base.parent_link);
                        assert_eq!(stored, Some(link), "parent link out of step on {}", target);
                    }
                }
            }
        }
        for node in self.stored_nodes() {
            if let Some(link) = node.base.parent_link {
                assert_eq!(
                    owners.get(&node.id),
                    Some(&link),
                    "parent link on {} with no matching owning edge",
                    node.id
                );
            }
            // containment must be acyclic; walk up with a step budget
            let mut hops = 0usize;
            let mut cursor = node.base.parent_link;
            while let Some(link) = cursor {
                hops += 1;
                assert!(hops <= self.arena.len(), "containment cycle at {}", node.id);
                cursor = self.slot(link.parent).and_then(|n| n.base.parent_link);
            }
        }

        if let Some(index) = self.reverse.as_ref() {
            let mut fresh = ReverseEdgeIndex::new();
            for node in self.stored_nodes() {
                for decl in edges_of(node.kind()) {
                    match decl.cardinality {
                        Cardinality::Single => {
                            if let Some(Some(target)) = node.data.single_slot(decl.kind) {
                                fresh.insert(target, decl.kind, node.id);
                            }
                        }
                        Cardinality::Multi => {
                            if let Some(vec) = node.data.multi_slot(decl.kind) {
                                for &target in vec {
                                    fresh.insert(target, decl.kind, node.id);
                                }
                            }
                        }
                    }
                }
            }
            assert_eq!(index.edge_count(), fresh.edge_count(), "reverse index drift");
            for node in self.stored_nodes() {
                for decl in edges_of(node.kind()) {
                    assert_eq!(
                        index.sources(node.id, decl.kind),
                        fresh.sources(node.id, decl.kind),
                        "reverse sources drift on {}",
                        node.id
                    );
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn slot(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    fn target_filtered(&self, id: NodeId) -> bool {
        self.slot(id).map(|n| n.base.filtered).unwrap_or(false)
    }

    fn declared(&self, source: NodeId, edge: EdgeKind) -> Result<EdgeDecl, AsgError> {
        let kind = self.get(source)?.kind();
        decl_of(kind, edge)
            .copied()
            .ok_or(AsgError::UndeclaredEdge { kind, edge })
    }

    fn validate_target(&self, decl: &EdgeDecl, target: NodeId) -> Result<(), AsgError> {
        let node = self
            .slot(target)
            .ok_or(AsgError::DanglingReference { id: target })?;
        let kind = node.kind();
        if !decl.target.admits(kind) {
            return Err(AsgError::InvalidNodeKind {
                edge: decl.kind,
                target,
                kind,
            });
        }
        Ok(())
    }

    /// Containment must stay a forest: an owning edge may not point at the
    /// source itself or at any of its containment ancestors.
    fn check_ownership_cycle(
        &self,
        source: NodeId,
        edge: EdgeKind,
        target: NodeId,
    ) -> Result<(), AsgError> {
        let mut cursor = Some(source);
        while let Some(id) = cursor {
            if id == target {
                return Err(AsgError::OwnershipCycle {
                    from: source,
                    edge,
                    to: target,
                });
            }
            cursor = self
                .slot(id)
                .and_then(|n| n.base.parent_link)
                .map(|l| l.parent);
        }
        Ok(())
    }

    fn attach_single(&mut self, source: NodeId, decl: EdgeDecl, target: NodeId) -> Result<(), AsgError> {
        self.validate_target(&decl, target)?;
        if decl.semantics.is_owning() {
            self.check_ownership_cycle(source, decl.kind, target)?;
        }
        let prev = self
            .slot(source)
            .and_then(|n| n.data.single_slot(decl.kind))
            .flatten();
        if prev == Some(target) {
            return Ok(());
        }
        if let Some(prev_id) = prev {
            if let Some(node) = self.slot_mut(source) {
                if let Some(slot) = node.data.single_slot_mut(decl.kind) {
                    *slot = None;
                }
            }
            self.unlink_target(source, decl, prev_id);
        }
        if decl.semantics.is_owning() {
            self.detach_current_owner(target);
        }
        if let Some(node) = self.slot_mut(source) {
            if let Some(slot) = node.data.single_slot_mut(decl.kind) {
                *slot = Some(target);
            }
        }
        self.link_target(source, decl, target);
        Ok(())
    }

    fn append_multi(&mut self, source: NodeId, decl: EdgeDecl, target: NodeId) -> Result<(), AsgError> {
        self.validate_target(&decl, target)?;
        if decl.semantics.is_owning() {
            self.check_ownership_cycle(source, decl.kind, target)?;
        }
        if decl.unique {
            let duplicate = self
                .slot(source)
                .and_then(|n| n.data.multi_slot(decl.kind))
                .map(|v| v.contains(&target))
                .unwrap_or(false);
            if duplicate {
                return Ok(());
            }
        }
        if decl.semantics.is_owning() {
            // Re-parenting: also covers an earlier occurrence in this very
            // slot, which moves the child to the end.
            self.detach_current_owner(target);
        }
        if let Some(node) = self.slot_mut(source) {
            if let Some(vec) = node.data.multi_slot_mut(decl.kind) {
                vec.push(target);
            }
        }
        self.link_target(source, decl, target);
        Ok(())
    }

    /// Post-attach bookkeeping shared by single and multi attach.
    fn link_target(&mut self, source: NodeId, decl: EdgeDecl, target: NodeId) {
        if decl.semantics.is_owning() {
            if let Some(node) = self.slot_mut(target) {
                node.base.parent_link = Some(ParentLink {
                    parent: source,
                    edge: decl.kind,
                });
            }
        }
        if let Some(rev) = self.reverse.as_mut() {
            rev.insert(target, decl.kind, source);
        }
    }

    /// Post-detach bookkeeping shared by all detach paths.
    fn unlink_target(&mut self, source: NodeId, decl: EdgeDecl, target: NodeId) {
        if decl.semantics.is_owning() {
            if let Some(node) = self.slot_mut(target) {
                if node.base.parent_link.map(|l| l.parent) == Some(source) {
                    node.base.parent_link = None;
                }
            }
        }
        if let Some(rev) = self.reverse.as_mut() {
            rev.remove(target, decl.kind, source);
        }
    }

    /// Clears the owning edge currently terminating at `target`, wherever
    /// it lives. The detach-before-attach half of re-parenting.
    fn detach_current_owner(&mut self, target: NodeId) {
        let link = self.slot(target).and_then(|n| n.base.parent_link);
        let Some(link) = link else { return };
        if let Some(parent) = self.slot_mut(link.parent) {
            if let Some(slot) = parent.data.single_slot_mut(link.edge) {
                if *slot == Some(target) {
                    *slot = None;
                }
            } else if let Some(vec) = parent.data.multi_slot_mut(link.edge) {
                if let Some(pos) = vec.iter().position(|&t| t == target) {
                    vec.remove(pos);
                }
            }
        }
        if let Some(node) = self.slot_mut(target) {
            node.base.parent_link = None;
        }
        if let Some(rev) = self.reverse.as_mut() {
            rev.remove(target, link.edge, link.parent);
        }
    }

    /// Depth-first, children pushed before their parent.
    fn collect_owned_subtree(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.slot(id) else { return };
        for decl in edges_of(node.kind()) {
            if !decl.semantics.is_owning() {
                continue;
            }
            match decl.cardinality {
                Cardinality::Single => {
                    if let Some(Some(child)) = node.data.single_slot(decl.kind) {
                        self.collect_owned_subtree(child, out);
                    }
                }
                Cardinality::Multi => {
                    if let Some(vec) = node.data.multi_slot(decl.kind) {
                        for &child in vec.iter() {
                            self.collect_owned_subtree(child, out);
                        }
                    }
                }
            }
        }
        out.push(id);
    }

    /// Removes every occurrence of `target` from `(source, edge)`. Used by
    /// teardown, which bypasses the validating API on purpose.
    fn clear_forward_occurrences(&mut self, source: NodeId, edge: EdgeKind, target: NodeId) {
        if let Some(node) = self.slot_mut(source) {
            if let Some(slot) = node.data.single_slot_mut(edge) {
                if *slot == Some(target) {
                    *slot = None;
                }
            } else if let Some(vec) = node.data.multi_slot_mut(edge) {
                vec.retain(|t| *t != target);
            }
        }
    }

    /// Removes every edge of `source` whose target lies in `doomed`.
    fn clear_edges_into_set(&mut self, source: NodeId, doomed: &HashSet<NodeId>) {
        let Some(node) = self.slot_mut(source) else { return };
        let kind = node.data.kind();
        for decl in edges_of(kind) {
            if let Some(slot) = node.data.single_slot_mut(decl.kind) {
                if let Some(t) = *slot {
                    if doomed.contains(&t) {
                        *slot = None;
                    }
                }
            } else if let Some(vec) = node.data.multi_slot_mut(decl.kind) {
                vec.retain(|t| !doomed.contains(t));
            }
        }
    }
}
