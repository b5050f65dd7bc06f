//! Core error types for asg-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering all
//! anticipated failure modes in the in-memory graph engine. Persistence
//! failures live in the storage crate's own error type.

use crate::edge::EdgeKind;
use crate::id::{NodeId, StringKey};
use crate::kind::NodeKind;
use thiserror::Error;

/// Core errors produced by the asg-core crate.
#[derive(Debug, Error)]
pub enum AsgError {
    /// An edge endpoint or lookup referenced an id that does not exist in
    /// this factory.
    #[error("dangling reference: NodeId({id})", id = id.0)]
    DanglingReference { id: NodeId },

    /// An edge target's runtime kind violates the edge's declared
    /// constraint.
    #[error("invalid node kind: edge {edge} cannot target NodeId({id}) of kind {kind}", id = target.0)]
    InvalidNodeKind {
        edge: EdgeKind,
        target: NodeId,
        kind: NodeKind,
    },

    /// An edge kind was used on a node whose kind does not declare it.
    #[error("undeclared edge: kind {kind} has no edge {edge}")]
    UndeclaredEdge { kind: NodeKind, edge: EdgeKind },

    /// Attempt to reset an occupied single edge to "absent". Detaching goes
    /// through `remove_edge` instead.
    // Field is `node`, not `source`: thiserror would treat a `source`
    // field as the error's cause.
    #[error("cannot clear required edge {edge} of NodeId({id})", id = node.0)]
    CannotClearRequiredEdge { node: NodeId, edge: EdgeKind },

    /// An owning edge would make a node contain itself or one of its
    /// containment ancestors.
    #[error("ownership cycle: edge {edge} from NodeId({s}) to NodeId({t})", s = from.0, t = to.0)]
    OwnershipCycle {
        from: NodeId,
        edge: EdgeKind,
        to: NodeId,
    },

    /// A string table lookup missed.
    #[error("unknown string key: StringKey({key})", key = key.0)]
    UnknownKey { key: StringKey },

    /// Reverse lookup was attempted while the reverse-edge index is not
    /// enabled.
    #[error("reverse edge index is disabled")]
    IndexDisabled,

    /// Attempt to materialize a node under an id that is already occupied
    /// or reserved.
    #[error("duplicate node id: NodeId({id})", id = id.0)]
    DuplicateNodeId { id: NodeId },

    /// A scalar setter was called on a node kind that does not carry the
    /// attribute.
    #[error("kind {kind} has no attribute '{attribute}'")]
    UnknownAttribute {
        kind: NodeKind,
        attribute: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn clear_error_names_the_node_and_carries_no_cause() {
        let err = AsgError::CannotClearRequiredEdge {
            node: NodeId(7),
            edge: EdgeKind::Condition,
        };
        assert_eq!(err.to_string(), "cannot clear required edge Condition of NodeId(7)");
        assert!(err.source().is_none());
    }

    #[test]
    fn cycle_error_names_both_endpoints() {
        let err = AsgError::OwnershipCycle {
            from: NodeId(3),
            edge: EdgeKind::Body,
            to: NodeId(1),
        };
        assert_eq!(
            err.to_string(),
            "ownership cycle: edge Body from NodeId(3) to NodeId(1)"
        );
    }
}
