//! In-memory engine for an Abstract Semantic Graph (ASG).
//!
//! The ASG is a typed, edge-labeled graph of syntax nodes produced by
//! source analysis. This crate is the generic storage core every node kind
//! shares: node lifecycle, the typed edge model, the reverse-edge index,
//! string interning, traversal, and the structural hash/similarity pair
//! that clone detection builds on. Binary persistence lives in the
//! `asg-storage` crate.
//!
//! # Architecture
//!
//! All nodes live in one arena owned by the [`Factory`]; every linkage
//! mutation funnels through its choke-point so the containment invariants
//! (one owning parent per node, detach-before-attach re-parenting, reverse
//! index in step with forward edges) are enforced in one place.
//!
//! # Modules
//!
//! - [`id`]: `NodeId`/`StringKey` newtypes, 0 reserved as the wire sentinel
//! - [`error`]: `AsgError` enum with all failure modes
//! - [`strings`]: interning table with persistence tags and remapping
//! - [`kind`]: the closed `NodeKind`/`NodeCategory` schema tags
//! - [`edge`]: edge kinds and the per-kind declaration table
//! - [`position`]: optional source-range attribute
//! - [`node`]: tagged-variant node payloads over a common base record
//! - [`reverse`]: derived target-to-sources index
//! - [`factory`]: the arena store and linkage choke-point
//! - [`visitor`] / [`preorder`]: per-kind hooks and the pre/post-order driver
//! - [`hash`] / [`similarity`]: structural signatures and pairwise scoring

pub mod edge;
pub mod error;
pub mod factory;
pub mod hash;
pub mod id;
pub mod kind;
pub mod node;
pub mod position;
pub mod preorder;
pub mod reverse;
pub mod similarity;
pub mod strings;
pub mod visitor;

// Re-export key types for ergonomic use.
pub use edge::{decl_of, edges_of, Cardinality, EdgeDecl, EdgeKind, EdgeSemantics, TargetConstraint};
pub use error::AsgError;
pub use factory::{Factory, FactoryOptions};
pub use hash::{HashConfig, StructuralHasher};
pub use id::{NodeId, StringKey};
pub use kind::{NodeCategory, NodeKind, ALL_KINDS};
pub use node::{BinaryOperator, LiteralKind, Node, NodeBase, NodeData, ParentLink};
pub use position::SourcePosition;
pub use preorder::Preorder;
pub use reverse::ReverseEdgeIndex;
pub use similarity::{similarity, SimilarityConfig};
pub use strings::StringTable;
pub use visitor::Visitor;
