//! Edge kinds and the per-node-kind edge declaration table.
//!
//! Every edge in the graph is a typed relation `(source, EdgeKind, target)`.
//! What edges a node may carry is fixed by its [`NodeKind`]: the declaration
//! table here is the single source of truth for cardinality, owning vs.
//! reference semantics, target constraints and uniqueness.
//!
//! Declared order matters: it is the order the codec writes edge fields,
//! the order traversal descends children, and the order the structural hash
//! folds child signatures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kind::{NodeCategory, NodeKind};

// ---------------------------------------------------------------------------
// Edge vocabulary
// ---------------------------------------------------------------------------

/// The closed set of edge kinds. Some names are shared across node kinds
/// (`Body` on Function and While); the source node's kind disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// CompilationUnit → its top-level declarations.
    Declarations,
    /// Function → its parameters, in signature order.
    Parameters,
    /// Function/While → the contained body.
    Body,
    /// Block → its statements, in source order.
    Statements,
    /// While/If → the guarding expression.
    Condition,
    /// If → the then branch.
    Then,
    /// If → the else branch.
    Else,
    /// ExpressionStatement → the wrapped expression.
    Expression,
    /// Return → the returned expression.
    Value,
    /// BinaryExpression → left operand.
    Left,
    /// BinaryExpression → right operand.
    Right,
    /// Call → the callee expression.
    Callee,
    /// Call → the argument expressions, in call order.
    Arguments,
    /// Call → resolved overload candidates (reference).
    Candidates,
    /// Identifier → the declaration it names (reference).
    Declaration,
}

impl EdgeKind {
    /// Edge kind name as written in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            EdgeKind::Declarations => "Declarations",
            EdgeKind::Parameters => "Parameters",
            EdgeKind::Body => "Body",
            EdgeKind::Statements => "Statements",
            EdgeKind::Condition => "Condition",
            EdgeKind::Then => "Then",
            EdgeKind::Else => "Else",
            EdgeKind::Expression => "Expression",
            EdgeKind::Value => "Value",
            EdgeKind::Left => "Left",
            EdgeKind::Right => "Right",
            EdgeKind::Callee => "Callee",
            EdgeKind::Arguments => "Arguments",
            EdgeKind::Candidates => "Candidates",
            EdgeKind::Declaration => "Declaration",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// How many targets an edge slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one target; setting replaces the previous one.
    Single,
    /// Insertion-ordered sequence of targets.
    Multi,
}

/// Whether an edge participates in the containment forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSemantics {
    /// The source is the target's one containment parent.
    Owning,
    /// Informational link; excluded from containment, may form cycles.
    Reference,
}

impl EdgeSemantics {
    pub fn is_owning(self) -> bool {
        matches!(self, EdgeSemantics::Owning)
    }
}

/// Constraint on the runtime kind of an edge target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetConstraint {
    /// Any kind in the category is accepted.
    Category(NodeCategory),
    /// Exactly this kind is accepted.
    Exact(NodeKind),
}

impl TargetConstraint {
    /// Whether a node of `kind` may be the target.
    pub fn admits(self, kind: NodeKind) -> bool {
        match self {
            TargetConstraint::Category(cat) => kind.category() == cat,
            TargetConstraint::Exact(exact) => kind == exact,
        }
    }
}

/// One declared edge slot of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDecl {
    pub kind: EdgeKind,
    pub cardinality: Cardinality,
    pub semantics: EdgeSemantics,
    pub target: TargetConstraint,
    /// For multi edges: reject duplicate targets (append becomes a no-op).
    pub unique: bool,
}

const fn single(kind: EdgeKind, semantics: EdgeSemantics, target: TargetConstraint) -> EdgeDecl {
    EdgeDecl {
        kind,
        cardinality: Cardinality::Single,
        semantics,
        target,
        unique: false,
    }
}

const fn multi(kind: EdgeKind, semantics: EdgeSemantics, target: TargetConstraint) -> EdgeDecl {
    EdgeDecl {
        kind,
        cardinality: Cardinality::Multi,
        semantics,
        target,
        unique: false,
    }
}

const fn multi_unique(kind: EdgeKind, semantics: EdgeSemantics, target: TargetConstraint) -> EdgeDecl {
    EdgeDecl {
        kind,
        cardinality: Cardinality::Multi,
        semantics,
        target,
        unique: true,
    }
}

use EdgeSemantics::{Owning, Reference};
use NodeCategory::{Declaration as DeclCat, Expression as ExprCat, Statement as StmtCat};
use TargetConstraint::{Category, Exact};

// One const table per kind so the returned slices are truly 'static.
const COMPILATION_UNIT_EDGES: &[EdgeDecl] =
    &[multi(EdgeKind::Declarations, Owning, Category(DeclCat))];
const FUNCTION_EDGES: &[EdgeDecl] = &[
    multi(EdgeKind::Parameters, Owning, Exact(NodeKind::Parameter)),
    single(EdgeKind::Body, Owning, Category(StmtCat)),
];
const BLOCK_EDGES: &[EdgeDecl] = &[multi(EdgeKind::Statements, Owning, Category(StmtCat))];
const WHILE_EDGES: &[EdgeDecl] = &[
    single(EdgeKind::Condition, Owning, Category(ExprCat)),
    single(EdgeKind::Body, Owning, Category(StmtCat)),
];
const IF_EDGES: &[EdgeDecl] = &[
    single(EdgeKind::Condition, Owning, Category(ExprCat)),
    single(EdgeKind::Then, Owning, Category(StmtCat)),
    single(EdgeKind::Else, Owning, Category(StmtCat)),
];
const EXPRESSION_STATEMENT_EDGES: &[EdgeDecl] =
    &[single(EdgeKind::Expression, Owning, Category(ExprCat))];
const RETURN_EDGES: &[EdgeDecl] = &[single(EdgeKind::Value, Owning, Category(ExprCat))];
const BINARY_EXPRESSION_EDGES: &[EdgeDecl] = &[
    single(EdgeKind::Left, Owning, Category(ExprCat)),
    single(EdgeKind::Right, Owning, Category(ExprCat)),
];
const CALL_EDGES: &[EdgeDecl] = &[
    single(EdgeKind::Callee, Owning, Category(ExprCat)),
    multi(EdgeKind::Arguments, Owning, Category(ExprCat)),
    multi_unique(EdgeKind::Candidates, Reference, Exact(NodeKind::Function)),
];
const IDENTIFIER_EDGES: &[EdgeDecl] =
    &[single(EdgeKind::Declaration, Reference, Category(DeclCat))];

/// Declared edges of each node kind, in declared order.
pub fn edges_of(kind: NodeKind) -> &'static [EdgeDecl] {
    match kind {
        NodeKind::CompilationUnit => COMPILATION_UNIT_EDGES,
        NodeKind::Function => FUNCTION_EDGES,
        NodeKind::Parameter => &[],
        NodeKind::Block => BLOCK_EDGES,
        NodeKind::While => WHILE_EDGES,
        NodeKind::If => IF_EDGES,
        NodeKind::ExpressionStatement => EXPRESSION_STATEMENT_EDGES,
        NodeKind::Return => RETURN_EDGES,
        NodeKind::BinaryExpression => BINARY_EXPRESSION_EDGES,
        NodeKind::Call => CALL_EDGES,
        NodeKind::Identifier => IDENTIFIER_EDGES,
        NodeKind::Literal => &[],
    }
}

/// Looks up the declaration of `edge` on `kind`, if the kind declares it.
pub fn decl_of(kind: NodeKind, edge: EdgeKind) -> Option<&'static EdgeDecl> {
    edges_of(kind).iter().find(|d| d.kind == edge)
}
