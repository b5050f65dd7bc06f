//! Node representation: common base record plus per-kind payloads.
//!
//! A [`Node`] is a tagged variant: [`NodeBase`] carries what every node has
//! (filtered flag, optional source position, containment parent link) and
//! [`NodeData`] carries the kind-specific scalars and edge slots, one
//! payload struct per [`NodeKind`].
//!
//! Edge slots are plain fields on the payloads; the factory's linkage
//! choke-point is the only writer, reached through the `*_slot_mut`
//! accessors. Payload fields are public for read access — mutable node
//! references never leave the factory.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::edge::EdgeKind;
use crate::id::{NodeId, StringKey};
use crate::kind::NodeKind;
use crate::position::SourcePosition;

/// Inline vector for multi-edge targets.
pub type NodeIdVec = SmallVec<[NodeId; 4]>;

// ---------------------------------------------------------------------------
// Scalar attribute enums
// ---------------------------------------------------------------------------

/// Operator of a [`BinaryExpressionNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOperator {
    /// Stable wire tag.
    pub fn tag(self) -> u32 {
        match self {
            BinaryOperator::Add => 1,
            BinaryOperator::Subtract => 2,
            BinaryOperator::Multiply => 3,
            BinaryOperator::Divide => 4,
            BinaryOperator::Modulo => 5,
            BinaryOperator::Equal => 6,
            BinaryOperator::NotEqual => 7,
            BinaryOperator::Less => 8,
            BinaryOperator::LessEqual => 9,
            BinaryOperator::Greater => 10,
            BinaryOperator::GreaterEqual => 11,
            BinaryOperator::LogicalAnd => 12,
            BinaryOperator::LogicalOr => 13,
        }
    }

    pub fn from_tag(tag: u32) -> Option<BinaryOperator> {
        use BinaryOperator::*;
        let all = [
            Add, Subtract, Multiply, Divide, Modulo, Equal, NotEqual, Less, LessEqual, Greater,
            GreaterEqual, LogicalAnd, LogicalOr,
        ];
        all.into_iter().find(|op| op.tag() == tag)
    }
}

/// Kind of a [`LiteralNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LiteralKind {
    #[default]
    Integer,
    Float,
    Boolean,
    String,
    Char,
    Null,
}

impl LiteralKind {
    /// Stable wire tag.
    pub fn tag(self) -> u32 {
        match self {
            LiteralKind::Integer => 1,
            LiteralKind::Float => 2,
            LiteralKind::Boolean => 3,
            LiteralKind::String => 4,
            LiteralKind::Char => 5,
            LiteralKind::Null => 6,
        }
    }

    pub fn from_tag(tag: u32) -> Option<LiteralKind> {
        use LiteralKind::*;
        [Integer, Float, Boolean, String, Char, Null]
            .into_iter()
            .find(|k| k.tag() == tag)
    }
}

// ---------------------------------------------------------------------------
// Base record
// ---------------------------------------------------------------------------

/// The inbound owning edge of a node: who contains it, and through which
/// edge kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub parent: NodeId,
    pub edge: EdgeKind,
}

/// Fields every node carries regardless of kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBase {
    /// Logically deleted. Filtered nodes stay id-resolvable but disappear
    /// from public iteration, edge resolution and traversal.
    pub filtered: bool,
    /// Source range, if the builder recorded one.
    pub position: Option<SourcePosition>,
    /// Current containment parent. Maintained exclusively by the factory's
    /// linkage choke-point.
    pub parent_link: Option<ParentLink>,
}

// ---------------------------------------------------------------------------
// Per-kind payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnitNode {
    pub path: Option<StringKey>,
    pub declarations: NodeIdVec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionNode {
    pub name: Option<StringKey>,
    pub parameters: NodeIdVec,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterNode {
    pub name: Option<StringKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub statements: NodeIdVec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhileNode {
    pub condition: Option<NodeId>,
    pub body: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IfNode {
    pub condition: Option<NodeId>,
    pub then_branch: Option<NodeId>,
    pub else_branch: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatementNode {
    pub expression: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnNode {
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpressionNode {
    pub operator: BinaryOperator,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    pub callee: Option<NodeId>,
    pub arguments: NodeIdVec,
    pub candidates: NodeIdVec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifierNode {
    pub name: Option<StringKey>,
    pub declaration: Option<NodeId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiteralNode {
    pub literal_kind: LiteralKind,
    pub text: Option<StringKey>,
}

// ---------------------------------------------------------------------------
// NodeData
// ---------------------------------------------------------------------------

/// Kind-specific payload of a node. One variant per [`NodeKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    CompilationUnit(CompilationUnitNode),
    Function(FunctionNode),
    Parameter(ParameterNode),
    Block(BlockNode),
    While(WhileNode),
    If(IfNode),
    ExpressionStatement(ExpressionStatementNode),
    Return(ReturnNode),
    BinaryExpression(BinaryExpressionNode),
    Call(CallNode),
    Identifier(IdentifierNode),
    Literal(LiteralNode),
}

impl NodeData {
    /// Default payload for a freshly created node of `kind`.
    pub fn new(kind: NodeKind) -> NodeData {
        match kind {
            NodeKind::CompilationUnit => NodeData::CompilationUnit(Default::default()),
            NodeKind::Function => NodeData::Function(Default::default()),
            NodeKind::Parameter => NodeData::Parameter(Default::default()),
            NodeKind::Block => NodeData::Block(Default::default()),
            NodeKind::While => NodeData::While(Default::default()),
            NodeKind::If => NodeData::If(Default::default()),
            NodeKind::ExpressionStatement => NodeData::ExpressionStatement(Default::default()),
            NodeKind::Return => NodeData::Return(Default::default()),
            NodeKind::BinaryExpression => NodeData::BinaryExpression(Default::default()),
            NodeKind::Call => NodeData::Call(Default::default()),
            NodeKind::Identifier => NodeData::Identifier(Default::default()),
            NodeKind::Literal => NodeData::Literal(Default::default()),
        }
    }

    /// The kind tag of this payload.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::CompilationUnit(_) => NodeKind::CompilationUnit,
            NodeData::Function(_) => NodeKind::Function,
            NodeData::Parameter(_) => NodeKind::Parameter,
            NodeData::Block(_) => NodeKind::Block,
            NodeData::While(_) => NodeKind::While,
            NodeData::If(_) => NodeKind::If,
            NodeData::ExpressionStatement(_) => NodeKind::ExpressionStatement,
            NodeData::Return(_) => NodeKind::Return,
            NodeData::BinaryExpression(_) => NodeKind::BinaryExpression,
            NodeData::Call(_) => NodeKind::Call,
            NodeData::Identifier(_) => NodeKind::Identifier,
            NodeData::Literal(_) => NodeKind::Literal,
        }
    }

    /// Read access to a declared single-edge slot. `None` if this payload
    /// does not declare `edge` with single cardinality.
    pub fn single_slot(&self, edge: EdgeKind) -> Option<Option<NodeId>> {
        match (self, edge) {
            (NodeData::Function(n), EdgeKind::Body) => Some(n.body),
            (NodeData::While(n), EdgeKind::Condition) => Some(n.condition),
            (NodeData::While(n), EdgeKind::Body) => Some(n.body),
            (NodeData::If(n), EdgeKind::Condition) => Some(n.condition),
            (NodeData::If(n), EdgeKind::Then) => Some(n.then_branch),
            (NodeData::If(n), EdgeKind::Else) => Some(n.else_branch),
            (NodeData::ExpressionStatement(n), EdgeKind::Expression) => Some(n.expression),
            (NodeData::Return(n), EdgeKind::Value) => Some(n.value),
            (NodeData::BinaryExpression(n), EdgeKind::Left) => Some(n.left),
            (NodeData::BinaryExpression(n), EdgeKind::Right) => Some(n.right),
            (NodeData::Call(n), EdgeKind::Callee) => Some(n.callee),
            (NodeData::Identifier(n), EdgeKind::Declaration) => Some(n.declaration),
            _ => None,
        }
    }

    /// Mutable access to a declared single-edge slot.
    pub(crate) fn single_slot_mut(&mut self, edge: EdgeKind) -> Option<&mut Option<NodeId>> {
        match (self, edge) {
            (NodeData::Function(n), EdgeKind::Body) => Some(&mut n.body),
            (NodeData::While(n), EdgeKind::Condition) => Some(&mut n.condition),
            (NodeData::While(n), EdgeKind::Body) => Some(&mut n.body),
            (NodeData::If(n), EdgeKind::Condition) => Some(&mut n.condition),
            (NodeData::If(n), EdgeKind::Then) => Some(&mut n.then_branch),
            (NodeData::If(n), EdgeKind::Else) => Some(&mut n.else_branch),
            (NodeData::ExpressionStatement(n), EdgeKind::Expression) => Some(&mut n.expression),
            (NodeData::Return(n), EdgeKind::Value) => Some(&mut n.value),
            (NodeData::BinaryExpression(n), EdgeKind::Left) => Some(&mut n.left),
            (NodeData::BinaryExpression(n), EdgeKind::Right) => Some(&mut n.right),
            (NodeData::Call(n), EdgeKind::Callee) => Some(&mut n.callee),
            (NodeData::Identifier(n), EdgeKind::Declaration) => Some(&mut n.declaration),
            _ => None,
        }
    }

    /// Read access to a declared multi-edge slot.
    pub fn multi_slot(&self, edge: EdgeKind) -> Option<&NodeIdVec> {
        match (self, edge) {
            (NodeData::CompilationUnit(n), EdgeKind::Declarations) => Some(&n.declarations),
            (NodeData::Function(n), EdgeKind::Parameters) => Some(&n.parameters),
            (NodeData::Block(n), EdgeKind::Statements) => Some(&n.statements),
            (NodeData::Call(n), EdgeKind::Arguments) => Some(&n.arguments),
            (NodeData::Call(n), EdgeKind::Candidates) => Some(&n.candidates),
            _ => None,
        }
    }

    /// Mutable access to a declared multi-edge slot.
    pub(crate) fn multi_slot_mut(&mut self, edge: EdgeKind) -> Option<&mut NodeIdVec> {
        match (self, edge) {
            (NodeData::CompilationUnit(n), EdgeKind::Declarations) => Some(&mut n.declarations),
            (NodeData::Function(n), EdgeKind::Parameters) => Some(&mut n.parameters),
            (NodeData::Block(n), EdgeKind::Statements) => Some(&mut n.statements),
            (NodeData::Call(n), EdgeKind::Arguments) => Some(&mut n.arguments),
            (NodeData::Call(n), EdgeKind::Candidates) => Some(&mut n.candidates),
            _ => None,
        }
    }

    /// String attributes as `(attribute name, key)` pairs, in declared
    /// order. Drives similarity scoring, optional hash folding and string
    /// compaction.
    pub fn string_attrs(&self) -> SmallVec<[(&'static str, Option<StringKey>); 2]> {
        match self {
            NodeData::CompilationUnit(n) => smallvec::smallvec![("path", n.path)],
            NodeData::Function(n) => smallvec::smallvec![("name", n.name)],
            NodeData::Parameter(n) => smallvec::smallvec![("name", n.name)],
            NodeData::Identifier(n) => smallvec::smallvec![("name", n.name)],
            NodeData::Literal(n) => smallvec::smallvec![("text", n.text)],
            _ => SmallVec::new(),
        }
    }

    /// Mutable references to the same string attributes, in the same order.
    pub(crate) fn string_attrs_mut(&mut self) -> SmallVec<[&mut Option<StringKey>; 2]> {
        match self {
            NodeData::CompilationUnit(n) => smallvec::smallvec![&mut n.path],
            NodeData::Function(n) => smallvec::smallvec![&mut n.name],
            NodeData::Parameter(n) => smallvec::smallvec![&mut n.name],
            NodeData::Identifier(n) => smallvec::smallvec![&mut n.name],
            NodeData::Literal(n) => smallvec::smallvec![&mut n.text],
            _ => SmallVec::new(),
        }
    }

    /// Enum attributes as `(attribute name, wire tag)` pairs, in declared
    /// order.
    pub fn enum_attrs(&self) -> SmallVec<[(&'static str, u32); 2]> {
        match self {
            NodeData::BinaryExpression(n) => smallvec::smallvec![("operator", n.operator.tag())],
            NodeData::Literal(n) => smallvec::smallvec![("literal_kind", n.literal_kind.tag())],
            _ => SmallVec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A stored node: identity, base record, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub base: NodeBase,
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Node {
        Node {
            id,
            base: NodeBase::default(),
            data: NodeData::new(kind),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn is_filtered(&self) -> bool {
        self.base.filtered
    }

    pub fn position(&self) -> Option<&SourcePosition> {
        self.base.position.as_ref()
    }

    /// Current containment parent, if any.
    pub fn parent_link(&self) -> Option<ParentLink> {
        self.base.parent_link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::edges_of;
    use crate::kind::ALL_KINDS;

    #[test]
    fn default_payload_matches_kind() {
        for kind in ALL_KINDS {
            let node = Node::new(NodeId(1), kind);
            assert_eq!(node.kind(), kind);
            assert!(!node.is_filtered());
            assert!(node.parent_link().is_none());
        }
    }

    #[test]
    fn every_declared_edge_has_a_slot() {
        // The payload structs and the declaration table must agree: each
        // declared edge resolves through exactly the accessor matching its
        // cardinality.
        for kind in ALL_KINDS {
            let mut node = Node::new(NodeId(1), kind);
            for decl in edges_of(kind) {
                match decl.cardinality {
                    crate::edge::Cardinality::Single => {
                        assert!(
                            node.data.single_slot(decl.kind).is_some(),
                            "{kind} missing single slot {}",
                            decl.kind
                        );
                        assert!(node.data.single_slot_mut(decl.kind).is_some());
                        assert!(node.data.multi_slot(decl.kind).is_none());
                    }
                    crate::edge::Cardinality::Multi => {
                        assert!(
                            node.data.multi_slot(decl.kind).is_some(),
                            "{kind} missing multi slot {}",
                            decl.kind
                        );
                        assert!(node.data.multi_slot_mut(decl.kind).is_some());
                        assert!(node.data.single_slot(decl.kind).is_none());
                    }
                }
            }
        }
    }

    #[test]
    fn undeclared_slots_resolve_to_none() {
        let mut literal = Node::new(NodeId(1), NodeKind::Literal);
        assert!(literal.data.single_slot(EdgeKind::Body).is_none());
        assert!(literal.data.multi_slot(EdgeKind::Statements).is_none());
        assert!(literal.data.single_slot_mut(EdgeKind::Body).is_none());
    }

    #[test]
    fn string_attr_mut_order_matches_read_order() {
        for kind in ALL_KINDS {
            let mut node = Node::new(NodeId(1), kind);
            let read_len = node.data.string_attrs().len();
            let mut_len = node.data.string_attrs_mut().len();
            assert_eq!(read_len, mut_len, "{kind}");
        }
    }

    #[test]
    fn operator_and_literal_tags_roundtrip() {
        for tag in 1..=13 {
            let op = BinaryOperator::from_tag(tag).unwrap();
            assert_eq!(op.tag(), tag);
        }
        assert_eq!(BinaryOperator::from_tag(0), None);
        assert_eq!(BinaryOperator::from_tag(14), None);

        for tag in 1..=6 {
            let k = LiteralKind::from_tag(tag).unwrap();
            assert_eq!(k.tag(), tag);
        }
        assert_eq!(LiteralKind::from_tag(7), None);
    }

    #[test]
    fn serde_roundtrip() {
        let mut node = Node::new(NodeId(9), NodeKind::BinaryExpression);
        if let NodeData::BinaryExpression(b) = &mut node.data {
            b.operator = BinaryOperator::Less;
            b.left = Some(NodeId(2));
        }
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(node, back);
    }
}
