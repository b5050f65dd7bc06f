//! Node kind and category enums.
//!
//! [`NodeKind`] is the closed tag fixing a node's field and edge shape for
//! its lifetime. [`NodeCategory`] groups kinds for edge target constraints
//! (an edge declared against a category accepts any kind in it).
//!
//! Each kind has a stable numeric tag for the binary codec and a qualified
//! name (`"statement::While"`) that seeds the structural hash, so renaming
//! a variant in source is an on-disk and hash compatibility break.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category a node kind belongs to. Edge declarations constrain their
/// targets either to one exact kind or to everything in a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Top-level containers (compilation units).
    Structure,
    /// Named program entities (functions, parameters).
    Declaration,
    /// Statements.
    Statement,
    /// Expressions.
    Expression,
}

/// The closed set of node kinds in the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    CompilationUnit,
    Function,
    Parameter,
    Block,
    While,
    If,
    ExpressionStatement,
    Return,
    BinaryExpression,
    Call,
    Identifier,
    Literal,
}

/// All kinds in tag order. Useful for schema-driven tests and tooling.
pub const ALL_KINDS: [NodeKind; 12] = [
    NodeKind::CompilationUnit,
    NodeKind::Function,
    NodeKind::Parameter,
    NodeKind::Block,
    NodeKind::While,
    NodeKind::If,
    NodeKind::ExpressionStatement,
    NodeKind::Return,
    NodeKind::BinaryExpression,
    NodeKind::Call,
    NodeKind::Identifier,
    NodeKind::Literal,
];

impl NodeKind {
    /// Returns the category this kind belongs to.
    pub fn category(self) -> NodeCategory {
        match self {
            NodeKind::CompilationUnit => NodeCategory::Structure,
            NodeKind::Function | NodeKind::Parameter => NodeCategory::Declaration,
            NodeKind::Block
            | NodeKind::While
            | NodeKind::If
            | NodeKind::ExpressionStatement
            | NodeKind::Return => NodeCategory::Statement,
            NodeKind::BinaryExpression
            | NodeKind::Call
            | NodeKind::Identifier
            | NodeKind::Literal => NodeCategory::Expression,
        }
    }

    /// Short kind name without the category prefix.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::CompilationUnit => "CompilationUnit",
            NodeKind::Function => "Function",
            NodeKind::Parameter => "Parameter",
            NodeKind::Block => "Block",
            NodeKind::While => "While",
            NodeKind::If => "If",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::Return => "Return",
            NodeKind::BinaryExpression => "BinaryExpression",
            NodeKind::Call => "Call",
            NodeKind::Identifier => "Identifier",
            NodeKind::Literal => "Literal",
        }
    }

    /// Category-qualified name. Seeds the structural hash, so it must stay
    /// stable across releases.
    pub fn qualified_name(self) -> &'static str {
        match self {
            NodeKind::CompilationUnit => "structure::CompilationUnit",
            NodeKind::Function => "declaration::Function",
            NodeKind::Parameter => "declaration::Parameter",
            NodeKind::Block => "statement::Block",
            NodeKind::While => "statement::While",
            NodeKind::If => "statement::If",
            NodeKind::ExpressionStatement => "statement::ExpressionStatement",
            NodeKind::Return => "statement::Return",
            NodeKind::BinaryExpression => "expression::BinaryExpression",
            NodeKind::Call => "expression::Call",
            NodeKind::Identifier => "expression::Identifier",
            NodeKind::Literal => "expression::Literal",
        }
    }

    /// Stable numeric tag written by the binary codec. Tags are append-only:
    /// existing values never change meaning.
    pub fn tag(self) -> u32 {
        match self {
            NodeKind::CompilationUnit => 1,
            NodeKind::Function => 2,
            NodeKind::Parameter => 3,
            NodeKind::Block => 4,
            NodeKind::While => 5,
            NodeKind::If => 6,
            NodeKind::ExpressionStatement => 7,
            NodeKind::Return => 8,
            NodeKind::BinaryExpression => 9,
            NodeKind::Call => 10,
            NodeKind::Identifier => 11,
            NodeKind::Literal => 12,
        }
    }

    /// Resolves a codec tag back to a kind. `None` for tags this schema
    /// does not know.
    pub fn from_tag(tag: u32) -> Option<NodeKind> {
        ALL_KINDS.iter().copied().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeCategory::Structure => "Structure",
            NodeCategory::Declaration => "Declaration",
            NodeCategory::Statement => "Statement",
            NodeCategory::Expression => "Expression",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_unique_and_nonzero() {
        let mut seen = std::collections::HashSet::new();
        for kind in ALL_KINDS {
            assert_ne!(kind.tag(), 0, "tag 0 is reserved");
            assert!(seen.insert(kind.tag()), "duplicate tag for {kind}");
        }
    }

    #[test]
    fn tag_roundtrip() {
        for kind in ALL_KINDS {
            assert_eq!(NodeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(NodeKind::from_tag(0), None);
        assert_eq!(NodeKind::from_tag(9999), None);
    }

    #[test]
    fn qualified_names_carry_category() {
        assert_eq!(NodeKind::While.qualified_name(), "statement::While");
        assert_eq!(
            NodeKind::Identifier.qualified_name(),
            "expression::Identifier"
        );
        for kind in ALL_KINDS {
            assert!(kind.qualified_name().ends_with(kind.name()));
        }
    }

    #[test]
    fn categories() {
        assert_eq!(NodeKind::CompilationUnit.category(), NodeCategory::Structure);
        assert_eq!(NodeKind::Function.category(), NodeCategory::Declaration);
        assert_eq!(NodeKind::While.category(), NodeCategory::Statement);
        assert_eq!(NodeKind::Literal.category(), NodeCategory::Expression);
    }
}
