//! The visitor: one `visit`/`visit_end` pair per node kind.
//!
//! Every method defaults to a no-op, so a visitor implements only the kinds
//! it cares about. Dispatch is a closed match over the payload variant —
//! [`dispatch`] fires the pre-order hook, [`dispatch_end`] the post-order
//! one. The traversal driver lives in [`preorder`](crate::preorder).

use crate::node::{
    BinaryExpressionNode, BlockNode, CallNode, CompilationUnitNode, ExpressionStatementNode,
    FunctionNode, IdentifierNode, IfNode, LiteralNode, Node, NodeData, ParameterNode, ReturnNode,
    WhileNode,
};

/// Per-kind visit hooks. All methods default to doing nothing.
///
/// A visitor must not mutate the factory it is being driven over; traversal
/// borrows the factory for its whole run.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_compilation_unit(&mut self, node: &Node, data: &CompilationUnitNode) {}
    fn visit_end_compilation_unit(&mut self, node: &Node, data: &CompilationUnitNode) {}

    fn visit_function(&mut self, node: &Node, data: &FunctionNode) {}
    fn visit_end_function(&mut self, node: &Node, data: &FunctionNode) {}

    fn visit_parameter(&mut self, node: &Node, data: &ParameterNode) {}
    fn visit_end_parameter(&mut self, node: &Node, data: &ParameterNode) {}

    fn visit_block(&mut self, node: &Node, data: &BlockNode) {}
    fn visit_end_block(&mut self, node: &Node, data: &BlockNode) {}

    fn visit_while(&mut self, node: &Node, data: &WhileNode) {}
    fn visit_end_while(&mut self, node: &Node, data: &WhileNode) {}

    fn visit_if(&mut self, node: &Node, data: &IfNode) {}
    fn visit_end_if(&mut self, node: &Node, data: &IfNode) {}

    fn visit_expression_statement(&mut self, node: &Node, data: &ExpressionStatementNode) {}
    fn visit_end_expression_statement(&mut self, node: &Node, data: &ExpressionStatementNode) {}

    fn visit_return(&mut self, node: &Node, data: &ReturnNode) {}
    fn visit_end_return(&mut self, node: &Node, data: &ReturnNode) {}

    fn visit_binary_expression(&mut self, node: &Node, data: &BinaryExpressionNode) {}
    fn visit_end_binary_expression(&mut self, node: &Node, data: &BinaryExpressionNode) {}

    fn visit_call(&mut self, node: &Node, data: &CallNode) {}
    fn visit_end_call(&mut self, node: &Node, data: &CallNode) {}

    fn visit_identifier(&mut self, node: &Node, data: &IdentifierNode) {}
    fn visit_end_identifier(&mut self, node: &Node, data: &IdentifierNode) {}

    fn visit_literal(&mut self, node: &Node, data: &LiteralNode) {}
    fn visit_end_literal(&mut self, node: &Node, data: &LiteralNode) {}
}

/// Fires the pre-order hook matching `node`'s kind.
pub fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match &node.data {
        NodeData::CompilationUnit(d) => visitor.visit_compilation_unit(node, d),
        NodeData::Function(d) => visitor.visit_function(node, d),
        NodeData::Parameter(d) => visitor.visit_parameter(node, d),
        NodeData::Block(d) => visitor.visit_block(node, d),
        NodeData::While(d) => visitor.visit_while(node, d),
        NodeData::If(d) => visitor.visit_if(node, d),
        NodeData::ExpressionStatement(d) => visitor.visit_expression_statement(node, d),
        NodeData::Return(d) => visitor.visit_return(node, d),
        NodeData::BinaryExpression(d) => visitor.visit_binary_expression(node, d),
        NodeData::Call(d) => visitor.visit_call(node, d),
        NodeData::Identifier(d) => visitor.visit_identifier(node, d),
        NodeData::Literal(d) => visitor.visit_literal(node, d),
    }
}

/// Fires the post-order hook matching `node`'s kind.
pub fn dispatch_end<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match &node.data {
        NodeData::CompilationUnit(d) => visitor.visit_end_compilation_unit(node, d),
        NodeData::Function(d) => visitor.visit_end_function(node, d),
        NodeData::Parameter(d) => visitor.visit_end_parameter(node, d),
        NodeData::Block(d) => visitor.visit_end_block(node, d),
        NodeData::While(d) => visitor.visit_end_while(node, d),
        NodeData::If(d) => visitor.visit_end_if(node, d),
        NodeData::ExpressionStatement(d) => visitor.visit_end_expression_statement(node, d),
        NodeData::Return(d) => visitor.visit_end_return(node, d),
        NodeData::BinaryExpression(d) => visitor.visit_end_binary_expression(node, d),
        NodeData::Call(d) => visitor.visit_end_call(node, d),
        NodeData::Identifier(d) => visitor.visit_end_identifier(node, d),
        NodeData::Literal(d) => visitor.visit_end_literal(node, d),
    }
}
