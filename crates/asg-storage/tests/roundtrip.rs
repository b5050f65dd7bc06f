//! End-to-end persistence tests over a full compilation unit, through an
//! actual file.

use asg_core::{
    similarity, BinaryOperator, EdgeKind, Factory, LiteralKind, NodeId, NodeKind, Preorder,
    SimilarityConfig, SourcePosition, StructuralHasher, Visitor,
};
use asg_storage::{load_from_file, save_to_file};
use tempfile::NamedTempFile;

/// A small but representative program:
///
/// ```text
/// CompilationUnit "demo.src"
///   Function "count" (Parameter "limit")
///     Block
///       While (i < limit) { count(i) }
/// ```
///
/// with an identifier resolving back to the parameter and the call listing
/// the function itself as a candidate (reference cycle).
fn build_program(factory: &mut Factory) -> NodeId {
    let cu = factory.create(NodeKind::CompilationUnit);
    factory.set_path(cu, "demo.src").unwrap();

    let func = factory.create(NodeKind::Function);
    factory.set_name(func, "count").unwrap();
    let path = factory.strings_mut().intern("demo.src");
    factory
        .set_position(func, SourcePosition::new(Some(path), 1, 1, 12, 2))
        .unwrap();
    factory.add_edge(cu, EdgeKind::Declarations, func).unwrap();

    let limit = factory.create(NodeKind::Parameter);
    factory.set_name(limit, "limit").unwrap();
    factory.add_edge(func, EdgeKind::Parameters, limit).unwrap();

    let body = factory.create(NodeKind::Block);
    factory.set_edge(func, EdgeKind::Body, Some(body)).unwrap();

    let w = factory.create(NodeKind::While);
    factory.add_edge(body, EdgeKind::Statements, w).unwrap();

    let cond = factory.create(NodeKind::BinaryExpression);
    factory.set_operator(cond, BinaryOperator::Less).unwrap();
    let i_ref = factory.create(NodeKind::Identifier);
    factory.set_name(i_ref, "i").unwrap();
    let limit_ref = factory.create(NodeKind::Identifier);
    factory.set_name(limit_ref, "limit").unwrap();
    factory.set_edge(limit_ref, EdgeKind::Declaration, Some(limit)).unwrap();
    factory.set_edge(cond, EdgeKind::Left, Some(i_ref)).unwrap();
    factory.set_edge(cond, EdgeKind::Right, Some(limit_ref)).unwrap();
    factory.set_edge(w, EdgeKind::Condition, Some(cond)).unwrap();

    let loop_body = factory.create(NodeKind::Block);
    factory.set_edge(w, EdgeKind::Body, Some(loop_body)).unwrap();
    let stmt = factory.create(NodeKind::ExpressionStatement);
    factory.add_edge(loop_body, EdgeKind::Statements, stmt).unwrap();

    let call = factory.create(NodeKind::Call);
    let callee = factory.create(NodeKind::Identifier);
    factory.set_name(callee, "count").unwrap();
    factory.set_edge(call, EdgeKind::Callee, Some(callee)).unwrap();
    let arg = factory.create(NodeKind::Identifier);
    factory.set_name(arg, "i").unwrap();
    factory.add_edge(call, EdgeKind::Arguments, arg).unwrap();
    factory.add_edge(call, EdgeKind::Candidates, func).unwrap();
    factory.set_edge(stmt, EdgeKind::Expression, Some(call)).unwrap();

    cu
}

#[derive(Default)]
struct KindTrace(Vec<&'static str>);

impl Visitor for KindTrace {
    fn visit_compilation_unit(&mut self, _n: &asg_core::Node, _d: &asg_core::node::CompilationUnitNode) {
        self.0.push("CompilationUnit");
    }
    fn visit_function(&mut self, _n: &asg_core::Node, _d: &asg_core::node::FunctionNode) {
        self.0.push("Function");
    }
    fn visit_while(&mut self, _n: &asg_core::Node, _d: &asg_core::node::WhileNode) {
        self.0.push("While");
    }
    fn visit_call(&mut self, _n: &asg_core::Node, _d: &asg_core::node::CallNode) {
        self.0.push("Call");
    }
}

#[test]
fn file_roundtrip_preserves_structure_queries_and_hash() {
    let mut factory = Factory::new();
    let cu = build_program(&mut factory);

    let file = NamedTempFile::new().unwrap();
    save_to_file(&factory, file.path()).unwrap();
    let loaded = load_from_file(file.path()).unwrap();

    // Same node population.
    assert_eq!(loaded.node_count(), factory.node_count());
    let loaded_cu = loaded.root().unwrap();
    assert_eq!(loaded.path(loaded_cu).unwrap(), Some("demo.src"));

    // Traversal sees the same shape in the same order.
    let mut before = KindTrace::default();
    Preorder::new().run_from(&factory, cu, &mut before).unwrap();
    let mut after = KindTrace::default();
    Preorder::new().run_from(&loaded, loaded_cu, &mut after).unwrap();
    assert_eq!(before.0, after.0);

    // Structural signatures agree despite id and key renumbering.
    let mut ha = StructuralHasher::new();
    let mut hb = StructuralHasher::new();
    assert_eq!(
        ha.structural_hash(&factory, cu).unwrap(),
        hb.structural_hash(&loaded, loaded_cu).unwrap()
    );

    // Upward queries work out of the box: the loaded store's reverse index
    // was rebuilt during edge wiring.
    let loaded_func = loaded
        .multi_targets(loaded_cu, EdgeKind::Declarations)
        .unwrap()[0];
    assert_eq!(
        loaded.reverse_lookup(loaded_func, EdgeKind::Candidates).unwrap().len(),
        1
    );
}

#[test]
fn saving_the_loaded_store_is_stable() {
    let mut factory = Factory::new();
    build_program(&mut factory);

    let bytes = asg_storage::save(&factory).unwrap();
    let loaded = asg_storage::load(&bytes).unwrap();
    let again = asg_storage::save(&loaded).unwrap();

    // After one renumbering pass the stream is a fixpoint.
    assert_eq!(bytes, again);
}

#[test]
fn clone_detection_survives_persistence() {
    let mut factory = Factory::new();
    build_program(&mut factory);

    let loaded = asg_storage::load(&asg_storage::save(&factory).unwrap()).unwrap();

    // The two "i" identifiers are clones of each other in the loaded store.
    let idents: Vec<NodeId> = loaded
        .nodes()
        .filter(|n| n.kind() == NodeKind::Identifier)
        .map(|n| n.id)
        .collect();
    assert_eq!(idents.len(), 4);
    let config = SimilarityConfig::default();
    for &a in &idents {
        assert_eq!(similarity(&loaded, a, a, &config).unwrap(), 1.0);
        for &b in &idents {
            let ab = similarity(&loaded, a, b, &config).unwrap();
            let ba = similarity(&loaded, b, a, &config).unwrap();
            assert!((ab - ba).abs() < 1e-12);
        }
    }
    let i_pair: Vec<NodeId> = idents
        .iter()
        .copied()
        .filter(|&id| loaded.name(id).unwrap() == Some("i"))
        .collect();
    assert_eq!(i_pair.len(), 2);
    assert_eq!(
        similarity(&loaded, i_pair[0], i_pair[1], &config).unwrap(),
        1.0
    );
}

#[test]
fn filtered_nodes_stay_filtered_after_reload() {
    let mut factory = Factory::new();
    let cu = build_program(&mut factory);
    // Filter the whole function out.
    let func = factory.multi_targets(cu, EdgeKind::Declarations).unwrap()[0];
    factory.set_filtered(func, true).unwrap();

    let loaded = asg_storage::load(&asg_storage::save(&factory).unwrap()).unwrap();
    let loaded_cu = loaded.root().unwrap();
    assert!(loaded
        .multi_targets(loaded_cu, EdgeKind::Declarations)
        .unwrap()
        .is_empty());

    let mut trace = KindTrace::default();
    Preorder::new().run_from(&loaded, loaded_cu, &mut trace).unwrap();
    assert_eq!(trace.0, vec!["CompilationUnit"]);
}

#[test]
fn literal_scalars_roundtrip_through_a_file() {
    let mut factory = Factory::new();
    let lit = factory.create(NodeKind::Literal);
    factory.set_literal_kind(lit, LiteralKind::String).unwrap();
    factory.set_text(lit, "hello, world").unwrap();

    let file = NamedTempFile::new().unwrap();
    save_to_file(&factory, file.path()).unwrap();
    let loaded = load_from_file(file.path()).unwrap();

    assert_eq!(loaded.text(NodeId(1)).unwrap(), Some("hello, world"));
}
