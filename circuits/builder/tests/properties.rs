use circuit_builder::{
    compile, diagnostics::has_fatal, linearize, ErrorKind, Graph, Node, Operator,
};
use proptest::prelude::*;
use proptest::sample::Index;

/// `(operator, left source, right source)` for each operation node; sources
/// are picked among the nodes created before it, so the result is a DAG.
type OpPlan = Vec<(usize, Index, Index)>;

fn build(inputs: usize, plan: &OpPlan, prefix: &str) -> Graph {
    let mut graph = Graph::new();
    let mut ids: Vec<String> = Vec::new();
    for position in 0..inputs {
        let id = format!("{prefix}i{position}");
        let label = format!("In {position}");
        if position % 2 == 1 {
            graph.push_node(Node::public_input(id.clone(), label));
        } else {
            graph.push_node(Node::private_input(id.clone(), label));
        }
        ids.push(id);
    }
    for (position, (operator, left, right)) in plan.iter().enumerate() {
        let id = format!("{prefix}op{position:02}");
        graph.push_node(Node::operation(id.clone(), Operator::ALL[*operator]));
        let left = left.get(&ids).clone();
        let right = right.get(&ids).clone();
        graph.connect(&left, &id, "a").connect(&right, &id, "b");
        ids.push(id);
    }
    let output = format!("{prefix}zz-out");
    let last = ids.last().cloned().unwrap_or_default();
    graph
        .push_node(Node::number_output(output.clone(), "Result"))
        .connect(&last, &output, "in");
    graph
}

fn arb_plan() -> impl Strategy<Value = (usize, OpPlan)> {
    (
        2usize..5,
        prop::collection::vec(
            (0..Operator::ALL.len(), any::<Index>(), any::<Index>()),
            1..8,
        ),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    fn compile_is_idempotent((inputs, plan) in arb_plan()) {
        let graph = build(inputs, &plan, "");
        let first = compile(&graph);
        let second = compile(&graph);
        prop_assert!(!has_fatal(&first.diagnostics), "{:?}", first.diagnostics);
        prop_assert!(first.is_emitted());
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    fn linear_order_respects_every_edge((inputs, plan) in arb_plan()) {
        let graph = build(inputs, &plan, "");
        let order = linearize(&graph).expect("generated graphs are acyclic");
        let ids = order.ids();
        prop_assert_eq!(ids.len(), graph.nodes.len());
        for edge in &graph.edges {
            let source = ids.iter().position(|id| *id == edge.source).expect("source");
            let target = ids.iter().position(|id| *id == edge.target).expect("target");
            prop_assert!(source < target);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    fn relabeling_ids_only_changes_derived_names((inputs, plan) in arb_plan()) {
        let original = compile(&build(inputs, &plan, ""));
        let relabeled = compile(&build(inputs, &plan, "x-"));
        prop_assert_eq!(&original.metrics, &relabeled.metrics);
        prop_assert_eq!(relabeled.code.replace("n_x_", "n_"), original.code);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    fn unwired_operand_is_always_gated((inputs, plan) in arb_plan(), pick in any::<Index>()) {
        let mut graph = build(inputs, &plan, "");
        let target = format!("op{:02}", pick.index(plan.len()));
        graph.edges.retain(|edge| !(edge.target == target && edge.target_port == "b"));
        let output = compile(&graph);
        prop_assert!(output
            .diagnostics
            .iter()
            .any(|diag| diag.error_kind == ErrorKind::ArityMismatch
                && diag.node_id.as_deref() == Some(target.as_str())));
        prop_assert!(!output.is_emitted());
        prop_assert_eq!(output.metrics.constraints, 0);
        prop_assert_eq!(output.metrics.estimated_time.as_str(), "unknown");
        prop_assert_eq!(output.source_digest(), None);
    }
}
