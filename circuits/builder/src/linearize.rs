//! Topological linearization (Kahn's algorithm).
//!
//! Ready nodes are taken in ascending id order, so an unchanged graph always
//! yields the same sequence. A cycle leaves nodes behind and is reported as
//! [`LinearizeError::Cycle`]; nothing is silently dropped.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::LinearizeError;
use crate::graph::{Graph, GraphIndex, Node};

/// Nodes of a graph in dependency order, together with the index that
/// resolves their wiring.
#[derive(Clone, Debug)]
pub struct LinearOrder<'g> {
    index: GraphIndex<'g>,
    order: Vec<usize>,
}

impl<'g> LinearOrder<'g> {
    pub fn index(&self) -> &GraphIndex<'g> {
        &self.index
    }

    /// Node positions (into `graph.nodes`) in emission order.
    pub fn positions(&self) -> &[usize] {
        &self.order
    }

    pub fn nodes(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.order.iter().map(move |idx| self.index.node(*idx))
    }

    pub fn ids(&self) -> Vec<&'g str> {
        self.nodes().map(|node| node.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops nodes that cannot reach any output. Returns the ids removed.
    pub fn prune_unused(&mut self) -> Vec<&'g str> {
        let useful = self.index.reaching(self.index.outputs());
        let index = &self.index;
        let mut removed = Vec::new();
        self.order.retain(|idx| {
            if useful[*idx] {
                true
            } else {
                removed.push(index.node(*idx).id.as_str());
                false
            }
        });
        if !removed.is_empty() {
            tracing::debug!(pruned = removed.len(), "dropped nodes without a path to an output");
        }
        removed
    }
}

pub fn linearize(graph: &Graph) -> Result<LinearOrder<'_>, LinearizeError> {
    linearize_indexed(GraphIndex::build(graph))
}

pub fn linearize_indexed(index: GraphIndex<'_>) -> Result<LinearOrder<'_>, LinearizeError> {
    if let Some(shadowed) = (0..index.graph().nodes.len()).find(|idx| index.is_shadowed(*idx)) {
        return Err(LinearizeError::DuplicateId(index.node(shadowed).id.clone()));
    }

    let node_count = index.graph().nodes.len();
    let mut in_degree = vec![0usize; node_count];
    for edge in index.valid_edges() {
        if let Some((_, target)) = index.endpoints(edge) {
            in_degree[target] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<(&str, usize)>> = index
        .node_indices()
        .filter(|idx| in_degree[*idx] == 0)
        .map(|idx| Reverse((index.node(idx).id.as_str(), idx)))
        .collect();

    let mut order = Vec::with_capacity(node_count);
    while let Some(Reverse((_, node))) = ready.pop() {
        order.push(node);
        for edge in index.outgoing(node) {
            let Some((_, target)) = index.endpoints(*edge) else {
                continue;
            };
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.push(Reverse((index.node(target).id.as_str(), target)));
            }
        }
    }

    if order.len() < node_count {
        let mut unresolved: Vec<String> = index
            .node_indices()
            .filter(|idx| in_degree[*idx] > 0)
            .map(|idx| index.node(idx).id.clone())
            .collect();
        unresolved.sort();
        return Err(LinearizeError::Cycle { unresolved });
    }

    Ok(LinearOrder { index, order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, Operator};

    #[test]
    fn ties_break_by_ascending_id() {
        let mut graph = Graph::new();
        graph
            .push_node(Node::operation("m", Operator::Multiply))
            .push_node(Node::private_input("c", "C"))
            .push_node(Node::private_input("a", "A"))
            .push_node(Node::public_input("b", "B"))
            .push_node(Node::number_output("z", "Z"))
            .connect("c", "m", "a")
            .connect("a", "m", "b")
            .connect("m", "z", "in");
        let order = linearize(&graph).expect("dag");
        assert_eq!(order.ids(), vec!["a", "b", "c", "m", "z"]);
    }

    #[test]
    fn every_edge_points_forward() {
        let mut graph = Graph::new();
        graph
            .push_node(Node::number_output("9-out", "Out"))
            .push_node(Node::operation("5-sub", Operator::Subtract))
            .push_node(Node::operation("1-add", Operator::Add))
            .push_node(Node::private_input("7-x", "X"))
            .push_node(Node::private_input("8-y", "Y"))
            .connect("7-x", "1-add", "a")
            .connect("8-y", "1-add", "b")
            .connect("1-add", "5-sub", "a")
            .connect("7-x", "5-sub", "b")
            .connect("5-sub", "9-out", "in");
        let order = linearize(&graph).expect("dag");
        let ids = order.ids();
        for edge in &graph.edges {
            let source = ids.iter().position(|id| *id == edge.source).unwrap();
            let target = ids.iter().position(|id| *id == edge.target).unwrap();
            assert!(source < target, "{} must precede {}", edge.source, edge.target);
        }
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn cycle_is_an_error_not_a_partial_order() {
        let mut graph = Graph::new();
        graph
            .push_node(Node::operation("A", Operator::Add))
            .push_node(Node::operation("B", Operator::Add))
            .push_node(Node::private_input("x", "X"))
            .connect("A", "B", "a")
            .connect("B", "A", "a")
            .connect("x", "A", "b");
        let err = linearize(&graph).unwrap_err();
        assert_eq!(
            err,
            LinearizeError::Cycle {
                unresolved: vec!["A".to_string(), "B".to_string()]
            }
        );
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut graph = Graph::new();
        graph
            .push_node(Node::private_input("x", "X"))
            .push_node(Node::private_input("x", "Y"));
        assert_eq!(
            linearize(&graph).unwrap_err(),
            LinearizeError::DuplicateId("x".to_string())
        );
    }

    #[test]
    fn pruning_keeps_only_output_feeding_nodes() {
        let mut graph = Graph::new();
        graph
            .push_node(Node::private_input("x", "X"))
            .push_node(Node::private_input("unused", "Unused"))
            .push_node(Node::number_output("out", "Out"))
            .connect("x", "out", "in");
        let mut order = linearize(&graph).expect("dag");
        assert_eq!(order.prune_unused(), vec!["unused"]);
        assert_eq!(order.ids(), vec!["x", "out"]);
    }
}
