//! Constraint-count and proving-time estimate.
//!
//! The estimate is a plain sum of per-node costs taken from a [`CostTable`]
//! and mapped onto a coarse time bucket. The numbers are a tunable policy,
//! not a measurement.

use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::diagnostics::{has_fatal, Diagnostic};
use crate::graph::{Node, NodeKind, Operator};
use crate::linearize::LinearOrder;
use crate::params::Primitive;

/// Reported when estimation is gated.
pub const UNKNOWN_TIME: &str = "unknown";

/// Upper constraint bound (exclusive) of each proving-time bucket.
const TIME_BUCKETS: &[(u64, &str)] = &[
    (1_000, "< 1s"),
    (10_000, "~1-2s"),
    (50_000, "~2-5s"),
    (200_000, "~5-15s"),
    (1_000_000, "~15-60s"),
];
const SLOWEST_BUCKET: &str = "> 1min";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    pub input: u64,
    pub output: u64,
    /// add / subtract.
    pub linear: u64,
    pub multiply: u64,
    pub divide: u64,
    pub comparator_base: u64,
    pub comparator_per_bit: u64,
    pub range_check_and: u64,
    pub hash_per_input: u64,
    pub conditional: u64,
    pub merkle_per_level: u64,
    pub modulo: u64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            input: 0,
            output: 1,
            linear: 1,
            multiply: 1,
            divide: 2,
            comparator_base: 1,
            comparator_per_bit: 1,
            range_check_and: 1,
            hash_per_input: 240,
            conditional: 3,
            merkle_per_level: 245,
            modulo: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub constraints: u64,
    pub estimated_time: String,
}

impl Estimate {
    pub fn unknown() -> Self {
        Self {
            constraints: 0,
            estimated_time: UNKNOWN_TIME.to_string(),
        }
    }

    pub fn from_constraints(constraints: u64) -> Self {
        Self {
            constraints,
            estimated_time: time_bucket(constraints).to_string(),
        }
    }
}

/// Monotonic mapping from constraint count to a proving-time label.
pub fn time_bucket(constraints: u64) -> &'static str {
    TIME_BUCKETS
        .iter()
        .find(|(bound, _)| constraints < *bound)
        .map(|(_, label)| *label)
        .unwrap_or(SLOWEST_BUCKET)
}

pub struct ComplexityEstimator<'c> {
    config: &'c CompilerConfig,
}

impl<'c> ComplexityEstimator<'c> {
    pub fn new(config: &'c CompilerConfig) -> Self {
        Self { config }
    }

    /// Estimate for a linearized graph; `unknown` whenever a fatal
    /// diagnostic is present or a node's cost cannot be determined.
    pub fn estimate(&self, order: &LinearOrder<'_>, diagnostics: &[Diagnostic]) -> Estimate {
        if has_fatal(diagnostics) {
            return Estimate::unknown();
        }
        match self.constraint_count(order.nodes()) {
            Some(total) => Estimate::from_constraints(total),
            None => Estimate::unknown(),
        }
    }

    pub fn constraint_count<'n, I>(&self, nodes: I) -> Option<u64>
    where
        I: IntoIterator<Item = &'n Node>,
    {
        nodes.into_iter().try_fold(0u64, |total, node| {
            self.node_cost(node).map(|cost| total.saturating_add(cost))
        })
    }

    /// Cost of a single node, or `None` if its parameters do not resolve.
    pub fn node_cost(&self, node: &Node) -> Option<u64> {
        let costs = &self.config.costs;
        let comparator = self.comparator_cost();
        let cost = match &node.kind {
            NodeKind::PrivateInput { .. } | NodeKind::PublicInput { .. } => costs.input,
            NodeKind::Operation { operator } => match operator {
                Operator::Add | Operator::Subtract => costs.linear,
                Operator::Multiply => costs.multiply,
                Operator::Divide => costs.divide,
                Operator::Gt | Operator::Lt | Operator::Eq => comparator,
            },
            NodeKind::AdvancedOperation { operator, params } => {
                match Primitive::resolve(*operator, params, self.config).ok()? {
                    Primitive::RangeCheck { .. } => comparator
                        .saturating_mul(2)
                        .saturating_add(costs.range_check_and),
                    Primitive::Hash { inputs } => costs.hash_per_input.saturating_mul(inputs as u64),
                    Primitive::Conditional { .. } => costs.conditional.saturating_add(comparator),
                    Primitive::MerkleProof { depth } => costs
                        .merkle_per_level
                        .saturating_mul(u64::from(depth))
                        .saturating_add(comparator),
                    Primitive::Modulo { .. } => costs
                        .modulo
                        .saturating_add(comparator)
                        .saturating_add(self.bit_decomposition_cost()),
                }
            }
            NodeKind::BooleanOutput { .. } | NodeKind::NumberOutput { .. } => costs.output,
        };
        Some(cost)
    }

    fn comparator_cost(&self) -> u64 {
        let costs = &self.config.costs;
        costs
            .comparator_per_bit
            .saturating_mul(u64::from(self.config.comparator_bits))
            .saturating_add(costs.comparator_base)
    }

    /// `Num2Bits(bits)` on a witness-only signal.
    fn bit_decomposition_cost(&self) -> u64 {
        self.config
            .costs
            .comparator_per_bit
            .saturating_mul(u64::from(self.config.comparator_bits))
    }
}

/// Ungated estimate over an ordered node list with the default config.
pub fn estimate<'n, I>(nodes: I) -> Estimate
where
    I: IntoIterator<Item = &'n Node>,
{
    let config = CompilerConfig::default();
    match ComplexityEstimator::new(&config).constraint_count(nodes) {
        Some(total) => Estimate::from_constraints(total),
        None => Estimate::unknown(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorKind;
    use crate::graph::{AdvancedOperator, Graph};
    use crate::linearize::linearize;

    #[test]
    fn buckets_are_monotonic() {
        let samples = [0, 999, 1_000, 9_999, 49_999, 199_999, 999_999, 1_000_000, u64::MAX];
        let ranks: Vec<usize> = samples
            .iter()
            .map(|count| {
                let label = time_bucket(*count);
                TIME_BUCKETS
                    .iter()
                    .position(|(_, bucket)| *bucket == label)
                    .unwrap_or(TIME_BUCKETS.len())
            })
            .collect();
        assert!(ranks.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(time_bucket(u64::MAX), SLOWEST_BUCKET);
    }

    #[test]
    fn per_kind_costs_follow_policy() {
        let config = CompilerConfig::default();
        let estimator = ComplexityEstimator::new(&config);
        let gt = Node::operation("gt", Operator::Gt);
        let add = Node::operation("add", Operator::Add);
        let range = Node::advanced(
            "r",
            AdvancedOperator::RangeCheck,
            &[("min", "1"), ("max", "9")],
        );
        let hash = Node::advanced("h", AdvancedOperator::Hash, &[("inputs", "3")]);
        let merkle = Node::advanced("m", AdvancedOperator::MerkleProof, &[("depth", "4")]);
        let modulo = Node::advanced("mod", AdvancedOperator::Modulo, &[("modulus", "7")]);

        assert_eq!(estimator.node_cost(&add), Some(1));
        assert_eq!(estimator.node_cost(&gt), Some(33));
        assert_eq!(estimator.node_cost(&range), Some(67));
        assert_eq!(estimator.node_cost(&hash), Some(720));
        assert_eq!(estimator.node_cost(&merkle), Some(4 * 245 + 33));
        assert_eq!(estimator.node_cost(&modulo), Some(2 + 33 + 32));
    }

    #[test]
    fn comparator_cost_scales_with_bit_width() {
        let mut config = CompilerConfig::default();
        config.comparator_bits = 64;
        let estimator = ComplexityEstimator::new(&config);
        assert_eq!(
            estimator.node_cost(&Node::operation("lt", Operator::Lt)),
            Some(65)
        );
    }

    #[test]
    fn unresolvable_parameters_give_unknown() {
        let nodes = [
            Node::private_input("x", "X"),
            Node::advanced("h", AdvancedOperator::Hash, &[]),
        ];
        assert_eq!(estimate(nodes.iter()), Estimate::unknown());
    }

    #[test]
    fn fatal_diagnostics_gate_the_estimate() {
        let mut graph = Graph::new();
        graph
            .push_node(Node::private_input("x", "X"))
            .push_node(Node::number_output("out", "Out"))
            .connect("x", "out", "in");
        let order = linearize(&graph).expect("dag");
        let config = CompilerConfig::default();
        let estimator = ComplexityEstimator::new(&config);
        assert_eq!(estimator.estimate(&order, &[]), Estimate::from_constraints(1));
        let blocked = [Diagnostic::graph(ErrorKind::DanglingEdge, "stale")];
        assert_eq!(estimator.estimate(&order, &blocked), Estimate::unknown());
    }
}
