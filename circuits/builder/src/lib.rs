//! Compiler from visual circuit graphs to circom source.
//!
//! A compile call runs validation, topological linearization, emission and
//! cost estimation over one read-only [`Graph`] snapshot and returns
//! `{ code, diagnostics, metrics }`. Structural problems are reported as
//! [`Diagnostic`]s; whenever one of them is fatal the code is a placeholder
//! and the estimate is `unknown`.

pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod document;
pub mod emit;
pub mod error;
pub mod estimate;
pub mod graph;
pub mod linearize;
pub mod params;
pub mod templates;
pub mod validator;

use serde::{Deserialize, Serialize};

pub use crate::config::CompilerConfig;
pub use crate::diagnostics::{Diagnostic, ErrorKind, Severity};
pub use crate::document::CircuitDocument;
pub use crate::emit::{is_placeholder, CodeEmitter};
pub use crate::error::{ConfigError, DocumentError, LinearizeError};
pub use crate::estimate::{ComplexityEstimator, CostTable, Estimate};
pub use crate::graph::{AdvancedOperator, Edge, Graph, GraphIndex, Node, NodeKind, Operator};
pub use crate::linearize::{linearize, LinearOrder};
pub use crate::validator::{validate, Validator};

use crate::constants::SOURCE_DIGEST_DOMAIN_TAG;
use crate::diagnostics::has_fatal;
use crate::linearize::linearize_indexed;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub constraints: u64,
    pub estimated_time: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: Metrics,
}

impl CompileOutput {
    pub fn has_fatal(&self) -> bool {
        has_fatal(&self.diagnostics)
    }

    /// True when `code` is circuit source rather than a placeholder.
    pub fn is_emitted(&self) -> bool {
        !is_placeholder(&self.code)
    }

    /// Domain-separated blake3 digest of the emitted source.
    pub fn source_digest(&self) -> Option<[u8; 32]> {
        if !self.is_emitted() {
            return None;
        }
        let mut hasher = blake3::Hasher::new();
        hasher.update(SOURCE_DIGEST_DOMAIN_TAG);
        hasher.update(&(self.code.len() as u64).to_le_bytes());
        hasher.update(self.code.as_bytes());
        Some(hasher.finalize().into())
    }

    pub fn source_digest_hex(&self) -> Option<String> {
        self.source_digest().map(hex::encode)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CircuitCompiler {
    config: CompilerConfig,
}

impl CircuitCompiler {
    pub fn new(config: CompilerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(&self, graph: &Graph) -> CompileOutput {
        let index = GraphIndex::build(graph);
        let mut diagnostics = Validator::new(&self.config).validate_indexed(&index);
        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            diagnostics = diagnostics.len(),
            "validated circuit graph"
        );

        let blocked = |diagnostics: Vec<Diagnostic>| CompileOutput {
            code: emit::placeholder(&diagnostics),
            metrics: metrics(graph, Estimate::unknown()),
            diagnostics,
        };

        if has_fatal(&diagnostics) {
            return blocked(diagnostics);
        }

        let mut order = match linearize_indexed(index) {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(error = %err, "linearizer rejected a validated graph");
                diagnostics.push(err.to_diagnostic());
                return blocked(diagnostics);
            }
        };
        order.prune_unused();

        let code = CodeEmitter::new(&self.config).emit(&order, &diagnostics);
        let estimate = if is_placeholder(&code) {
            Estimate::unknown()
        } else {
            ComplexityEstimator::new(&self.config).estimate(&order, &diagnostics)
        };
        tracing::debug!(
            constraints = estimate.constraints,
            emitted = !is_placeholder(&code),
            "compiled circuit graph"
        );

        CompileOutput {
            code,
            metrics: metrics(graph, estimate),
            diagnostics,
        }
    }
}

fn metrics(graph: &Graph, estimate: Estimate) -> Metrics {
    Metrics {
        node_count: graph.nodes.len(),
        edge_count: graph.edges.len(),
        constraints: estimate.constraints,
        estimated_time: estimate.estimated_time,
    }
}

/// Compiles `graph` with the default configuration.
pub fn compile(graph: &Graph) -> CompileOutput {
    CircuitCompiler::default().compile(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adder() -> Graph {
        let mut graph = Graph::new();
        graph
            .push_node(Node::private_input("x", "X"))
            .push_node(Node::public_input("y", "Y"))
            .push_node(Node::operation("sum", Operator::Add))
            .push_node(Node::number_output("out", "Total"))
            .connect("x", "sum", "a")
            .connect("y", "sum", "b")
            .connect("sum", "out", "in");
        graph
    }

    #[test]
    fn clean_graph_emits_and_estimates() {
        let output = compile(&adder());
        assert!(output.diagnostics.is_empty());
        assert!(output.is_emitted());
        assert!(output.code.contains("n_sum <== x + y;"));
        assert_eq!(output.metrics.node_count, 4);
        assert_eq!(output.metrics.edge_count, 3);
        assert_eq!(output.metrics.constraints, 2);
        assert_eq!(output.metrics.estimated_time, "< 1s");
        assert_eq!(output.source_digest_hex().map(|hex| hex.len()), Some(64));
    }

    #[test]
    fn fatal_graph_is_gated() {
        let mut graph = adder();
        graph.remove_edge("ey-sum:b");
        let output = compile(&graph);
        assert!(output.has_fatal());
        assert!(!output.is_emitted());
        assert_eq!(output.metrics.constraints, 0);
        assert_eq!(output.metrics.estimated_time, "unknown");
        assert_eq!(output.metrics.edge_count, 2);
        assert_eq!(output.source_digest(), None);
    }

    #[test]
    fn digest_tracks_configuration() {
        let graph = adder();
        let default = compile(&graph);
        let renamed = CircuitCompiler::new(CompilerConfig::with_template_name("Adder"))
            .expect("valid config")
            .compile(&graph);
        assert!(renamed.code.contains("template Adder() {"));
        assert_ne!(default.source_digest(), renamed.source_digest());
        assert_eq!(default.source_digest(), compile(&graph).source_digest());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = CompilerConfig::default();
        config.comparator_bits = 0;
        assert!(matches!(
            CircuitCompiler::new(config),
            Err(ConfigError::InvalidComparatorBits(0))
        ));
    }

    #[test]
    fn output_serializes_with_camel_case_metrics() {
        let json = serde_json::to_value(compile(&adder())).unwrap();
        assert_eq!(json["metrics"]["nodeCount"], 4);
        assert_eq!(json["metrics"]["estimatedTime"], "< 1s");
        assert!(json["diagnostics"].as_array().unwrap().is_empty());
    }
}
