//! Static checks over a graph snapshot.
//!
//! The validator runs a fixed list of independent checkers. Each one scans
//! the whole graph and appends diagnostics; none of them stops the others,
//! so a single pass reports every problem the editor should highlight. The
//! graph is never modified.

use std::collections::{BTreeMap, HashMap};

use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostic, ErrorKind};
use crate::graph::{EdgeFault, Graph, GraphIndex, NodeKind, PortSet, ValueType};
use crate::params::Primitive;

type Checker = fn(&CheckContext<'_, '_>, &mut Vec<Diagnostic>);

/// Checkers in reporting order.
const CHECKERS: &[(&str, Checker)] = &[
    ("uniqueness", check_unique_ids),
    ("edge-integrity", check_edge_integrity),
    ("cycles", check_cycles),
    ("orphans", check_orphans),
    ("arity", check_arity),
    ("parameters", check_parameters),
    ("output-reachability", check_output_reachability),
    ("types", check_types),
];

struct CheckContext<'a, 'g> {
    index: &'a GraphIndex<'g>,
    config: &'a CompilerConfig,
}

pub struct Validator<'c> {
    config: &'c CompilerConfig,
}

impl<'c> Validator<'c> {
    pub fn new(config: &'c CompilerConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, graph: &Graph) -> Vec<Diagnostic> {
        self.validate_indexed(&GraphIndex::build(graph))
    }

    pub fn validate_indexed(&self, index: &GraphIndex<'_>) -> Vec<Diagnostic> {
        let ctx = CheckContext {
            index,
            config: self.config,
        };
        let mut diagnostics = Vec::new();
        for (name, checker) in CHECKERS {
            let before = diagnostics.len();
            checker(&ctx, &mut diagnostics);
            let found = diagnostics.len() - before;
            if found > 0 {
                tracing::debug!(checker = name, found, "validation checker reported");
            }
        }
        diagnostics
    }
}

/// Validates with the default configuration.
pub fn validate(graph: &Graph) -> Vec<Diagnostic> {
    Validator::new(&CompilerConfig::default()).validate(graph)
}

fn check_unique_ids(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for node in &ctx.index.graph().nodes {
        let count = seen.entry(node.id.as_str()).or_default();
        *count += 1;
        if *count == 2 {
            out.push(Diagnostic::node(
                ErrorKind::DuplicateId,
                node.id.clone(),
                format!("node id `{}` is declared more than once", node.id),
            ));
        }
    }
}

fn check_edge_integrity(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    for (edge_idx, edge) in index.graph().edges.iter().enumerate() {
        let Some(fault) = index.edge_fault(edge_idx) else {
            continue;
        };
        let message = match fault {
            EdgeFault::MissingSource => {
                format!("edge `{}` references missing source node `{}`", edge.id, edge.source)
            }
            EdgeFault::MissingTarget => {
                format!("edge `{}` references missing target node `{}`", edge.id, edge.target)
            }
            EdgeFault::UnknownSourcePort => {
                let source = lookup_node(index, &edge.source);
                if source.is_some_and(|node| node.is_output()) {
                    format!(
                        "edge `{}` leaves output node `{}`, which has no output port",
                        edge.id, edge.source
                    )
                } else {
                    format!(
                        "edge `{}` uses unknown source port `{}` on node `{}`",
                        edge.id, edge.source_port, edge.source
                    )
                }
            }
            EdgeFault::UnknownTargetPort => {
                let ports = lookup_node(index, &edge.target)
                    .map(|node| node.input_ports())
                    .unwrap_or(PortSet::Unresolved);
                if ports.is_empty() {
                    format!(
                        "edge `{}` targets input node `{}`, which accepts no incoming edges",
                        edge.id, edge.target
                    )
                } else {
                    format!(
                        "edge `{}` targets unknown port `{}` on node `{}` (expected one of: {})",
                        edge.id,
                        edge.target_port,
                        edge.target,
                        describe_ports(&ports)
                    )
                }
            }
        };
        out.push(Diagnostic::edge(ErrorKind::DanglingEdge, edge.id.clone(), message));
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Depth-first search over well-formed edges; every back edge closes a
/// cycle and is reported with the path it closes.
fn check_cycles(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    let mut state = vec![Visit::New; index.graph().nodes.len()];
    for root in index.node_indices() {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let Some(&edge) = index.outgoing(node).get(frame.1) else {
                state[node] = Visit::Done;
                stack.pop();
                continue;
            };
            frame.1 += 1;
            let Some((_, next)) = index.endpoints(edge) else {
                continue;
            };
            match state[next] {
                Visit::New => {
                    state[next] = Visit::Active;
                    stack.push((next, 0));
                }
                Visit::Active => {
                    let start = stack
                        .iter()
                        .position(|(entry, _)| *entry == next)
                        .unwrap_or(0);
                    let mut path: Vec<&str> = stack[start..]
                        .iter()
                        .map(|(entry, _)| index.node(*entry).id.as_str())
                        .collect();
                    path.push(index.node(next).id.as_str());
                    out.push(Diagnostic::node(
                        ErrorKind::CycleDetected,
                        index.node(next).id.clone(),
                        format!("cycle detected: {}", path.join(" -> ")),
                    ));
                }
                Visit::Done => {}
            }
        }
    }
}

fn check_orphans(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    let fed = index.reachable_from(index.inputs());
    let useful = index.reaching(index.outputs());
    for idx in index.node_indices() {
        let node = index.node(idx);
        let message = if !node.is_input() && index.incoming(idx).is_empty() {
            format!("{} node `{}` has no incoming edges", node.describe(), node.id)
        } else if !useful[idx] {
            format!(
                "{} node `{}` is not connected to any output",
                node.describe(),
                node.id
            )
        } else if !fed[idx] {
            format!("{} node `{}` is not fed by any input", node.describe(), node.id)
        } else {
            continue;
        };
        out.push(Diagnostic::node(ErrorKind::OrphanNode, node.id.clone(), message));
    }
}

fn check_arity(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    for idx in index.node_indices() {
        let node = index.node(idx);
        let ports = node.input_ports();
        if ports == PortSet::Unresolved {
            continue;
        }
        let declared = ports.names();
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for edge in index.incoming(idx) {
            *counts
                .entry(index.edge(*edge).target_port.as_str())
                .or_default() += 1;
        }
        let problems: Vec<String> = declared
            .iter()
            .filter_map(|port| match counts.get(port.as_str()).copied().unwrap_or(0) {
                0 => Some(format!("port `{port}` is not wired")),
                1 => None,
                many => Some(format!("port `{port}` has {many} incoming edges")),
            })
            .collect();
        if problems.is_empty() {
            continue;
        }
        let wired: usize = counts.values().sum();
        out.push(Diagnostic::node(
            ErrorKind::ArityMismatch,
            node.id.clone(),
            format!(
                "{} node `{}` expects {} incoming edge(s) on [{}], found {}: {}",
                node.describe(),
                node.id,
                declared.len(),
                declared.join(", "),
                wired,
                problems.join("; ")
            ),
        ));
    }
}

fn check_parameters(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    for idx in index.node_indices() {
        let node = index.node(idx);
        let NodeKind::AdvancedOperation { operator, params } = &node.kind else {
            continue;
        };
        if let Err(err) = Primitive::resolve(*operator, params, ctx.config) {
            out.push(Diagnostic::node(
                ErrorKind::MissingParameter,
                node.id.clone(),
                format!("{operator} node `{}`: {err}", node.id),
            ));
        }
    }
}

fn check_output_reachability(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    let message = if index.inputs().next().is_none() {
        "graph has no input nodes"
    } else if index.outputs().next().is_none() {
        "graph has no output nodes"
    } else {
        let fed = index.reachable_from(index.inputs());
        if index.outputs().any(|idx| fed[idx]) {
            return;
        }
        "no output is reachable from any input"
    };
    out.push(Diagnostic::graph(ErrorKind::NoOutputReachable, message));
}

fn check_types(ctx: &CheckContext<'_, '_>, out: &mut Vec<Diagnostic>) {
    let index = ctx.index;
    for edge_idx in index.valid_edges() {
        let Some((source, target)) = index.endpoints(edge_idx) else {
            continue;
        };
        let target_node = index.node(target);
        let source_node = index.node(source);
        if matches!(target_node.kind, NodeKind::BooleanOutput { .. })
            && source_node.value_type() == Some(ValueType::Number)
        {
            out.push(Diagnostic::edge(
                ErrorKind::TypeMismatch,
                index.edge(edge_idx).id.clone(),
                format!(
                    "boolean output `{}` is wired from numeric {} node `{}`",
                    target_node.id,
                    source_node.describe(),
                    source_node.id
                ),
            ));
        }
    }
}

fn lookup_node<'g>(index: &GraphIndex<'g>, id: &str) -> Option<&'g crate::graph::Node> {
    index.lookup(id).map(|idx| index.node(idx))
}

fn describe_ports(ports: &PortSet) -> String {
    match ports {
        PortSet::Unresolved => "in0, in1, ...".to_string(),
        other => other.names().join(", "),
    }
}
