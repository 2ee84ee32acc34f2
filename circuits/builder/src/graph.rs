//! Graph model for the visual circuit builder.
//!
//! A [`Graph`] is a snapshot of the editor state: typed nodes plus
//! port-addressed edges. Construction never rejects anything; the
//! invariants are checked by [`crate::validator`]. [`GraphIndex`] is the
//! arena/adjacency view every later stage traverses, rebuilt on each
//! compile call and dropped with it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::POSEIDON_MAX_INPUTS;

/// Port carried by every value-producing node.
pub const OUTPUT_PORT: &str = "out";

const OPERATION_PORTS: &[&str] = &["a", "b"];
const SINGLE_PORT: &[&str] = &["in"];
const CONDITIONAL_PORTS: &[&str] = &["cond", "then", "else"];
const MERKLE_PORTS: &[&str] = &["leaf", "root"];
const NO_PORTS: &[&str] = &[];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Gt,
    Lt,
    Eq,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Eq => "eq",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Operator::Gt | Operator::Lt | Operator::Eq)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvancedOperator {
    RangeCheck,
    Hash,
    Conditional,
    MerkleProof,
    Modulo,
}

impl AdvancedOperator {
    pub const ALL: [AdvancedOperator; 5] = [
        AdvancedOperator::RangeCheck,
        AdvancedOperator::Hash,
        AdvancedOperator::Conditional,
        AdvancedOperator::MerkleProof,
        AdvancedOperator::Modulo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdvancedOperator::RangeCheck => "range-check",
            AdvancedOperator::Hash => "hash",
            AdvancedOperator::Conditional => "conditional",
            AdvancedOperator::MerkleProof => "merkle-proof",
            AdvancedOperator::Modulo => "modulo",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == name)
    }

    /// Parameters the editor form must supply for this primitive.
    pub fn required_params(self) -> &'static [&'static str] {
        match self {
            AdvancedOperator::RangeCheck => &["min", "max"],
            AdvancedOperator::Hash => &["inputs"],
            AdvancedOperator::Conditional => &["condition"],
            AdvancedOperator::MerkleProof => &["depth"],
            AdvancedOperator::Modulo => &["modulus"],
        }
    }
}

impl fmt::Display for AdvancedOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical type of the value on a node's output port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Number,
    Boolean,
}

pub type Params = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    PrivateInput {
        label: String,
    },
    PublicInput {
        label: String,
    },
    Operation {
        operator: Operator,
    },
    AdvancedOperation {
        operator: AdvancedOperator,
        #[serde(default, deserialize_with = "param_text::deserialize_map")]
        params: Params,
    },
    BooleanOutput {
        label: String,
    },
    NumberOutput {
        label: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn private_input(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::PrivateInput {
                label: label.into(),
            },
        )
    }

    pub fn public_input(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::PublicInput {
                label: label.into(),
            },
        )
    }

    pub fn operation(id: impl Into<String>, operator: Operator) -> Self {
        Self::new(id, NodeKind::Operation { operator })
    }

    pub fn advanced(
        id: impl Into<String>,
        operator: AdvancedOperator,
        params: &[(&str, &str)],
    ) -> Self {
        let params = params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self::new(id, NodeKind::AdvancedOperation { operator, params })
    }

    pub fn boolean_output(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::BooleanOutput {
                label: label.into(),
            },
        )
    }

    pub fn number_output(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(
            id,
            NodeKind::NumberOutput {
                label: label.into(),
            },
        )
    }

    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::PrivateInput { label }
            | NodeKind::PublicInput { label }
            | NodeKind::BooleanOutput { label }
            | NodeKind::NumberOutput { label } => Some(label),
            NodeKind::Operation { .. } | NodeKind::AdvancedOperation { .. } => None,
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::PrivateInput { .. } | NodeKind::PublicInput { .. }
        )
    }

    pub fn is_output(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::BooleanOutput { .. } | NodeKind::NumberOutput { .. }
        )
    }

    pub fn has_output_port(&self) -> bool {
        !self.is_output()
    }

    /// Short human-readable kind name used in diagnostics and comments.
    pub fn describe(&self) -> String {
        match &self.kind {
            NodeKind::PrivateInput { .. } => "private input".to_string(),
            NodeKind::PublicInput { .. } => "public input".to_string(),
            NodeKind::Operation { operator } => operator.to_string(),
            NodeKind::AdvancedOperation { operator, .. } => operator.to_string(),
            NodeKind::BooleanOutput { .. } => "boolean output".to_string(),
            NodeKind::NumberOutput { .. } => "number output".to_string(),
        }
    }

    pub fn input_ports(&self) -> PortSet {
        match &self.kind {
            NodeKind::PrivateInput { .. } | NodeKind::PublicInput { .. } => {
                PortSet::Fixed(NO_PORTS)
            }
            NodeKind::Operation { .. } => PortSet::Fixed(OPERATION_PORTS),
            NodeKind::AdvancedOperation { operator, params } => match operator {
                AdvancedOperator::RangeCheck | AdvancedOperator::Modulo => {
                    PortSet::Fixed(SINGLE_PORT)
                }
                AdvancedOperator::Conditional => PortSet::Fixed(CONDITIONAL_PORTS),
                AdvancedOperator::MerkleProof => PortSet::Fixed(MERKLE_PORTS),
                AdvancedOperator::Hash => match hash_arity(params) {
                    Some(count) => PortSet::Indexed(count),
                    None => PortSet::Unresolved,
                },
            },
            NodeKind::BooleanOutput { .. } | NodeKind::NumberOutput { .. } => {
                PortSet::Fixed(SINGLE_PORT)
            }
        }
    }

    /// Type of the value this node produces; outputs produce nothing.
    pub fn value_type(&self) -> Option<ValueType> {
        match &self.kind {
            NodeKind::PrivateInput { .. } | NodeKind::PublicInput { .. } => {
                Some(ValueType::Number)
            }
            NodeKind::Operation { operator } if operator.is_comparison() => {
                Some(ValueType::Boolean)
            }
            NodeKind::Operation { .. } => Some(ValueType::Number),
            NodeKind::AdvancedOperation { operator, .. } => match operator {
                AdvancedOperator::RangeCheck | AdvancedOperator::MerkleProof => {
                    Some(ValueType::Boolean)
                }
                AdvancedOperator::Hash
                | AdvancedOperator::Conditional
                | AdvancedOperator::Modulo => Some(ValueType::Number),
            },
            NodeKind::BooleanOutput { .. } | NodeKind::NumberOutput { .. } => None,
        }
    }
}

/// Number of hash input ports, when the `inputs` parameter is usable.
fn hash_arity(params: &Params) -> Option<usize> {
    let count = params.get("inputs")?.trim().parse::<usize>().ok()?;
    (1..=POSEIDON_MAX_INPUTS).contains(&count).then_some(count)
}

pub fn hash_port(position: usize) -> String {
    format!("in{position}")
}

/// Declared input ports of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortSet {
    Fixed(&'static [&'static str]),
    /// `in0` .. `in{n-1}`.
    Indexed(usize),
    /// Port shape depends on a parameter that does not resolve.
    Unresolved,
}

impl PortSet {
    pub fn contains(&self, port: &str) -> bool {
        match self {
            PortSet::Fixed(ports) => ports.contains(&port),
            PortSet::Indexed(count) => indexed_position(port).is_some_and(|pos| pos < *count),
            PortSet::Unresolved => indexed_position(port).is_some(),
        }
    }

    /// Port names in declaration order; empty when unresolved.
    pub fn names(&self) -> Vec<String> {
        match self {
            PortSet::Fixed(ports) => ports.iter().map(|port| port.to_string()).collect(),
            PortSet::Indexed(count) => (0..*count).map(hash_port).collect(),
            PortSet::Unresolved => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PortSet::Fixed(ports) => ports.is_empty(),
            PortSet::Indexed(count) => *count == 0,
            PortSet::Unresolved => false,
        }
    }
}

fn indexed_position(port: &str) -> Option<usize> {
    let digits = port.strip_prefix("in")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn default_source_port() -> String {
    OUTPUT_PORT.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    #[serde(default = "default_source_port")]
    pub source_port: String,
    pub target: String,
    pub target_port: String,
}

impl Edge {
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_port: default_source_port(),
            target: target.into(),
            target_port: target_port.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn push_edge(&mut self, edge: Edge) -> &mut Self {
        self.edges.push(edge);
        self
    }

    /// Wires `source`'s output into `target_port` of `target`.
    pub fn connect(&mut self, source: &str, target: &str, target_port: &str) -> &mut Self {
        let id = format!("e{source}-{target}:{target_port}");
        self.push_edge(Edge::new(id, source, target, target_port))
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let position = self.edges.iter().position(|edge| edge.id == id)?;
        Some(self.edges.remove(position))
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Why an edge does not take part in the dependency relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeFault {
    MissingSource,
    MissingTarget,
    UnknownSourcePort,
    UnknownTargetPort,
}

/// Arena view of a [`Graph`]: nodes addressed by position, an id lookup,
/// and predecessor/successor lists restricted to well-formed edges.
///
/// When several nodes share an id, the first one owns the id and the later
/// ones are shadowed: they stay out of the lookup and the adjacency lists.
#[derive(Clone, Debug)]
pub struct GraphIndex<'g> {
    graph: &'g Graph,
    by_id: HashMap<&'g str, usize>,
    shadowed: Vec<bool>,
    edge_faults: Vec<Option<EdgeFault>>,
    edge_ends: Vec<Option<(usize, usize)>>,
    incoming: Vec<Vec<usize>>,
    outgoing: Vec<Vec<usize>>,
}

impl<'g> GraphIndex<'g> {
    pub fn build(graph: &'g Graph) -> Self {
        let node_count = graph.nodes.len();
        let mut by_id = HashMap::with_capacity(node_count);
        let mut shadowed = vec![false; node_count];
        for (idx, node) in graph.nodes.iter().enumerate() {
            if by_id.contains_key(node.id.as_str()) {
                shadowed[idx] = true;
            } else {
                by_id.insert(node.id.as_str(), idx);
            }
        }

        let mut edge_faults = Vec::with_capacity(graph.edges.len());
        let mut edge_ends = Vec::with_capacity(graph.edges.len());
        let mut incoming = vec![Vec::new(); node_count];
        let mut outgoing = vec![Vec::new(); node_count];
        for (edge_idx, edge) in graph.edges.iter().enumerate() {
            match resolve_edge(graph, &by_id, edge) {
                Ok((source, target)) => {
                    outgoing[source].push(edge_idx);
                    incoming[target].push(edge_idx);
                    edge_faults.push(None);
                    edge_ends.push(Some((source, target)));
                }
                Err(fault) => {
                    edge_faults.push(Some(fault));
                    edge_ends.push(None);
                }
            }
        }

        Self {
            graph,
            by_id,
            shadowed,
            edge_faults,
            edge_ends,
            incoming,
            outgoing,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn node(&self, idx: usize) -> &'g Node {
        &self.graph.nodes[idx]
    }

    pub fn edge(&self, idx: usize) -> &'g Edge {
        &self.graph.edges[idx]
    }

    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn is_shadowed(&self, idx: usize) -> bool {
        self.shadowed[idx]
    }

    pub fn has_shadowed(&self) -> bool {
        self.shadowed.iter().any(|flag| *flag)
    }

    /// Positions of all addressable (non-shadowed) nodes, in graph order.
    pub fn node_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.graph.nodes.len()).filter(move |idx| !self.shadowed[*idx])
    }

    pub fn edge_fault(&self, edge_idx: usize) -> Option<EdgeFault> {
        self.edge_faults[edge_idx]
    }

    /// `(source, target)` node positions of a well-formed edge.
    pub fn endpoints(&self, edge_idx: usize) -> Option<(usize, usize)> {
        self.edge_ends[edge_idx]
    }

    pub fn valid_edges(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.graph.edges.len()).filter(move |idx| self.edge_faults[*idx].is_none())
    }

    pub fn incoming(&self, idx: usize) -> &[usize] {
        &self.incoming[idx]
    }

    pub fn outgoing(&self, idx: usize) -> &[usize] {
        &self.outgoing[idx]
    }

    /// Nodes reachable from `starts` along well-formed edges (starts included).
    pub fn reachable_from<I>(&self, starts: I) -> Vec<bool>
    where
        I: IntoIterator<Item = usize>,
    {
        self.flood(starts, |index, node| {
            index.outgoing[node]
                .iter()
                .filter_map(|edge| index.edge_ends[*edge].map(|(_, target)| target))
                .collect()
        })
    }

    /// Nodes from which one of `targets` is reachable (targets included).
    pub fn reaching<I>(&self, targets: I) -> Vec<bool>
    where
        I: IntoIterator<Item = usize>,
    {
        self.flood(targets, |index, node| {
            index.incoming[node]
                .iter()
                .filter_map(|edge| index.edge_ends[*edge].map(|(source, _)| source))
                .collect()
        })
    }

    fn flood<I, F>(&self, starts: I, next: F) -> Vec<bool>
    where
        I: IntoIterator<Item = usize>,
        F: Fn(&Self, usize) -> Vec<usize>,
    {
        let mut seen = vec![false; self.graph.nodes.len()];
        let mut stack: Vec<usize> = Vec::new();
        for start in starts {
            if !seen[start] {
                seen[start] = true;
                stack.push(start);
            }
        }
        while let Some(node) = stack.pop() {
            for neighbour in next(self, node) {
                if !seen[neighbour] {
                    seen[neighbour] = true;
                    stack.push(neighbour);
                }
            }
        }
        seen
    }

    pub fn inputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.node_indices().filter(move |idx| self.node(*idx).is_input())
    }

    pub fn outputs(&self) -> impl Iterator<Item = usize> + '_ {
        self.node_indices().filter(move |idx| self.node(*idx).is_output())
    }
}

fn resolve_edge(
    graph: &Graph,
    by_id: &HashMap<&str, usize>,
    edge: &Edge,
) -> Result<(usize, usize), EdgeFault> {
    let source = *by_id
        .get(edge.source.as_str())
        .ok_or(EdgeFault::MissingSource)?;
    let target = *by_id
        .get(edge.target.as_str())
        .ok_or(EdgeFault::MissingTarget)?;
    let source_node = &graph.nodes[source];
    if !source_node.has_output_port() || edge.source_port != OUTPUT_PORT {
        return Err(EdgeFault::UnknownSourcePort);
    }
    if !graph.nodes[target].input_ports().contains(&edge.target_port) {
        return Err(EdgeFault::UnknownTargetPort);
    }
    Ok((source, target))
}

/// Editor form fields arrive as strings or bare JSON numbers; both are kept
/// as text and parsed when parameters are resolved.
pub(crate) mod param_text {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawParam {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Flag(bool),
    }

    impl RawParam {
        fn into_text(self) -> String {
            match self {
                RawParam::Text(text) => text,
                RawParam::Unsigned(value) => value.to_string(),
                RawParam::Signed(value) => value.to_string(),
                RawParam::Float(value) => value.to_string(),
                RawParam::Flag(value) => value.to_string(),
            }
        }
    }

    pub fn deserialize_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<BTreeMap<String, RawParam>> = Deserialize::deserialize(deserializer)?;
        Ok(raw
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, value.into_text()))
            .collect())
    }
}
