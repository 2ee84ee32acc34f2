//! Import of circuits saved by the visual editor.
//!
//! The editor stores `{ name, nodes, edges, createdAt }`, where nodes carry a
//! canvas `type` and a free-form `data` object and edges may name the handle
//! they attach to. Positions and other canvas state are ignored.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::graph::{
    param_text, AdvancedOperator, Edge, Graph, Node, NodeKind, Operator, Params, OUTPUT_PORT,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<DocumentNode>,
    #[serde(default)]
    pub edges: Vec<DocumentEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub data: NodeData,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(
        default,
        deserialize_with = "param_text::deserialize_map",
        skip_serializing_if = "Params::is_empty"
    )]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl CircuitDocument {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts the editor snapshot into a compiler [`Graph`].
    ///
    /// Edges without a target handle take the target's first declared port
    /// not already claimed, in edge order.
    pub fn to_graph(&self) -> Result<Graph, DocumentError> {
        let nodes = self
            .nodes
            .iter()
            .map(DocumentNode::to_node)
            .collect::<Result<Vec<_>, _>>()?;

        let mut ports_by_node: HashMap<&str, Vec<String>> = HashMap::new();
        for node in &nodes {
            ports_by_node
                .entry(node.id.as_str())
                .or_insert_with(|| node.input_ports().names());
        }

        let mut claimed: HashSet<(&str, String)> = self
            .edges
            .iter()
            .filter_map(|edge| {
                let handle = edge.target_handle.as_deref()?;
                let declared = declared_ports(&ports_by_node, &edge.target);
                Some((edge.target.as_str(), target_port_for_handle(handle, declared)))
            })
            .collect();

        let mut edges = Vec::with_capacity(self.edges.len());
        for (position, edge) in self.edges.iter().enumerate() {
            let declared = declared_ports(&ports_by_node, &edge.target);
            let target_port = match edge.target_handle.as_deref() {
                Some(handle) => target_port_for_handle(handle, declared),
                None => {
                    let port = declared
                        .iter()
                        .find(|port| !claimed.contains(&(edge.target.as_str(), (*port).clone())))
                        .or_else(|| declared.first())
                        .cloned()
                        .unwrap_or_else(|| "in".to_string());
                    claimed.insert((edge.target.as_str(), port.clone()));
                    port
                }
            };
            let id = if edge.id.is_empty() {
                format!("e{position}")
            } else {
                edge.id.clone()
            };
            edges.push(Edge {
                id,
                source: edge.source.clone(),
                source_port: source_port_for_handle(edge.source_handle.as_deref()),
                target: edge.target.clone(),
                target_port,
            });
        }

        tracing::debug!(
            name = self.name.as_deref().unwrap_or_default(),
            nodes = nodes.len(),
            edges = edges.len(),
            "imported editor document"
        );
        Ok(Graph { nodes, edges })
    }
}

impl DocumentNode {
    fn to_node(&self) -> Result<Node, DocumentError> {
        let kind = match self.node_type.as_str() {
            "input" => {
                let label = self.label()?;
                match self.data.field_type.as_deref().unwrap_or("private") {
                    "private" => NodeKind::PrivateInput { label },
                    "public" => NodeKind::PublicInput { label },
                    other => return Err(self.unknown_variant("fieldType", other)),
                }
            }
            "operation" => {
                let name = self.operation()?;
                let operator = match name {
                    "equals" => Some(Operator::Eq),
                    other => Operator::from_name(other),
                };
                let operator = operator.ok_or_else(|| DocumentError::UnknownOperation {
                    id: self.id.clone(),
                    operation: name.to_string(),
                })?;
                NodeKind::Operation { operator }
            }
            "advanced" => {
                let name = self.operation()?;
                let operator =
                    AdvancedOperator::from_name(name).ok_or_else(|| DocumentError::UnknownOperation {
                        id: self.id.clone(),
                        operation: name.to_string(),
                    })?;
                NodeKind::AdvancedOperation {
                    operator,
                    params: self.data.params.clone(),
                }
            }
            "output" => {
                let label = self.label()?;
                match self.data.output_type.as_deref().unwrap_or("boolean") {
                    "boolean" => NodeKind::BooleanOutput { label },
                    "number" => NodeKind::NumberOutput { label },
                    other => return Err(self.unknown_variant("outputType", other)),
                }
            }
            other => {
                return Err(DocumentError::UnknownNodeType {
                    id: self.id.clone(),
                    node_type: other.to_string(),
                })
            }
        };
        Ok(Node::new(self.id.clone(), kind))
    }

    fn label(&self) -> Result<String, DocumentError> {
        self.data
            .label
            .clone()
            .ok_or_else(|| DocumentError::MissingField {
                id: self.id.clone(),
                field: "label",
            })
    }

    fn operation(&self) -> Result<&str, DocumentError> {
        self.data
            .operation
            .as_deref()
            .ok_or_else(|| DocumentError::MissingField {
                id: self.id.clone(),
                field: "operation",
            })
    }

    fn unknown_variant(&self, field: &'static str, value: &str) -> DocumentError {
        DocumentError::UnknownVariant {
            id: self.id.clone(),
            field,
            value: value.to_string(),
        }
    }
}

fn declared_ports<'a>(
    ports_by_node: &'a HashMap<&str, Vec<String>>,
    target: &str,
) -> &'a [String] {
    ports_by_node
        .get(target)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Editor handles are named `input-a`, `input-b` on every node shape. A
/// handle that names a declared port is taken as is; otherwise the letter
/// picks the target's declared port by position.
fn target_port_for_handle(handle: &str, declared: &[String]) -> String {
    let name = handle.strip_prefix("input-").unwrap_or(handle);
    if declared.iter().any(|port| port == name) {
        return name.to_string();
    }
    let mut letters = name.bytes();
    match (letters.next(), letters.next()) {
        (Some(letter @ b'a'..=b'z'), None) => declared
            .get(usize::from(letter - b'a'))
            .cloned()
            .unwrap_or_else(|| name.to_string()),
        _ => name.to_string(),
    }
}

fn source_port_for_handle(handle: Option<&str>) -> String {
    match handle {
        None | Some("output") => OUTPUT_PORT.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::has_fatal;
    use crate::validator::validate;

    const SAVED: &str = r#"{
        "name": "Circuit-1730000000000",
        "nodes": [
            {"id": "example-1", "type": "input", "position": {"x": 100, "y": 100},
             "data": {"label": "Birth Year", "fieldType": "private"}},
            {"id": "example-4", "type": "input", "position": {"x": 100, "y": 300},
             "data": {"label": "Current Year", "fieldType": "public"}},
            {"id": "example-2", "type": "operation", "position": {"x": 400, "y": 100},
             "data": {"label": "Calculate Age", "operation": "subtract"}},
            {"id": "example-5", "type": "advanced", "position": {"x": 550, "y": 100},
             "data": {"label": "Range Check", "operation": "range-check",
                      "params": {"min": 18, "max": "120"}}},
            {"id": "example-3", "type": "output", "position": {"x": 700, "y": 100},
             "data": {"label": "Is 18+", "outputType": "boolean"}}
        ],
        "edges": [
            {"id": "e4-2", "source": "example-4", "target": "example-2", "animated": true},
            {"id": "e1-2", "source": "example-1", "target": "example-2", "animated": true},
            {"id": "e2-5", "source": "example-2", "target": "example-5"},
            {"id": "e5-3", "source": "example-5", "target": "example-3"}
        ],
        "createdAt": "2024-11-01T12:00:00.000Z"
    }"#;

    #[test]
    fn saved_editor_circuit_converts_and_validates() {
        let document = CircuitDocument::from_json(SAVED).expect("document");
        let graph = document.to_graph().expect("graph");
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.edges[0].target_port, "a");
        assert_eq!(graph.edges[1].target_port, "b");
        assert_eq!(graph.edges[2].target_port, "in");
        assert!(matches!(
            graph.node("example-4").map(|node| &node.kind),
            Some(NodeKind::PublicInput { .. })
        ));
        match &graph.node("example-5").unwrap().kind {
            NodeKind::AdvancedOperation { params, .. } => {
                assert_eq!(params.get("min").map(String::as_str), Some("18"));
            }
            other => panic!("unexpected kind: {other:?}"),
        }
        assert!(!has_fatal(&validate(&graph)));
    }

    #[test]
    fn explicit_handles_are_respected_before_free_ports() {
        let json = r#"{
            "nodes": [
                {"id": "x", "type": "input", "data": {"label": "X"}},
                {"id": "y", "type": "input", "data": {"label": "Y"}},
                {"id": "op", "type": "operation", "data": {"operation": "equals"}}
            ],
            "edges": [
                {"id": "1", "source": "x", "target": "op"},
                {"id": "2", "source": "y", "target": "op", "targetHandle": "input-a"}
            ]
        }"#;
        let graph = CircuitDocument::from_json(json).unwrap().to_graph().unwrap();
        assert_eq!(graph.edges[0].target_port, "b");
        assert_eq!(graph.edges[1].target_port, "a");
        assert_eq!(
            graph.node("op").map(|node| &node.kind),
            Some(&NodeKind::Operation {
                operator: Operator::Eq
            })
        );
    }

    #[test]
    fn editor_handles_follow_advanced_node_ports() {
        let json = r#"{
            "nodes": [
                {"id": "1", "type": "input", "data": {"label": "Age"}},
                {"id": "2", "type": "advanced", "data": {"operation": "range-check",
                    "params": {"min": "18", "max": "65"}}},
                {"id": "3", "type": "input", "data": {"label": "Salt"}},
                {"id": "4", "type": "advanced", "data": {"operation": "hash",
                    "params": {"inputs": 2}}},
                {"id": "5", "type": "output", "data": {"label": "In Range"}},
                {"id": "6", "type": "output", "data": {"label": "Digest", "outputType": "number"}}
            ],
            "edges": [
                {"id": "e1-2", "source": "1", "target": "2", "targetHandle": "input-a"},
                {"id": "e3-4", "source": "3", "target": "4", "targetHandle": "input-b"},
                {"id": "e1-4", "source": "1", "target": "4", "targetHandle": "input-a"},
                {"id": "e2-5", "source": "2", "target": "5"},
                {"id": "e4-6", "source": "4", "target": "6"}
            ]
        }"#;
        let graph = CircuitDocument::from_json(json).unwrap().to_graph().unwrap();
        let ports: Vec<&str> = graph
            .edges
            .iter()
            .map(|edge| edge.target_port.as_str())
            .collect();
        assert_eq!(ports, vec!["in", "in1", "in0", "in", "in"]);
        let diagnostics = validate(&graph);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn unknown_shapes_are_errors() {
        let bad_type = r#"{"nodes": [{"id": "n", "type": "group", "data": {}}]}"#;
        assert!(matches!(
            CircuitDocument::from_json(bad_type).unwrap().to_graph(),
            Err(DocumentError::UnknownNodeType { .. })
        ));

        let bad_op = r#"{"nodes": [{"id": "n", "type": "advanced", "data": {"operation": "sqrt"}}]}"#;
        assert!(matches!(
            CircuitDocument::from_json(bad_op).unwrap().to_graph(),
            Err(DocumentError::UnknownOperation { .. })
        ));

        let bad_field = r#"{"nodes": [{"id": "n", "type": "input", "data": {"label": "A", "fieldType": "secret"}}]}"#;
        assert!(matches!(
            CircuitDocument::from_json(bad_field).unwrap().to_graph(),
            Err(DocumentError::UnknownVariant {
                field: "fieldType",
                ..
            })
        ));

        assert!(matches!(
            CircuitDocument::from_json("{\"edges\": []}"),
            Err(DocumentError::Json(_))
        ));
    }
}
