use thiserror::Error;

use crate::diagnostics::{Diagnostic, ErrorKind};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter `{name}`")]
    Missing { name: &'static str },

    #[error("parameter `{name}` must be an unsigned integer, got `{value}`")]
    NotAnInteger { name: &'static str, value: String },

    #[error("parameter `{name}` = {value} is outside {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("parameter `{name}` = {value} does not fit in {bits}-bit comparators")]
    TooWide {
        name: &'static str,
        value: u64,
        bits: u32,
    },

    #[error("range is empty: min {min} exceeds max {max}")]
    EmptyRange { min: u64, max: u64 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinearizeError {
    #[error("node id `{0}` is not unique")]
    DuplicateId(String),

    #[error("cycle prevents ordering of nodes: {}", .unresolved.join(", "))]
    Cycle { unresolved: Vec<String> },
}

impl LinearizeError {
    /// Diagnostic surfaced when the linearizer rejects a graph that
    /// validation let through.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LinearizeError::DuplicateId(id) => {
                Diagnostic::node(ErrorKind::DuplicateId, id.clone(), self.to_string())
            }
            LinearizeError::Cycle { unresolved } => match unresolved.first() {
                Some(id) => Diagnostic::node(ErrorKind::CycleDetected, id.clone(), self.to_string()),
                None => Diagnostic::graph(ErrorKind::CycleDetected, self.to_string()),
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("port `{port}` of node `{node}` has no resolved source")]
    UnwiredPort { node: String, port: String },

    #[error("node `{node}`: {source}")]
    Parameter {
        node: String,
        #[source]
        source: ParamError,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("template name `{0}` is not a valid circom identifier")]
    InvalidTemplateName(String),

    #[error("circom version `{0}` must be dotted digits")]
    InvalidCircomVersion(String),

    #[error("comparator bit width {0} must be within 1..={}", crate::constants::MAX_COMPARATOR_BITS)]
    InvalidComparatorBits(u32),

    #[error("hash input limit {0} must be within 1..={}", crate::constants::POSEIDON_MAX_INPUTS)]
    InvalidHashInputLimit(usize),

    #[error("merkle depth limit {0} must be within 1..={}", crate::constants::MAX_MERKLE_DEPTH)]
    InvalidMerkleDepthLimit(u32),

    #[error("invalid configuration json: {0}")]
    Json(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid circuit document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node `{id}` has unknown type `{node_type}`")]
    UnknownNodeType { id: String, node_type: String },

    #[error("node `{id}` uses unknown operation `{operation}`")]
    UnknownOperation { id: String, operation: String },

    #[error("node `{id}` has unknown {field} `{value}`")]
    UnknownVariant {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("node `{id}` is missing `{field}`")]
    MissingField { id: String, field: &'static str },
}
