//! Diagnostics reported by the validator.
//!
//! A malformed graph is the normal state of an editor session, so problems
//! are collected as values rather than returned as errors. Each
//! [`ErrorKind`] has a fixed [`Severity`]; any fatal diagnostic gates
//! emission and estimation.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    DuplicateId,
    DanglingEdge,
    CycleDetected,
    OrphanNode,
    ArityMismatch,
    MissingParameter,
    NoOutputReachable,
    TypeMismatch,
}

impl ErrorKind {
    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::DuplicateId
            | ErrorKind::DanglingEdge
            | ErrorKind::CycleDetected
            | ErrorKind::ArityMismatch
            | ErrorKind::MissingParameter
            | ErrorKind::NoOutputReachable => Severity::Fatal,
            ErrorKind::OrphanNode | ErrorKind::TypeMismatch => Severity::Advisory,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DuplicateId => "DuplicateId",
            ErrorKind::DanglingEdge => "DanglingEdge",
            ErrorKind::CycleDetected => "CycleDetected",
            ErrorKind::OrphanNode => "OrphanNode",
            ErrorKind::ArityMismatch => "ArityMismatch",
            ErrorKind::MissingParameter => "MissingParameter",
            ErrorKind::NoOutputReachable => "NoOutputReachable",
            ErrorKind::TypeMismatch => "TypeMismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Advisory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub error_kind: ErrorKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn node(kind: ErrorKind, node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_kind: kind,
            severity: kind.severity(),
            node_id: Some(node_id.into()),
            edge_id: None,
            message: message.into(),
        }
    }

    pub fn edge(kind: ErrorKind, edge_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_kind: kind,
            severity: kind.severity(),
            node_id: None,
            edge_id: Some(edge_id.into()),
            message: message.into(),
        }
    }

    pub fn graph(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error_kind: kind,
            severity: kind.severity(),
            node_id: None,
            edge_id: None,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Fatal => "error",
            Severity::Advisory => "warning",
        };
        write!(f, "{level}[{}]", self.error_kind)?;
        if let Some(node) = &self.node_id {
            write!(f, " node `{node}`")?;
        }
        if let Some(edge) = &self.edge_id {
            write!(f, " edge `{edge}`")?;
        }
        write!(f, ": {}", self.message)
    }
}

pub fn has_fatal(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_fatal)
}

pub fn fatal_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|diag| diag.is_fatal()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_table() {
        assert!(Diagnostic::graph(ErrorKind::NoOutputReachable, "none").is_fatal());
        assert!(Diagnostic::node(ErrorKind::MissingParameter, "n", "min").is_fatal());
        assert!(!Diagnostic::node(ErrorKind::OrphanNode, "n", "alone").is_fatal());
        assert!(!Diagnostic::edge(ErrorKind::TypeMismatch, "e", "bool").is_fatal());
    }

    #[test]
    fn serializes_with_editor_field_names() {
        let diag = Diagnostic::node(ErrorKind::ArityMismatch, "gt", "port `a` is not wired");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["errorKind"], "ArityMismatch");
        assert_eq!(json["nodeId"], "gt");
        assert_eq!(json["severity"], "fatal");
        assert!(json.get("edgeId").is_none());
        assert_eq!(
            diag.to_string(),
            "error[ArityMismatch] node `gt`: port `a` is not wired"
        );
    }
}
