//! Records of attempted edge traversals.

use crate::graph::Edge;
use std::fmt;
use std::sync::Arc;
use strata_core::TypedInstance;

/// The outcome of attempting one edge.
///
/// Failure is an ordinary value: the search prunes the branch and carries on.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatedEdge {
    /// The edge that was attempted.
    pub edge: Edge,
    /// The fact produced, or why the traversal failed.
    pub result: Result<Arc<TypedInstance>, String>,
}

impl EvaluatedEdge {
    /// A successful traversal producing `value`.
    pub fn success(edge: Edge, value: Arc<TypedInstance>) -> Self {
        Self {
            edge,
            result: Ok(value),
        }
    }

    /// A failed traversal.
    pub fn failed(edge: Edge, reason: impl Into<String>) -> Self {
        Self {
            edge,
            result: Err(reason.into()),
        }
    }

    /// Whether the traversal succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The produced fact, if any.
    pub fn value(&self) -> Option<&Arc<TypedInstance>> {
        self.result.as_ref().ok()
    }

    /// The failure reason, if any.
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }

    /// One-line human readable description.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EvaluatedEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(value) => write!(f, "{} => {value}", self.edge),
            Err(reason) => write!(f, "{} => failed: {reason}", self.edge),
        }
    }
}
