//! The terminal artifact of a query.

use crate::target::QuerySpecTypeNode;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use strata_core::{OperationType, QualifiedName, TypedInstance};
use strata_graph::EvaluatedEdge;

/// What a query produced. Immutable once returned.
#[derive(Clone, Debug)]
pub struct QueryResult {
    /// Every target, resolved or not.
    pub results: BTreeMap<QuerySpecTypeNode, Option<Arc<TypedInstance>>>,
    /// Targets no strategy could resolve.
    pub unmatched_nodes: BTreeSet<QuerySpecTypeNode>,
    /// Edges evaluated while answering, oldest first.
    pub evaluated_path: Vec<EvaluatedEdge>,
    /// Self time per operation type, in milliseconds. Empty when profiling
    /// is disabled.
    pub timings: BTreeMap<OperationType, i64>,
    /// Wall time of the whole query in milliseconds.
    pub duration_ms: i64,
    /// Id of the query.
    pub query_id: String,
}

impl QueryResult {
    /// Whether every target was resolved.
    pub fn is_fully_resolved(&self) -> bool {
        self.unmatched_nodes.is_empty()
    }

    /// The value resolved for the first target of `type_name`.
    pub fn get(&self, type_name: impl Into<QualifiedName>) -> Option<&Arc<TypedInstance>> {
        let type_name = type_name.into();
        self.results
            .iter()
            .find(|(node, _)| node.type_name == type_name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// A serialisable view with raw values.
    pub fn summary(&self) -> QueryResultSummary {
        QueryResultSummary {
            query_id: self.query_id.clone(),
            fully_resolved: self.is_fully_resolved(),
            results: self
                .results
                .iter()
                .map(|(node, value)| {
                    (
                        node.to_string(),
                        value
                            .as_ref()
                            .map_or(serde_json::Value::Null, |v| v.to_raw()),
                    )
                })
                .collect(),
            unmatched: self.unmatched_nodes.iter().map(ToString::to_string).collect(),
            evaluated_path: self.evaluated_path.iter().map(ToString::to_string).collect(),
            timings: self.timings.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

/// JSON friendly form of a [`QueryResult`].
#[derive(Clone, Debug, Serialize)]
pub struct QueryResultSummary {
    /// Id of the query.
    pub query_id: String,
    /// Whether every target was resolved.
    pub fully_resolved: bool,
    /// Target to raw value, `null` when unresolved.
    pub results: BTreeMap<String, serde_json::Value>,
    /// Unresolved targets.
    pub unmatched: Vec<String>,
    /// Evaluated edges, one line each.
    pub evaluated_path: Vec<String>,
    /// Self time per operation type.
    pub timings: BTreeMap<OperationType, i64>,
    /// Wall time in milliseconds.
    pub duration_ms: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolution_and_summary() {
        let total = QuerySpecTypeNode::new("Total");
        let name = QuerySpecTypeNode::new("CustomerName");
        let result = QueryResult {
            results: BTreeMap::from([
                (
                    total.clone(),
                    Some(Arc::new(TypedInstance::scalar("Total", 100))),
                ),
                (name.clone(), None),
            ]),
            unmatched_nodes: BTreeSet::from([name]),
            evaluated_path: Vec::new(),
            timings: BTreeMap::from([(OperationType::Root, 3)]),
            duration_ms: 3,
            query_id: "q1".into(),
        };

        assert!(!result.is_fully_resolved());
        assert_eq!(result.get("Total").unwrap().to_raw(), json!(100));
        assert!(result.get("CustomerName").is_none());

        let summary = serde_json::to_value(result.summary()).unwrap();
        assert_eq!(summary["results"]["Total"], json!(100));
        assert_eq!(summary["results"]["CustomerName"], json!(null));
        assert_eq!(summary["unmatched"], json!(["CustomerName"]));
        assert_eq!(summary["timings"]["ROOT"], json!(3));
    }
}
