//! Query errors.
//!
//! Almost every outcome inside a query is a value: a failed edge, an
//! unmatched target. [`QueryError::SearchFailed`] is the exception, raised
//! when discovery could not reach its targets and no strategy resolved any
//! other target of the query either.

use std::fmt;
use strata_core::QualifiedName;
use strata_graph::EvaluatedEdge;
use thiserror::Error;

/// Errors raised by the query engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// An error from the schema, the data or an invoker.
    #[error(transparent)]
    Core(#[from] strata_core::Error),

    /// Discovery found no path to its targets.
    #[error("{0}")]
    SearchFailed(SearchFailure),
}

impl QueryError {
    /// The evaluated path carried by a search failure.
    pub fn evaluated_path(&self) -> &[EvaluatedEdge] {
        match self {
            Self::SearchFailed(failure) => &failure.evaluated_path,
            Self::Core(_) => &[],
        }
    }
}

/// Why discovery gave up, with everything it tried.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchFailure {
    /// The first unresolved target.
    pub target: QualifiedName,
    /// Human readable explanation.
    pub message: String,
    /// Every edge evaluated during the query, oldest first.
    pub evaluated_path: Vec<EvaluatedEdge>,
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Search for {} failed: {} ({} edges evaluated)",
            self.target,
            self.message,
            self.evaluated_path.len()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
