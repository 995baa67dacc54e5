//! What a query asks for.

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_core::{Error, QualifiedName, Result, Schema};

/// How a target should be resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Find one value.
    #[default]
    Discover,
    /// Find every value the available operations can produce.
    Gather,
}

/// A request for a value of one type.
///
/// Children describe required sub-attributes. They are carried for callers
/// but strategies only resolve the top-level node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuerySpecTypeNode {
    /// Requested type.
    pub type_name: QualifiedName,
    /// Requested sub-attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<QuerySpecTypeNode>,
    /// Resolution mode.
    #[serde(default)]
    pub mode: QueryMode,
}

impl QuerySpecTypeNode {
    /// Request one value of `type_name`.
    pub fn new(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            type_name: type_name.into(),
            children: Vec::new(),
            mode: QueryMode::Discover,
        }
    }

    /// Request every value of `type_name`.
    pub fn gather(type_name: impl Into<QualifiedName>) -> Self {
        Self {
            mode: QueryMode::Gather,
            ..Self::new(type_name)
        }
    }

    /// Add a child node.
    pub fn with_child(mut self, child: QuerySpecTypeNode) -> Self {
        self.children.push(child);
        self
    }
}

impl fmt::Display for QuerySpecTypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            QueryMode::Discover => write!(f, "{}", self.type_name),
            QueryMode::Gather => write!(f, "gather {}", self.type_name),
        }
    }
}

/// A parsed query string.
///
/// The accepted form is a comma separated list of type names, optionally
/// preceded by `gather`:
///
/// ```text
/// Total
/// Total, CustomerName
/// gather Order
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryExpression {
    /// The parsed targets, in query order.
    pub targets: Vec<QuerySpecTypeNode>,
}

impl QueryExpression {
    /// Parse a query string against a schema.
    pub fn parse(query: &str, schema: &Schema) -> Result<Self> {
        let query = query.trim();
        let (mode, list) = match query.split_once(char::is_whitespace) {
            Some(("gather", rest)) => (QueryMode::Gather, rest),
            _ => (QueryMode::Discover, query),
        };

        let mut targets = Vec::new();
        for name in list.split(',').map(str::trim) {
            if name.is_empty() {
                return Err(Error::invalid_data(format!("empty type name in query '{query}'")));
            }
            let type_name = QualifiedName::from(name);
            if !schema.has_type(&type_name) {
                return Err(Error::unknown_type(name));
            }
            let node = QuerySpecTypeNode {
                type_name,
                children: Vec::new(),
                mode,
            };
            if !targets.contains(&node) {
                targets.push(node);
            }
        }
        Ok(Self { targets })
    }
}

// ============================================================================
// Tests
// ============================================================================
