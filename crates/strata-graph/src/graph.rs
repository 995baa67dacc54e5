//! The lazily expanded search graph.
//!
//! [`SchemaGraph`] never materialises the whole graph: it computes the
//! outgoing edges of an element from the schema when asked. A fresh graph is
//! created for every search so each pass sees the schema snapshot of its
//! query.

use crate::element::{Element, Relationship};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use strata_core::Schema;

// ============================================================================
// Types
// ============================================================================

/// A candidate transition between two elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Source element.
    pub from: Element,
    /// Edge label.
    pub relationship: Relationship,
    /// Target element.
    pub to: Element,
}

impl Edge {
    /// Create an edge.
    pub fn new(from: Element, relationship: Relationship, to: Element) -> Self {
        Self {
            from,
            relationship,
            to,
        }
    }

    /// Traversal cost.
    pub fn cost(&self) -> u32 {
        self.relationship.cost()
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.from, self.relationship, self.to)
    }
}

/// Search graph over one schema snapshot.
#[derive(Clone, Debug)]
pub struct SchemaGraph {
    schema: Arc<Schema>,
}

// ============================================================================
// Expansion
// ============================================================================

impl SchemaGraph {
    /// Create a graph over a schema snapshot.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    /// The schema this graph expands.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Outgoing edges of an element, in deterministic order.
    pub fn outgoing_edges(&self, element: &Element) -> Vec<Edge> {
        let mut edges = Vec::new();
        match element {
            Element::Type(name) => {
                for attr in self.schema.attributes_of(name).keys() {
                    edges.push(Edge::new(
                        element.clone(),
                        Relationship::HasAttribute,
                        Element::attribute(name, *attr),
                    ));
                }
                for operation in self.schema.operations_accepting(name) {
                    edges.push(Edge::new(
                        element.clone(),
                        Relationship::OperationParameter,
                        Element::operation(operation.qualified_name()),
                    ));
                }
            }
            Element::Attribute { declaring, name } => {
                if let Some(field) = self.schema.attributes_of(declaring).get(name.as_str()) {
                    edges.push(Edge::new(
                        element.clone(),
                        Relationship::IsTypeOf,
                        Element::type_of(&field.type_name),
                    ));
                    edges.push(Edge::new(
                        element.clone(),
                        Relationship::AttributeOf,
                        Element::type_of(declaring),
                    ));
                }
            }
            Element::Operation(qualified) => {
                if let Ok(operation) = self.schema.operation(qualified) {
                    for param in &operation.parameters {
                        let edge = Edge::new(
                            element.clone(),
                            Relationship::RequiresParameter,
                            Element::type_of(&param.type_name),
                        );
                        if !edges.contains(&edge) {
                            edges.push(edge);
                        }
                    }
                    edges.push(Edge::new(
                        element.clone(),
                        Relationship::Provides,
                        Element::instance(&operation.return_type),
                    ));
                }
            }
            Element::Instance(name) => {
                edges.push(Edge::new(
                    element.clone(),
                    Relationship::CanPopulate,
                    Element::type_of(name),
                ));
                for attr in self.schema.attributes_of(name).keys() {
                    edges.push(Edge::new(
                        element.clone(),
                        Relationship::InstanceHasAttribute,
                        Element::attribute(name, *attr),
                    ));
                }
            }
        }
        log::trace!("{element} has {} outgoing edges", edges.len());
        edges
    }

    /// Whether `to` is structurally reachable from `from`, ignoring facts.
    pub fn is_reachable(&self, from: &Element, to: &Element) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == to {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            for edge in self.outgoing_edges(&current) {
                if !visited.contains(&edge.to) {
                    queue.push_back(edge.to);
                }
            }
        }
        false
    }
}

// ============================================================================
// Tests
// ============================================================================
