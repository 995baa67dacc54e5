//! A fully materialised view of the schema graph.
//!
//! The search never needs this; it exists for diagnostics such as
//! `strata graph stats` and for rendering the schema.

use crate::element::{Element, Relationship};
use crate::graph::SchemaGraph;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, VecDeque};

/// The whole type-level graph in a petgraph `DiGraph`.
#[derive(Debug, Default)]
pub struct DisplayGraph {
    /// Underlying graph.
    pub graph: DiGraph<Element, Relationship>,
    index: HashMap<Element, NodeIndex>,
}

impl DisplayGraph {
    /// Number of elements.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Index of an element.
    pub fn get_index(&self, element: &Element) -> Option<NodeIndex> {
        self.index.get(element).copied()
    }

    /// Whether an element is present.
    pub fn contains(&self, element: &Element) -> bool {
        self.index.contains_key(element)
    }

    /// All elements.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &Element> {
        self.graph.node_weights()
    }

    fn add_node(&mut self, element: Element) -> NodeIndex {
        if let Some(idx) = self.index.get(&element) {
            return *idx;
        }
        let idx = self.graph.add_node(element.clone());
        self.index.insert(element, idx);
        idx
    }
}

/// Expand every type and operation of the schema into a [`DisplayGraph`].
pub fn display_graph(graph: &SchemaGraph) -> DisplayGraph {
    let mut display = DisplayGraph::default();
    let schema = graph.schema();

    let mut queue: VecDeque<Element> = schema
        .types()
        .map(|ty| Element::type_of(&ty.name))
        .chain(schema.operations().map(|op| Element::operation(op.qualified_name())))
        .collect();
    for element in &queue {
        display.add_node(element.clone());
    }

    let mut expanded = std::collections::HashSet::new();
    while let Some(element) = queue.pop_front() {
        if !expanded.insert(element.clone()) {
            continue;
        }
        let from = display.add_node(element.clone());
        for edge in graph.outgoing_edges(&element) {
            let to = display.add_node(edge.to.clone());
            display.graph.add_edge(from, to, edge.relationship);
            if !expanded.contains(&edge.to) {
                queue.push_back(edge.to);
            }
        }
    }

    log::debug!(
        "Display graph has {} nodes and {} edges",
        display.node_count(),
        display.edge_count()
    );
    display
}
