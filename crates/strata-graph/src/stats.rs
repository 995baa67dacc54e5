//! Graph statistics and analysis.
//!
//! Summarises a [`DisplayGraph`]: how many elements of each kind the schema
//! yields, how edges split across relationships, and which elements are the
//! most connected.

use crate::display::DisplayGraph;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Types
// ============================================================================

/// Statistics about a materialised schema graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphStats {
    /// Total number of elements.
    pub node_count: usize,
    /// Total number of edges.
    pub edge_count: usize,
    /// Elements per kind (type, attribute, operation, instance).
    pub element_distribution: BTreeMap<String, usize>,
    /// Edges per relationship.
    pub relationship_distribution: BTreeMap<String, usize>,
    /// Elements without any edges.
    pub orphan_count: usize,
    /// Average edges per element (in + out).
    pub avg_degree: f32,
    /// Maximum in-degree.
    pub max_in_degree: usize,
    /// Maximum out-degree.
    pub max_out_degree: usize,
    /// Element with the highest in-degree.
    pub most_reached: Option<String>,
    /// Element with the highest out-degree.
    pub most_branching: Option<String>,
}

/// Direction for degree calculation.
#[derive(Clone, Copy, Debug)]
pub enum DegreeDirection {
    /// Incoming edges only.
    In,
    /// Outgoing edges only.
    Out,
    /// Both directions.
    Both,
}

// ============================================================================
// Functions
// ============================================================================

/// Compute statistics for a graph.
pub fn compute_stats(graph: &DisplayGraph) -> GraphStats {
    let g = &graph.graph;

    let mut element_distribution = BTreeMap::new();
    for element in graph.iter_nodes() {
        *element_distribution
            .entry(element.kind().to_string())
            .or_insert(0) += 1;
    }

    let mut relationship_distribution = BTreeMap::new();
    for rel in g.edge_weights() {
        *relationship_distribution
            .entry(rel.name().to_string())
            .or_insert(0) += 1;
    }

    let mut orphan_count = 0;
    let mut max_in = (None, 0);
    let mut max_out = (None, 0);
    for idx in g.node_indices() {
        let incoming = g.edges_directed(idx, Direction::Incoming).count();
        let outgoing = g.edges_directed(idx, Direction::Outgoing).count();
        if incoming == 0 && outgoing == 0 {
            orphan_count += 1;
        }
        if incoming > max_in.1 {
            max_in = (Some(g[idx].to_string()), incoming);
        }
        if outgoing > max_out.1 {
            max_out = (Some(g[idx].to_string()), outgoing);
        }
    }

    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let avg_degree = if node_count > 0 {
        (2 * edge_count) as f32 / node_count as f32
    } else {
        0.0
    };

    GraphStats {
        node_count,
        edge_count,
        element_distribution,
        relationship_distribution,
        orphan_count,
        avg_degree,
        max_in_degree: max_in.1,
        max_out_degree: max_out.1,
        most_reached: max_in.0,
        most_branching: max_out.0,
    }
}

/// Get a quick summary of graph size.
pub fn quick_summary(graph: &DisplayGraph) -> String {
    format!(
        "{} elements, {} edges",
        graph.node_count(),
        graph.edge_count()
    )
}

/// Top `limit` elements by degree, highest first.
pub fn top_nodes_by_degree(
    graph: &DisplayGraph,
    limit: usize,
    direction: DegreeDirection,
) -> Vec<(String, usize)> {
    let g = &graph.graph;
    let mut scores: Vec<(String, usize)> = g
        .node_indices()
        .map(|idx| {
            let degree = match direction {
                DegreeDirection::In => g.edges_directed(idx, Direction::Incoming).count(),
                DegreeDirection::Out => g.edges_directed(idx, Direction::Outgoing).count(),
                DegreeDirection::Both => {
                    g.edges_directed(idx, Direction::Incoming).count()
                        + g.edges_directed(idx, Direction::Outgoing).count()
                }
            };
            (g[idx].to_string(), degree)
        })
        .collect();

    scores.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    scores.truncate(limit);
    scores
}

// ============================================================================
// Tests
// ============================================================================
