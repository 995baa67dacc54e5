//! Handler for `strata graph stats`.

use crate::inputs::load_schema;
use std::path::Path;
use std::sync::Arc;
use strata_core::Result;
use strata_graph::{
    DegreeDirection, GraphStats, SchemaGraph, compute_stats, display_graph, quick_summary,
    top_nodes_by_degree,
};

/// Statistics of the schema graph, plus the `top` most connected elements.
pub fn schema_stats(schema_path: &Path, top: usize) -> Result<(GraphStats, Vec<(String, usize)>)> {
    let schema = Arc::new(load_schema(schema_path)?);
    let display = display_graph(&SchemaGraph::new(schema));
    log::debug!("Materialised {}", quick_summary(&display));
    Ok((
        compute_stats(&display),
        top_nodes_by_degree(&display, top, DegreeDirection::Both),
    ))
}

/// Print schema graph statistics.
pub fn handle_stats(schema_path: &Path, top: usize) -> Result<()> {
    let (stats, hubs) = schema_stats(schema_path, top)?;

    println!("Schema graph statistics:");
    println!("  Elements:        {}", stats.node_count);
    println!("  Edges:           {}", stats.edge_count);
    println!("  Orphans:         {}", stats.orphan_count);
    println!("  Avg degree:      {:.2}", stats.avg_degree);
    println!("  Max in-degree:   {}", stats.max_in_degree);
    println!("  Max out-degree:  {}", stats.max_out_degree);
    if let Some(ref reached) = stats.most_reached {
        println!("  Most reached:    {reached}");
    }
    if let Some(ref branching) = stats.most_branching {
        println!("  Most branching:  {branching}");
    }

    println!("\nElements by kind:");
    for (kind, count) in &stats.element_distribution {
        println!("  {kind:<12} {count}");
    }

    println!("\nEdges by relationship:");
    for (relationship, count) in &stats.relationship_distribution {
        println!("  {relationship:<24} {count}");
    }

    if !hubs.is_empty() {
        println!("\nMost connected:");
        for (element, degree) in &hubs {
            println!("  {degree:>4}  {element}");
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
