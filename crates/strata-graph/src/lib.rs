//! Schema graph infrastructure for Strata.
//!
//! The query engine searches a graph whose nodes are types, attributes,
//! operations and provided instances. This crate defines that graph and
//! expands it lazily from a schema snapshot.
//!
//! # Key Abstractions
//!
//! - [`Element`] and [`Relationship`]: nodes and edge labels
//! - [`SchemaGraph`]: on-demand `outgoing_edges`
//! - [`EvaluatedEdge`]: the record of one attempted traversal
//! - [`display_graph`] and [`compute_stats`]: petgraph materialisation for diagnostics

#![doc = include_str!("../README.md")]

pub mod display;
pub mod edge;
pub mod element;
pub mod graph;
pub mod stats;

pub use display::{DisplayGraph, display_graph};
pub use edge::EvaluatedEdge;
pub use element::{Element, Relationship};
pub use graph::{Edge, SchemaGraph};
pub use stats::{DegreeDirection, GraphStats, compute_stats, quick_summary, top_nodes_by_degree};
