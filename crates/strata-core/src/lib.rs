//! Shared types, traits, errors and configuration for Strata.
//!
//! This crate provides the foundational types used across all Strata crates.
//! It has no internal Strata dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`schema`]: Types, services, operations and the validated [`Schema`]
//! - [`instance`]: Typed values held as facts
//! - [`formula`]: Calculated attribute expressions
//! - [`invoker`]: The remote operation seam
//! - [`profiler`]: Hierarchical query timing
//! - [`config`]: Engine tunables
//! - [`traits`]: Schema provider seam

#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod formula;
pub mod instance;
pub mod invoker;
pub mod profiler;
pub mod schema;
pub mod traits;

// Re-export key types at crate root for convenience
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use formula::{Formula, FormulaOperator};
pub use instance::{InstanceValue, TypedInstance};
pub use invoker::{
    CachingBehaviour, InvocationRequest, OperationInvoker, ParameterValue, ResultStream,
};
pub use profiler::{Clock, ManualClock, OperationType, QueryProfiler, SystemClock};
pub use schema::{
    Constraint, Field, Operation, Parameter, QualifiedName, Schema, SchemaBuilder,
    SchemaDefinition, Service, Type,
};
pub use traits::{SchemaProvider, StaticSchemaProvider};
