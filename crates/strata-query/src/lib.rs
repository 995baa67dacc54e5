//! Query engine for Strata.
//!
//! Resolves requested types from known facts by scanning the facts,
//! evaluating formulas and searching the schema graph, invoking remote
//! operations through the cached invoker where a path requires it.
//!
//! # Modules
//!
//! - [`context`]: per-query facts, history and profiler
//! - [`evaluators`]: one evaluator per graph relationship
//! - [`parameters`]: argument discovery for operation calls
//! - [`strategy`]: the resolution strategies
//! - [`engine`]: [`QueryEngine`] and [`QueryEngineFactory`]
//! - [`target`] and [`result`]: what is asked and what comes back
//! - [`error`]: [`QueryError`]

#![doc = include_str!("../README.md")]

pub mod context;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod parameters;
pub mod result;
pub mod strategy;
pub mod target;

pub use context::{FactDiscoveryStrategy, FactLookup, ModelTree, QueryContext};
pub use engine::{QueryEngine, QueryEngineFactory};
pub use error::{QueryError, SearchFailure};
pub use evaluators::{EdgeEvaluator, EdgeEvaluators, EvaluatableEdge};
pub use parameters::ParameterFactory;
pub use result::{QueryResult, QueryResultSummary};
pub use strategy::{
    CalculatedFieldStrategy, DirectFactStrategy, GatherStrategy, QueryStrategy,
    SearchDiscoveryStrategy, StrategyResult, default_strategies,
};
pub use target::{QueryExpression, QueryMode, QuerySpecTypeNode};
