//! The query engine.
//!
//! [`QueryEngine::find`] runs each strategy once, in order, over the targets
//! still unresolved. Everything a strategy resolves or learns is merged into
//! the context before the next strategy runs. Targets left over at the end
//! are reported in [`QueryResult::unmatched_nodes`]. A failed discovery
//! aborts the query only when nothing at all was resolved.

use crate::context::QueryContext;
use crate::error::{QueryError, SearchFailure};
use crate::evaluators::EdgeEvaluators;
use crate::result::QueryResult;
use crate::strategy::{QueryStrategy, default_strategies};
use crate::target::{QueryExpression, QuerySpecTypeNode};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use strata_cache::CachingOperationInvoker;
use strata_core::{
    Clock, EngineConfig, OperationInvoker, QualifiedName, QueryProfiler, SchemaProvider,
    SystemClock, TypedInstance,
};

// ============================================================================
// Types
// ============================================================================

/// Answers queries against the current schema.
pub struct QueryEngine {
    schema_provider: Arc<dyn SchemaProvider>,
    strategies: Vec<Arc<dyn QueryStrategy>>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("QueryEngine")
            .field("strategies", &names)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builds engines with the standard strategy chain.
#[derive(Clone)]
pub struct QueryEngineFactory {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for QueryEngineFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngineFactory")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl QueryEngine {
    /// An engine running `strategies` in the given order.
    pub fn new(
        schema_provider: Arc<dyn SchemaProvider>,
        strategies: Vec<Arc<dyn QueryStrategy>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            schema_provider,
            strategies,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Time queries with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of the strategies, in run order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// A fresh context over the current schema snapshot.
    pub fn query_context(&self) -> QueryContext {
        QueryContext::new(self.schema_provider.schema(), &self.config.context)
            .with_profiler(QueryProfiler::new(Arc::clone(&self.clock)))
    }

    /// Parse `query` and answer it from `facts`.
    pub async fn find_query(&self, query: &str, facts: Vec<TypedInstance>) -> Result<QueryResult, QueryError> {
        let mut context = self.query_context().with_facts(facts);
        let expression = QueryExpression::parse(query, context.schema())?;
        self.find(&expression.targets, &mut context).await
    }

    /// Find one value of `type_name` from `facts`.
    pub async fn find_type(
        &self,
        type_name: impl Into<QualifiedName>,
        facts: Vec<TypedInstance>,
    ) -> Result<QueryResult, QueryError> {
        let target = QuerySpecTypeNode::new(type_name);
        let mut context = self.query_context().with_facts(facts);
        self.find(&[target], &mut context).await
    }

    /// Resolve `targets` within `context`.
    pub async fn find(
        &self,
        targets: &[QuerySpecTypeNode],
        context: &mut QueryContext,
    ) -> Result<QueryResult, QueryError> {
        log::info!(
            "[{}] Finding {} from {} facts",
            context.query_id(),
            describe(targets),
            context.facts().len()
        );

        let mut matched: BTreeMap<QuerySpecTypeNode, Arc<TypedInstance>> = BTreeMap::new();
        let mut failure: Option<SearchFailure> = None;
        for strategy in &self.strategies {
            let pending: Vec<QuerySpecTypeNode> = targets
                .iter()
                .filter(|target| !matched.contains_key(*target))
                .cloned()
                .collect();
            if pending.is_empty() {
                break;
            }

            log::debug!(
                "[{}] {} trying {}",
                context.query_id(),
                strategy.name(),
                describe(&pending)
            );
            let outcome = match strategy.invoke(&pending, context).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::warn!("[{}] {} failed: {err}", context.query_id(), strategy.name());
                    context.clear_history();
                    return Err(err);
                }
            };

            if failure.is_none() {
                failure = outcome.failure;
            }
            context.add_facts(outcome.additional_facts);
            for (node, value) in outcome.matched {
                context.add_fact(Arc::clone(&value));
                matched.entry(node).or_insert(value);
            }
        }

        if matched.is_empty()
            && let Some(mut failure) = failure
        {
            failure.evaluated_path = context.evaluated_path();
            log::warn!("[{}] {failure}", context.query_id());
            context.clear_history();
            return Err(QueryError::SearchFailed(failure));
        }

        let unmatched_nodes: BTreeSet<QuerySpecTypeNode> = targets
            .iter()
            .filter(|target| !matched.contains_key(*target))
            .cloned()
            .collect();
        for node in &unmatched_nodes {
            log::warn!("[{}] No strategy resolved {node}", context.query_id());
        }

        let results = targets
            .iter()
            .map(|target| (target.clone(), matched.get(target).cloned()))
            .collect();

        context.profiler_mut().finish();
        let timings = if self.config.profiler.enabled {
            context.profiler().timings()
        } else {
            BTreeMap::new()
        };
        let result = QueryResult {
            results,
            unmatched_nodes,
            evaluated_path: context.evaluated_path(),
            timings,
            duration_ms: context.profiler().total_duration(),
            query_id: context.query_id().to_string(),
        };
        context.clear_history();

        log::info!(
            "[{}] Query finished in {}ms, {} of {} targets resolved",
            result.query_id,
            result.duration_ms,
            targets.len() - result.unmatched_nodes.len(),
            targets.len()
        );
        Ok(result)
    }
}

impl QueryEngineFactory {
    /// A factory using `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Time queries with `clock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build an engine calling operations through `invoker`, wrapped in the
    /// invocation cache unless caching is disabled.
    pub fn build(&self, schema_provider: Arc<dyn SchemaProvider>, invoker: Arc<dyn OperationInvoker>) -> QueryEngine {
        let invoker = CachingOperationInvoker::decorate(invoker, &self.config.cache);
        let evaluators = Arc::new(EdgeEvaluators::new(invoker));
        let strategies = default_strategies(evaluators, &self.config.search);
        QueryEngine::new(schema_provider, strategies, self.config.clone())
            .with_clock(Arc::clone(&self.clock))
    }
}

fn describe(targets: &[QuerySpecTypeNode]) -> String {
    targets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Tests
// ============================================================================
