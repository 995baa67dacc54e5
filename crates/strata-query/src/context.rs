//! Per-query state.
//!
//! A [`QueryContext`] is created for one top-level query and dropped when
//! the query completes. It holds the schema snapshot, the facts known so
//! far, a bounded history of evaluated edges and the query's profiler. It is
//! never shared between concurrently running queries.

use std::collections::VecDeque;
use std::sync::Arc;
use strata_core::config::ContextConfig;
use strata_core::{QualifiedName, QueryProfiler, Schema, TypedInstance};
use strata_graph::EvaluatedEdge;

// ============================================================================
// Types
// ============================================================================

/// Where and how strictly to look for a fact of a type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FactDiscoveryStrategy {
    /// Only the facts themselves, not their attributes; first match wins.
    TopLevelOnly,
    /// Anywhere in the model tree, and only if exactly one distinct value
    /// matches.
    #[default]
    AnyDepthExpectOneDistinct,
    /// Anywhere in the model tree; first match wins.
    AnyDepthAllowMany,
}

/// Outcome of a fact lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum FactLookup {
    /// A usable fact.
    Found(Arc<TypedInstance>),
    /// Nothing of the type is known.
    Missing,
    /// This many distinct values matched where one was expected.
    Ambiguous(usize),
}

impl FactLookup {
    /// The fact, if one was found.
    pub fn found(self) -> Option<Arc<TypedInstance>> {
        match self {
            Self::Found(fact) => Some(fact),
            Self::Missing | Self::Ambiguous(_) => None,
        }
    }
}

/// Mutable state of one query.
#[derive(Debug)]
pub struct QueryContext {
    schema: Arc<Schema>,
    facts: Vec<Arc<TypedInstance>>,
    evaluated: VecDeque<EvaluatedEdge>,
    max_evaluated_edges: usize,
    query_id: String,
    profiler: QueryProfiler,
}

/// Breadth-first walk over every fact and everything nested inside it.
///
/// The facts are the children of an implicit root, so the walk visits all
/// facts first, then their attributes and members, and so on. It is finite
/// and reflects the facts at the moment it was created.
#[derive(Debug)]
pub struct ModelTree<'a> {
    queue: VecDeque<&'a TypedInstance>,
}

impl<'a> Iterator for ModelTree<'a> {
    type Item = &'a TypedInstance;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children());
        Some(node)
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl QueryContext {
    /// Create an empty context over a schema snapshot.
    pub fn new(schema: Arc<Schema>, config: &ContextConfig) -> Self {
        Self {
            schema,
            facts: Vec::new(),
            evaluated: VecDeque::new(),
            max_evaluated_edges: config.max_evaluated_edges,
            query_id: uuid::Uuid::new_v4().to_string(),
            profiler: QueryProfiler::default(),
        }
    }

    /// Seed the context with facts.
    pub fn with_facts(mut self, facts: impl IntoIterator<Item = TypedInstance>) -> Self {
        self.add_facts(facts.into_iter().map(Arc::new));
        self
    }

    /// Replace the profiler.
    pub fn with_profiler(mut self, profiler: QueryProfiler) -> Self {
        self.profiler = profiler;
        self
    }

    /// Use a fixed query id.
    pub fn with_query_id(mut self, query_id: impl Into<String>) -> Self {
        self.query_id = query_id.into();
        self
    }

    /// The schema snapshot.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Id used to correlate remote calls with this query.
    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Known facts, in the order they were added.
    pub fn facts(&self) -> &[Arc<TypedInstance>] {
        &self.facts
    }

    /// Whether no facts are known.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// The profiler.
    pub fn profiler(&self) -> &QueryProfiler {
        &self.profiler
    }

    /// The profiler, for recording.
    pub fn profiler_mut(&mut self) -> &mut QueryProfiler {
        &mut self.profiler
    }

    /// Add a fact. Adding the same reference twice is a no-op.
    ///
    /// Returns whether the fact was new.
    pub fn add_fact(&mut self, fact: Arc<TypedInstance>) -> bool {
        if self.facts.iter().any(|known| Arc::ptr_eq(known, &fact)) {
            return false;
        }
        log::debug!("[{}] Adding fact {fact}", self.query_id);
        self.facts.push(fact);
        true
    }

    /// Add several facts.
    pub fn add_facts(&mut self, facts: impl IntoIterator<Item = Arc<TypedInstance>>) {
        for fact in facts {
            self.add_fact(fact);
        }
    }

    /// A fresh breadth-first walk over the current facts.
    pub fn model_tree(&self) -> ModelTree<'_> {
        ModelTree {
            queue: self.facts.iter().map(Arc::as_ref).collect(),
        }
    }

    /// Look up a non-null fact assignable to `type_name`.
    pub fn lookup(&self, type_name: &QualifiedName, strategy: FactDiscoveryStrategy) -> FactLookup {
        let matches = |fact: &TypedInstance| {
            !fact.is_null() && self.schema.is_assignable(&fact.type_name, type_name)
        };

        match strategy {
            FactDiscoveryStrategy::TopLevelOnly => self
                .facts
                .iter()
                .find(|fact| matches(fact))
                .map(|fact| FactLookup::Found(Arc::clone(fact)))
                .unwrap_or(FactLookup::Missing),
            FactDiscoveryStrategy::AnyDepthAllowMany => self
                .model_tree()
                .find(|fact| matches(fact))
                .map(|fact| FactLookup::Found(Arc::new(fact.clone())))
                .unwrap_or(FactLookup::Missing),
            FactDiscoveryStrategy::AnyDepthExpectOneDistinct => {
                let mut distinct: Vec<&TypedInstance> = Vec::new();
                for fact in self.model_tree().filter(|fact| matches(fact)) {
                    if !distinct.contains(&fact) {
                        distinct.push(fact);
                    }
                }
                match distinct.as_slice() {
                    [] => FactLookup::Missing,
                    [only] => FactLookup::Found(self.share(only)),
                    many => {
                        log::warn!(
                            "[{}] Found {} distinct facts of type {type_name} where one was expected; treating as absent",
                            self.query_id,
                            many.len()
                        );
                        FactLookup::Ambiguous(many.len())
                    }
                }
            }
        }
    }

    /// Reuse the top-level reference when the value is a fact itself.
    fn share(&self, value: &TypedInstance) -> Arc<TypedInstance> {
        self.facts
            .iter()
            .find(|fact| std::ptr::eq(fact.as_ref(), value))
            .map(Arc::clone)
            .unwrap_or_else(|| Arc::new(value.clone()))
    }

    /// Whether a usable fact of the type is known. Ambiguity counts as absence.
    pub fn has_fact_of_type(&self, type_name: &QualifiedName, strategy: FactDiscoveryStrategy) -> bool {
        matches!(self.lookup(type_name, strategy), FactLookup::Found(_))
    }

    /// A usable fact of the type. Ambiguity counts as absence.
    pub fn get_fact(
        &self,
        type_name: &QualifiedName,
        strategy: FactDiscoveryStrategy,
    ) -> Option<Arc<TypedInstance>> {
        self.lookup(type_name, strategy).found()
    }

    /// Record an attempted edge traversal, dropping the oldest record once
    /// the history is full.
    pub fn record_evaluation(&mut self, evaluated: EvaluatedEdge) {
        if self.max_evaluated_edges == 0 {
            return;
        }
        while self.evaluated.len() >= self.max_evaluated_edges {
            self.evaluated.pop_front();
        }
        self.evaluated.push_back(evaluated);
    }

    /// Every recorded evaluation, oldest first.
    pub fn evaluated_path(&self) -> Vec<EvaluatedEdge> {
        self.evaluated.iter().cloned().collect()
    }

    /// Forget the evaluation history.
    pub fn clear_history(&mut self) {
        self.evaluated.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
