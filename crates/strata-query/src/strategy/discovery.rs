//! Resolve targets by searching the schema graph.
//!
//! For every held fact, in order, a uniform-cost search runs from the fact's
//! [`Element::Instance`] towards [`Element::Type`] of the target. Edges are
//! pushed onto the frontier only when their evaluator says they can be
//! evaluated, and are evaluated when popped. A successful evaluation moves
//! the search to the edge's target element carrying the produced value;
//! a failed one prunes the branch.
//!
//! The first fact that reaches the target wins. Values returned by
//! operations along the way become facts of the context.

use super::{QueryStrategy, StrategyResult, targets_in_mode};
use crate::context::{FactDiscoveryStrategy, QueryContext};
use crate::error::{QueryError, SearchFailure};
use crate::evaluators::{EdgeEvaluators, EvaluatableEdge};
use crate::target::{QueryMode, QuerySpecTypeNode};
use async_trait::async_trait;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use strata_core::config::SearchConfig;
use strata_core::{OperationType, QualifiedName, TypedInstance};
use strata_graph::{Element, Relationship, SchemaGraph};

// ============================================================================
// Types
// ============================================================================

/// Informed search over the schema graph.
#[derive(Clone, Debug)]
pub struct SearchDiscoveryStrategy {
    evaluators: Arc<EdgeEvaluators>,
    max_evaluations: usize,
}

/// A frontier entry. Ordered by path cost, then insertion order.
#[derive(Debug)]
struct Candidate {
    cost: u32,
    seq: u64,
    edge: EvaluatableEdge,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        (self.cost, self.seq) == (other.cost, other.seq)
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.cost, self.seq).cmp(&(other.cost, other.seq))
    }
}

/// State of one search from one fact.
struct Search<'a> {
    graph: &'a SchemaGraph,
    evaluators: &'a EdgeEvaluators,
    frontier: BinaryHeap<Reverse<Candidate>>,
    settled: HashSet<Element>,
    seq: u64,
}

impl<'a> Search<'a> {
    fn new(graph: &'a SchemaGraph, evaluators: &'a EdgeEvaluators, start: Element) -> Self {
        Self {
            graph,
            evaluators,
            frontier: BinaryHeap::new(),
            settled: HashSet::from([start]),
            seq: 0,
        }
    }

    /// Queue the evaluable edges leaving `element`.
    fn expand(&mut self, element: &Element, value: &Arc<TypedInstance>, cost: u32, context: &QueryContext) {
        for edge in self.graph.outgoing_edges(element) {
            if self.settled.contains(&edge.to) {
                continue;
            }
            let edge = EvaluatableEdge::new(edge, Some(Arc::clone(value)));
            if !self.evaluators.can_evaluate(&edge, context) {
                continue;
            }
            self.seq += 1;
            self.frontier.push(Reverse(Candidate {
                cost: cost + self.evaluators.cost(&edge),
                seq: self.seq,
                edge,
            }));
        }
    }

    /// The cheapest queued edge leading somewhere not yet settled.
    fn next(&mut self) -> Option<Candidate> {
        while let Some(Reverse(candidate)) = self.frontier.pop() {
            if !self.settled.contains(&candidate.edge.edge.to) {
                return Some(candidate);
            }
        }
        None
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl SearchDiscoveryStrategy {
    /// Search with the given evaluators and limits.
    pub fn new(evaluators: Arc<EdgeEvaluators>, config: &SearchConfig) -> Self {
        Self {
            evaluators,
            max_evaluations: config.max_evaluations,
        }
    }

    /// Search for a value of `target` from each held fact in turn.
    ///
    /// Returns `None` when no fact leads to the target.
    pub async fn discover(&self, target: &QualifiedName, context: &mut QueryContext) -> Option<Arc<TypedInstance>> {
        let schema = Arc::clone(context.schema());
        let graph = context.profiler_mut().time(
            "SearchDiscoveryStrategy",
            "build graph",
            OperationType::GraphBuilding,
            |_| SchemaGraph::new(schema),
        );

        let facts: Vec<Arc<TypedInstance>> = context.facts().to_vec();
        for fact in facts {
            if fact.is_null() {
                continue;
            }
            let id = context.profiler_mut().start_child(
                "SearchDiscoveryStrategy",
                format!("{} -> {target}", fact.type_name),
                OperationType::GraphTraversal,
            );
            let found = self.search_from(&graph, fact, target, context).await;
            context.profiler_mut().stop(id);
            if found.is_some() {
                return found;
            }
        }
        None
    }

    async fn search_from(
        &self,
        graph: &SchemaGraph,
        fact: Arc<TypedInstance>,
        target: &QualifiedName,
        context: &mut QueryContext,
    ) -> Option<Arc<TypedInstance>> {
        let start = Element::Instance(fact.type_name.clone());
        let mut search = Search::new(graph, &self.evaluators, start.clone());
        search.expand(&start, &fact, 0, context);

        let mut evaluations = 0;
        while let Some(candidate) = search.next() {
            if evaluations >= self.max_evaluations {
                log::warn!(
                    "[{}] Gave up searching for {target} from {} after {evaluations} evaluations",
                    context.query_id(),
                    fact.type_name
                );
                return None;
            }
            evaluations += 1;

            let evaluated = self.evaluators.evaluate_recorded(&candidate.edge, context).await;
            let Some(value) = evaluated.value().cloned() else {
                continue;
            };
            if candidate.edge.edge.relationship == Relationship::Provides {
                context.add_fact(Arc::clone(&value));
            }

            let state = candidate.edge.edge.to;
            search.settled.insert(state.clone());
            if let Element::Type(name) = &state
                && context.schema().is_assignable(name, target)
                && let Some(result) = select_result(target, &value, context)
            {
                log::info!(
                    "[{}] Found {target} from {} after {evaluations} evaluations",
                    context.query_id(),
                    fact.type_name
                );
                return Some(result);
            }
            search.expand(&state, &value, candidate.cost, context);
        }
        None
    }

    fn failure(&self, targets: &[&QuerySpecTypeNode], context: &QueryContext) -> SearchFailure {
        let names: Vec<String> = targets.iter().map(|t| t.type_name.to_string()).collect();
        let target = targets
            .first()
            .map(|t| t.type_name.clone())
            .unwrap_or_default();

        let graph = SchemaGraph::new(Arc::clone(context.schema()));
        let goal = Element::Type(target.clone());
        let reachable = context
            .facts()
            .iter()
            .any(|fact| graph.is_reachable(&Element::Instance(fact.type_name.clone()), &goal));
        let hint = if reachable {
            "the schema links the known facts to it, but every attempt failed"
        } else {
            "the schema has no path to it from any known fact"
        };

        SearchFailure {
            target,
            message: format!(
                "no path found for {} from {} facts; {hint}",
                names.join(", "),
                context.facts().len()
            ),
            evaluated_path: context.evaluated_path(),
        }
    }
}

/// The value to report for a reached target type.
fn select_result(
    target: &QualifiedName,
    value: &Arc<TypedInstance>,
    context: &QueryContext,
) -> Option<Arc<TypedInstance>> {
    if context.schema().is_assignable(&value.type_name, target) {
        return Some(Arc::clone(value));
    }
    context.get_fact(target, FactDiscoveryStrategy::AnyDepthExpectOneDistinct)
}

#[async_trait]
impl QueryStrategy for SearchDiscoveryStrategy {
    fn name(&self) -> &'static str {
        "SearchDiscoveryStrategy"
    }

    async fn invoke(
        &self,
        targets: &[QuerySpecTypeNode],
        context: &mut QueryContext,
    ) -> Result<StrategyResult, QueryError> {
        let targets = targets_in_mode(targets, QueryMode::Discover);
        if targets.is_empty() {
            return Ok(StrategyResult::none());
        }
        if context.is_empty() {
            log::debug!("[{}] No facts to search from", context.query_id());
            return Ok(StrategyResult::none());
        }

        let known = context.facts().len();
        let mut result = StrategyResult::none();
        for target in &targets {
            if let Some(value) = self.discover(&target.type_name, context).await {
                result.matched.insert((*target).clone(), value);
            }
        }

        if result.matched.is_empty() {
            result.failure = Some(self.failure(&targets, context));
        }
        result.additional_facts = context.facts().iter().skip(known).cloned().collect();
        Ok(result)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::strategy::fixtures;
    use serde_json::json;
    use strata_core::TypedInstance;

    fn strategy(invoker: Arc<strata_cache::StubInvoker>) -> SearchDiscoveryStrategy {
        SearchDiscoveryStrategy::new(
            Arc::new(EdgeEvaluators::new(invoker)),
            &SearchConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_discovers_total_through_operation() {
        let invoker = fixtures::invoker();
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "123")]);

        let result = strategy(invoker.clone())
            .invoke(&[QuerySpecTypeNode::new("Total")], &mut ctx)
            .await
            .unwrap();

        let total = &result.matched[&QuerySpecTypeNode::new("Total")];
        assert_eq!(total.to_raw(), json!(100));
        // regionOf sits at the same depth as getTotalById and is tried too
        assert_eq!(invoker.invocation_count(), 2);
        assert_eq!(result.additional_facts.len(), 2);
        assert!(ctx.has_fact_of_type(&"Total".into(), FactDiscoveryStrategy::TopLevelOnly));

        let provides: Vec<_> = ctx
            .evaluated_path()
            .into_iter()
            .filter(|e| e.edge.relationship == Relationship::Provides)
            .collect();
        assert_eq!(provides.len(), 1);
        assert_eq!(provides[0].edge.from, Element::operation("Orders@@getTotalById"));
        assert!(provides[0].is_success());
    }

    #[tokio::test]
    async fn test_discovers_through_attributes_of_held_objects() {
        let mut ctx = fixtures::context(vec![TypedInstance::object(
            "Order",
            [
                ("id", TypedInstance::scalar("OrderId", "123")),
                ("total", TypedInstance::null("Total")),
            ],
        )]);
        let result = strategy(fixtures::invoker())
            .invoke(&[QuerySpecTypeNode::new("Total")], &mut ctx)
            .await
            .unwrap();
        assert_eq!(
            result.matched[&QuerySpecTypeNode::new("Total")].to_raw(),
            json!(100)
        );
    }

    #[tokio::test]
    async fn test_failed_calls_are_pruned_and_reported() {
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "999")]);
        let result = strategy(fixtures::invoker())
            .invoke(&[QuerySpecTypeNode::new("Total")], &mut ctx)
            .await
            .unwrap();

        assert!(result.matched.is_empty());
        let failure = result.failure.unwrap();
        assert_eq!(failure.target.as_str(), "Total");
        assert!(failure.message.contains("every attempt failed"));
        assert!(
            failure
                .evaluated_path
                .iter()
                .any(|e| e.error() == Some("Invocation of Orders@@getTotalById failed: unknown order"))
        );
    }

    #[tokio::test]
    async fn test_unreachable_target_explains_itself() {
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "123")]);
        let result = strategy(fixtures::invoker())
            .invoke(&[QuerySpecTypeNode::new("CustomerName")], &mut ctx)
            .await
            .unwrap();
        let err = QueryError::SearchFailed(result.failure.unwrap());
        assert!(err.to_string().contains("no path to it"));
    }

    #[tokio::test]
    async fn test_partial_success_is_not_an_error() {
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "123")]);
        let targets = [
            QuerySpecTypeNode::new("Total"),
            QuerySpecTypeNode::new("CustomerName"),
        ];
        let result = strategy(fixtures::invoker())
            .invoke(&targets, &mut ctx)
            .await
            .unwrap();
        assert_eq!(result.matched.len(), 1);
        assert!(result.failure.is_none());
    }

    #[tokio::test]
    async fn test_no_facts_means_nothing_to_do() {
        let invoker = fixtures::invoker();
        let mut ctx = fixtures::context(Vec::new());
        let result = strategy(invoker.clone())
            .invoke(&[QuerySpecTypeNode::new("Total")], &mut ctx)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(invoker.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_evaluation_budget_stops_the_search() {
        let invoker = fixtures::invoker();
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "123")]);
        let strategy = SearchDiscoveryStrategy::new(
            Arc::new(EdgeEvaluators::new(invoker.clone())),
            &SearchConfig { max_evaluations: 1 },
        );
        assert!(strategy.discover(&"Total".into(), &mut ctx).await.is_none());
        assert_eq!(invoker.invocation_count(), 0);
        assert_eq!(ctx.evaluated_path().len(), 1);
    }

    #[tokio::test]
    async fn test_search_is_profiled() {
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "123")]);
        strategy(fixtures::invoker())
            .discover(&"Total".into(), &mut ctx)
            .await
            .unwrap();
        let timings = ctx.profiler().timings();
        assert!(timings.contains_key(&OperationType::GraphBuilding));
        assert!(timings.contains_key(&OperationType::GraphTraversal));
        assert!(timings.contains_key(&OperationType::RemoteCall));
        assert_eq!(ctx.profiler().remote_calls().len(), 2);
    }
}
