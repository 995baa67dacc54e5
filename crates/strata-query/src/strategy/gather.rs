//! Resolve `gather` targets from every operation that can produce them.

use super::discovery::SearchDiscoveryStrategy;
use super::{QueryStrategy, StrategyResult, targets_in_mode};
use crate::context::QueryContext;
use crate::error::QueryError;
use crate::evaluators::{EdgeEvaluators, EvaluatableEdge};
use crate::parameters::ParameterFactory;
use crate::target::{QueryMode, QuerySpecTypeNode};
use async_trait::async_trait;
use std::sync::Arc;
use strata_core::{Operation, QualifiedName, TypedInstance};
use strata_graph::{Edge, Element, Relationship};

/// Collects values of a type from all operations returning it.
///
/// Every operation returning `T` or `T[]` is invoked once. Parameters not
/// already known are discovered first; an operation whose parameters cannot
/// be found is skipped. The members of all results are combined into one
/// `T[]` value. Enumeration is best effort: failed operations are skipped,
/// and only if nothing at all was collected is the target left unresolved.
#[derive(Clone, Debug)]
pub struct GatherStrategy {
    evaluators: Arc<EdgeEvaluators>,
    discovery: SearchDiscoveryStrategy,
    parameters: ParameterFactory,
}

impl GatherStrategy {
    /// Gather using `evaluators` for calls and `discovery` for parameters.
    pub fn new(evaluators: Arc<EdgeEvaluators>, discovery: SearchDiscoveryStrategy) -> Self {
        Self {
            evaluators,
            discovery,
            parameters: ParameterFactory,
        }
    }

    /// Make sure every required parameter of `operation` has a value.
    async fn prepare(&self, operation: &Operation, context: &mut QueryContext) -> bool {
        for param in &operation.parameters {
            if param.nullable || self.parameters.discover(&param.type_name, context).is_some() {
                continue;
            }
            match self.discovery.discover(&param.type_name, context).await {
                Some(value) => {
                    context.add_fact(value);
                }
                None => {
                    log::debug!(
                        "[{}] Skipping {}: no {} available",
                        context.query_id(),
                        operation.qualified_name(),
                        param.type_name
                    );
                    return false;
                }
            }
        }
        true
    }

    async fn gather(&self, target: &QualifiedName, context: &mut QueryContext) -> Vec<TypedInstance> {
        let schema = Arc::clone(context.schema());
        let operations: Vec<Operation> = schema
            .operations_returning(target)
            .into_iter()
            .cloned()
            .collect();

        let mut members = Vec::new();
        for operation in operations {
            if !self.prepare(&operation, context).await {
                continue;
            }
            let edge = EvaluatableEdge::new(
                Edge::new(
                    Element::operation(operation.qualified_name()),
                    Relationship::Provides,
                    Element::instance(&operation.return_type),
                ),
                None,
            );
            let evaluated = self.evaluators.evaluate_recorded(&edge, context).await;
            match evaluated.value() {
                Some(value) => members.extend(
                    value
                        .members()
                        .into_iter()
                        .filter(|member| schema.is_assignable(&member.type_name, target))
                        .cloned(),
                ),
                None => log::debug!("[{}] Gather skipped {evaluated}", context.query_id()),
            }
        }
        members
    }
}

#[async_trait]
impl QueryStrategy for GatherStrategy {
    fn name(&self) -> &'static str {
        "GatherStrategy"
    }

    async fn invoke(
        &self,
        targets: &[QuerySpecTypeNode],
        context: &mut QueryContext,
    ) -> Result<StrategyResult, QueryError> {
        let mut result = StrategyResult::none();
        for target in targets_in_mode(targets, QueryMode::Gather) {
            let members = self.gather(&target.type_name, context).await;
            log::info!(
                "[{}] Gathered {} values of {}",
                context.query_id(),
                members.len(),
                target.type_name
            );
            if !members.is_empty() {
                let collection = TypedInstance::collection(target.type_name.collection(), members);
                result.matched.insert(target.clone(), Arc::new(collection));
            }
        }
        Ok(result)
    }
}
