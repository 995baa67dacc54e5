//! Resolve targets from facts already held.

use super::{QueryStrategy, StrategyResult, targets_in_mode};
use crate::context::{FactDiscoveryStrategy, QueryContext};
use crate::error::QueryError;
use crate::target::{QueryMode, QuerySpecTypeNode};
use async_trait::async_trait;
use strata_core::OperationType;

/// Looks each target up among the known facts.
///
/// Only the target node itself is checked; children are not. A type with
/// several distinct values in the context is left unresolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectFactStrategy;

#[async_trait]
impl QueryStrategy for DirectFactStrategy {
    fn name(&self) -> &'static str {
        "DirectFactStrategy"
    }

    async fn invoke(
        &self,
        targets: &[QuerySpecTypeNode],
        context: &mut QueryContext,
    ) -> Result<StrategyResult, QueryError> {
        let id = context
            .profiler_mut()
            .start_child(self.name(), "lookup", OperationType::Lookup);

        let mut result = StrategyResult::none();
        for target in targets_in_mode(targets, QueryMode::Discover) {
            if let Some(fact) =
                context.get_fact(&target.type_name, FactDiscoveryStrategy::AnyDepthExpectOneDistinct)
            {
                log::debug!("[{}] {target} is already known", context.query_id());
                result.matched.insert(target.clone(), fact);
            }
        }

        context.profiler_mut().stop(id);
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::strategy::fixtures;
    use std::sync::Arc;
    use strata_core::TypedInstance;

    #[tokio::test]
    async fn test_resolves_known_facts_at_any_depth() {
        let mut ctx = fixtures::context(vec![TypedInstance::object(
            "Order",
            [
                ("id", TypedInstance::scalar("OrderId", "123")),
                ("total", TypedInstance::scalar("Total", 100)),
            ],
        )]);
        let targets = [
            QuerySpecTypeNode::new("Total"),
            QuerySpecTypeNode::new("Region"),
        ];

        let result = DirectFactStrategy.invoke(&targets, &mut ctx).await.unwrap();
        assert_eq!(result.matched.len(), 1);
        assert_eq!(
            result.matched[&QuerySpecTypeNode::new("Total")].to_raw(),
            serde_json::json!(100)
        );
    }

    #[tokio::test]
    async fn test_reuses_the_held_reference() {
        let mut ctx = fixtures::context(vec![TypedInstance::scalar("OrderId", "123")]);
        let held = Arc::clone(&ctx.facts()[0]);
        let result = DirectFactStrategy
            .invoke(&[QuerySpecTypeNode::new("OrderId")], &mut ctx)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&result.matched[&QuerySpecTypeNode::new("OrderId")], &held));
    }

    #[tokio::test]
    async fn test_skips_ambiguous_and_gather_targets() {
        let mut ctx = fixtures::context(vec![
            TypedInstance::scalar("OrderId", "1"),
            TypedInstance::scalar("OrderId", "2"),
            TypedInstance::scalar("Region", "EU"),
        ]);
        let targets = [
            QuerySpecTypeNode::new("OrderId"),
            QuerySpecTypeNode::gather("Region"),
        ];
        let result = DirectFactStrategy.invoke(&targets, &mut ctx).await.unwrap();
        assert!(result.is_empty());
    }
}
