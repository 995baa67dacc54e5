//! Resolve targets from formulas over held facts.

use super::{QueryStrategy, StrategyResult, targets_in_mode};
use crate::context::QueryContext;
use crate::error::QueryError;
use crate::target::{QueryMode, QuerySpecTypeNode};
use async_trait::async_trait;
use std::sync::Arc;
use strata_core::{OperationType, QualifiedName, TypedInstance};

/// Derives calculated attributes.
///
/// Walks the model tree for an object whose type declares a formula field of
/// the target type and evaluates the formula over that object's attributes.
/// A formula with a missing or null operand leaves the target unresolved.
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculatedFieldStrategy;

impl CalculatedFieldStrategy {
    /// The first calculable value of `target` in the context.
    pub fn calculate(&self, target: &QualifiedName, context: &QueryContext) -> Option<TypedInstance> {
        let schema = context.schema();
        context.model_tree().find_map(|fact| {
            schema
                .attributes_of(&fact.type_name)
                .into_iter()
                .filter(|(_, field)| schema.is_assignable(&field.type_name, target))
                .find_map(|(name, field)| {
                    let formula = field.formula.as_ref()?;
                    let value = formula.evaluate(|operand| fact.attribute(operand).map(TypedInstance::to_raw))?;
                    log::debug!(
                        "[{}] Calculated {}.{name} = {value}",
                        context.query_id(),
                        fact.type_name
                    );
                    Some(TypedInstance::scalar(&field.type_name, value))
                })
        })
    }
}

#[async_trait]
impl QueryStrategy for CalculatedFieldStrategy {
    fn name(&self) -> &'static str {
        "CalculatedFieldStrategy"
    }

    async fn invoke(
        &self,
        targets: &[QuerySpecTypeNode],
        context: &mut QueryContext,
    ) -> Result<StrategyResult, QueryError> {
        let id = context
            .profiler_mut()
            .start_child(self.name(), "calculate", OperationType::Lookup);

        let mut result = StrategyResult::none();
        for target in targets_in_mode(targets, QueryMode::Discover) {
            if let Some(value) = self.calculate(&target.type_name, context) {
                result.matched.insert(target.clone(), Arc::new(value));
            }
        }

        context.profiler_mut().stop(id);
        Ok(result)
    }
}
