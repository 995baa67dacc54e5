//! Finding argument values for operation parameters.

use crate::context::{FactDiscoveryStrategy, QueryContext};
use std::sync::Arc;
use strata_core::{Parameter, ParameterValue, QualifiedName, TypedInstance};

/// Looks up argument values among the known facts.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParameterFactory;

impl ParameterFactory {
    /// Find a usable value of `type_name`.
    ///
    /// Top-level facts are preferred; otherwise a single distinct value
    /// anywhere in the model tree is used. Nulls and empty strings never
    /// count.
    pub fn discover(&self, type_name: &QualifiedName, context: &QueryContext) -> Option<Arc<TypedInstance>> {
        let usable = |fact: &Arc<TypedInstance>| !is_blank(fact);

        if let Some(fact) = context
            .facts()
            .iter()
            .filter(|fact| context.schema().is_assignable(&fact.type_name, type_name))
            .find(|fact| usable(fact))
        {
            return Some(Arc::clone(fact));
        }

        context
            .get_fact(type_name, FactDiscoveryStrategy::AnyDepthExpectOneDistinct)
            .filter(usable)
    }

    /// Bind a value to every parameter, preferring `preferred` where its type
    /// fits, and check each parameter's constraints.
    ///
    /// Returns a description of the first parameter that could not be bound.
    pub fn bind(
        &self,
        parameters: &[Parameter],
        preferred: Option<&Arc<TypedInstance>>,
        context: &QueryContext,
    ) -> Result<Vec<ParameterValue>, String> {
        parameters
            .iter()
            .map(|parameter| {
                let value = preferred
                    .filter(|value| {
                        !is_blank(value)
                            && context
                                .schema()
                                .is_assignable(&value.type_name, &parameter.type_name)
                    })
                    .cloned()
                    .or_else(|| self.discover(&parameter.type_name, context));

                let value = match value {
                    Some(value) => value.as_ref().clone(),
                    None if parameter.nullable => TypedInstance::null(&parameter.type_name),
                    None => {
                        return Err(format!(
                            "no value of type {} for parameter {}",
                            parameter.type_name,
                            parameter.display_name()
                        ));
                    }
                };
                parameter.verify(&value)?;
                Ok(ParameterValue::new(parameter.clone(), value))
            })
            .collect()
    }
}

fn is_blank(fact: &TypedInstance) -> bool {
    fact.is_null() || fact.to_raw().as_str().is_some_and(str::is_empty)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::config::ContextConfig;
    use strata_core::{Constraint, Schema, Type};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .with_scalar("OrderId")
                .with_scalar("Region")
                .with_type(
                    Type::new("Order")
                        .attribute("id", "OrderId")
                        .attribute("region", "Region"),
                )
                .build()
                .unwrap(),
        )
    }

    fn context(facts: Vec<TypedInstance>) -> QueryContext {
        QueryContext::new(schema(), &ContextConfig::default()).with_facts(facts)
    }

    #[test]
    fn test_discover_prefers_top_level() {
        let ctx = context(vec![
            TypedInstance::object("Order", [("id", TypedInstance::scalar("OrderId", "nested"))]),
            TypedInstance::scalar("OrderId", "top"),
        ]);
        let found = ParameterFactory.discover(&"OrderId".into(), &ctx).unwrap();
        assert_eq!(found.to_raw(), json!("top"));
    }

    #[test]
    fn test_discover_falls_back_to_single_nested_value() {
        let ctx = context(vec![TypedInstance::object(
            "Order",
            [("id", TypedInstance::scalar("OrderId", "nested"))],
        )]);
        let found = ParameterFactory.discover(&"OrderId".into(), &ctx).unwrap();
        assert_eq!(found.to_raw(), json!("nested"));
    }

    #[test]
    fn test_discover_ignores_blank_values() {
        let ctx = context(vec![
            TypedInstance::scalar("OrderId", ""),
            TypedInstance::null("Region"),
        ]);
        assert!(ParameterFactory.discover(&"OrderId".into(), &ctx).is_none());
        assert!(ParameterFactory.discover(&"Region".into(), &ctx).is_none());
    }

    #[test]
    fn test_bind_prefers_given_value_and_checks_constraints() {
        let ctx = context(vec![TypedInstance::scalar("OrderId", "from-context")]);
        let preferred = Arc::new(TypedInstance::scalar("OrderId", "preferred"));
        let params = [Parameter::new("OrderId")];

        let bound = ParameterFactory.bind(&params, Some(&preferred), &ctx).unwrap();
        assert_eq!(bound[0].value.to_raw(), json!("preferred"));

        let constrained = [Parameter::new("OrderId").with_constraint(Constraint::ValueEquals {
            value: json!("other"),
        })];
        let err = ParameterFactory.bind(&constrained, Some(&preferred), &ctx).unwrap_err();
        assert!(err.contains("expected OrderId"));
    }

    #[test]
    fn test_bind_reports_missing_parameter() {
        let ctx = context(Vec::new());
        let err = ParameterFactory
            .bind(&[Parameter::named("region", "Region")], None, &ctx)
            .unwrap_err();
        assert_eq!(err, "no value of type Region for parameter region");

        let mut nullable = Parameter::new("Region");
        nullable.nullable = true;
        let bound = ParameterFactory.bind(&[nullable], None, &ctx).unwrap();
        assert!(bound[0].value.is_null());
    }
}
