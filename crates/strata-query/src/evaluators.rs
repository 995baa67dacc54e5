//! Edge evaluators.
//!
//! Every [`Relationship`] has exactly one evaluator, looked up through
//! [`EdgeEvaluators`]. An evaluator answers two questions about an edge:
//!
//! - [`EdgeEvaluator::can_evaluate`]: is the edge worth trying right now? This
//!   is cheap and has no side effects.
//! - [`EdgeEvaluator::evaluate`]: traverse it, producing the value found on
//!   the other side or a reason why not.
//!
//! Evaluators read the context but never change it. The only side effect
//! any of them has is the remote call made by the `PROVIDES` evaluator; the
//! value it returns is added to the context by the caller.

use crate::context::{FactDiscoveryStrategy, QueryContext};
use crate::parameters::ParameterFactory;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use strata_core::profiler::RemoteCall;
use strata_core::{InvocationRequest, OperationInvoker, OperationType, QualifiedName, TypedInstance};
use strata_graph::{Edge, Element, EvaluatedEdge, Relationship};

// ============================================================================
// Types
// ============================================================================

/// An edge about to be traversed, with the value that led to it.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatableEdge {
    /// The edge.
    pub edge: Edge,
    /// Value produced by the previous step, if any.
    pub previous: Option<Arc<TypedInstance>>,
}

impl EvaluatableEdge {
    /// Wrap an edge reached with `previous`.
    pub fn new(edge: Edge, previous: Option<Arc<TypedInstance>>) -> Self {
        Self { edge, previous }
    }

    /// The previous value, if it can stand in for `type_name`.
    fn previous_of_type(&self, type_name: &QualifiedName, context: &QueryContext) -> Option<&Arc<TypedInstance>> {
        self.previous
            .as_ref()
            .filter(|value| context.schema().is_assignable(&value.type_name, type_name))
    }
}

/// Judges and traverses edges of one relationship.
#[async_trait]
pub trait EdgeEvaluator: Send + Sync {
    /// The relationship handled.
    fn relationship(&self) -> Relationship;

    /// Whether the edge could currently succeed.
    fn can_evaluate(&self, _edge: &EvaluatableEdge, _context: &QueryContext) -> bool {
        true
    }

    /// Traverse the edge.
    async fn evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> EvaluatedEdge;

    /// Search cost of traversing the edge.
    fn cost(&self, edge: &EvaluatableEdge) -> u32 {
        edge.edge.cost()
    }
}

// ============================================================================
// Pass-through
// ============================================================================

/// Carries the previous value across the edge unchanged.
///
/// Used where the edge changes the search position but not the value:
/// `IS_TYPE_OF`, `OPERATION_PARAMETER` and `CAN_POPULATE`.
#[derive(Clone, Copy, Debug)]
pub struct PassThroughEvaluator {
    relationship: Relationship,
}

impl PassThroughEvaluator {
    /// Evaluator for `relationship`.
    pub fn new(relationship: Relationship) -> Self {
        Self { relationship }
    }
}

#[async_trait]
impl EdgeEvaluator for PassThroughEvaluator {
    fn relationship(&self) -> Relationship {
        self.relationship
    }

    fn can_evaluate(&self, edge: &EvaluatableEdge, _context: &QueryContext) -> bool {
        edge.previous.is_some()
    }

    async fn evaluate(&self, edge: &EvaluatableEdge, _context: &QueryContext) -> EvaluatedEdge {
        match &edge.previous {
            Some(value) => EvaluatedEdge::success(edge.edge.clone(), Arc::clone(value)),
            None => EvaluatedEdge::failed(edge.edge.clone(), "no value to carry across the edge"),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

/// Reads an attribute from a value of its declaring type.
///
/// Handles `HAS_ATTRIBUTE` and `INSTANCE_HAS_ATTRIBUTE`. The owner is the
/// previous value when its type fits, otherwise the single known fact of the
/// declaring type. A missing or null attribute fails the edge.
#[derive(Clone, Copy, Debug)]
pub struct AttributeEvaluator {
    relationship: Relationship,
}

impl AttributeEvaluator {
    /// Evaluator for `relationship`.
    pub fn new(relationship: Relationship) -> Self {
        Self { relationship }
    }

    fn owner(&self, edge: &EvaluatableEdge, context: &QueryContext) -> Option<Arc<TypedInstance>> {
        let Element::Attribute { declaring, .. } = &edge.edge.to else {
            return None;
        };
        edge.previous_of_type(declaring, context)
            .cloned()
            .or_else(|| context.get_fact(declaring, FactDiscoveryStrategy::AnyDepthExpectOneDistinct))
    }
}

#[async_trait]
impl EdgeEvaluator for AttributeEvaluator {
    fn relationship(&self) -> Relationship {
        self.relationship
    }

    fn can_evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> bool {
        self.owner(edge, context).is_some()
    }

    async fn evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> EvaluatedEdge {
        let Element::Attribute { declaring, name } = &edge.edge.to else {
            return EvaluatedEdge::failed(edge.edge.clone(), "edge does not lead to an attribute");
        };
        let Some(owner) = self.owner(edge, context) else {
            return EvaluatedEdge::failed(edge.edge.clone(), format!("no value of type {declaring} is known"));
        };
        match owner.attribute(name) {
            Some(value) if !value.is_null() => {
                EvaluatedEdge::success(edge.edge.clone(), Arc::new(value.clone()))
            }
            _ => EvaluatedEdge::failed(edge.edge.clone(), format!("{declaring}.{name} is null")),
        }
    }
}

/// Moves from an attribute value to a known fact that holds it.
///
/// Handles `ATTRIBUTE_OF`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AttributeOfEvaluator;

#[async_trait]
impl EdgeEvaluator for AttributeOfEvaluator {
    fn relationship(&self) -> Relationship {
        Relationship::AttributeOf
    }

    fn can_evaluate(&self, edge: &EvaluatableEdge, _context: &QueryContext) -> bool {
        edge.previous.is_some()
    }

    async fn evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> EvaluatedEdge {
        let (Element::Attribute { declaring, name }, Some(value)) = (&edge.edge.from, &edge.previous) else {
            return EvaluatedEdge::failed(edge.edge.clone(), "no attribute value to start from");
        };
        let owner = context.model_tree().find(|fact| {
            context.schema().is_assignable(&fact.type_name, declaring)
                && fact.attribute(name) == Some(value.as_ref())
        });
        match owner {
            Some(owner) => EvaluatedEdge::success(edge.edge.clone(), Arc::new(owner.clone())),
            None => EvaluatedEdge::failed(
                edge.edge.clone(),
                format!("no known {declaring} has {name} = {value}"),
            ),
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Finds a value for one of an operation's parameters.
///
/// Handles `REQUIRES_PARAMETER`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequiresParameterEvaluator {
    parameters: ParameterFactory,
}

impl RequiresParameterEvaluator {
    fn find(&self, edge: &EvaluatableEdge, context: &QueryContext) -> Option<Arc<TypedInstance>> {
        let Element::Type(param_type) = &edge.edge.to else {
            return None;
        };
        edge.previous_of_type(param_type, context)
            .cloned()
            .or_else(|| self.parameters.discover(param_type, context))
    }
}

#[async_trait]
impl EdgeEvaluator for RequiresParameterEvaluator {
    fn relationship(&self) -> Relationship {
        Relationship::RequiresParameter
    }

    fn can_evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> bool {
        self.find(edge, context).is_some()
    }

    async fn evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> EvaluatedEdge {
        match self.find(edge, context) {
            Some(value) => EvaluatedEdge::success(edge.edge.clone(), value),
            None => EvaluatedEdge::failed(
                edge.edge.clone(),
                format!("no value for parameter type {}", edge.edge.to),
            ),
        }
    }
}

/// Invokes an operation.
///
/// Handles `PROVIDES`. Arguments are bound from the previous value and the
/// known facts, then checked against parameter constraints before the call.
/// A collection return type yields one collection instance; otherwise the
/// first result is used.
pub struct OperationInvocationEvaluator {
    invoker: Arc<dyn OperationInvoker>,
    parameters: ParameterFactory,
}

impl OperationInvocationEvaluator {
    /// Evaluator calling through `invoker`.
    pub fn new(invoker: Arc<dyn OperationInvoker>) -> Self {
        Self {
            invoker,
            parameters: ParameterFactory,
        }
    }
}

impl std::fmt::Debug for OperationInvocationEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationInvocationEvaluator").finish_non_exhaustive()
    }
}

#[async_trait]
impl EdgeEvaluator for OperationInvocationEvaluator {
    fn relationship(&self) -> Relationship {
        Relationship::Provides
    }

    fn can_evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> bool {
        let Element::Operation(name) = &edge.edge.from else {
            return false;
        };
        let Ok(operation) = context.schema().operation(name) else {
            return false;
        };
        operation.parameters.iter().all(|param| {
            param.nullable
                || edge.previous_of_type(&param.type_name, context).is_some()
                || self.parameters.discover(&param.type_name, context).is_some()
        })
    }

    async fn evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> EvaluatedEdge {
        let failed = |reason: String| EvaluatedEdge::failed(edge.edge.clone(), reason);

        let Element::Operation(name) = &edge.edge.from else {
            return failed("edge does not start at an operation".to_string());
        };
        let operation = match context.schema().operation(name) {
            Ok(operation) => operation,
            Err(err) => return failed(err.to_string()),
        };
        let arguments = match self.parameters.bind(
            &operation.parameters,
            edge.previous.as_ref(),
            context,
        ) {
            Ok(arguments) => arguments,
            Err(reason) => return failed(reason),
        };

        log::debug!("[{}] Invoking {name}", context.query_id());
        let request = InvocationRequest::new(operation, arguments, context.query_id());
        let mut stream = match self.invoker.invoke(request).await {
            Ok(stream) => stream,
            Err(err) => return failed(err.to_string()),
        };

        let mut results = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => results.push(value),
                Err(err) => return failed(err.to_string()),
            }
        }

        let return_type = &operation.return_type;
        let value = if context.schema().member_type(return_type).is_some() {
            TypedInstance::collection(return_type, results)
        } else {
            let count = results.len();
            let mut results = results.into_iter();
            let Some(first) = results.next() else {
                return failed(format!("{name} returned no results"));
            };
            if count > 1 {
                log::warn!(
                    "[{}] {name} returns a single {return_type} but produced {count} results; using the first",
                    context.query_id()
                );
            }
            first
        };
        EvaluatedEdge::success(edge.edge.clone(), Arc::new(value))
    }
}

// ============================================================================
// Lookup table
// ============================================================================

/// One evaluator per relationship.
#[derive(Clone)]
pub struct EdgeEvaluators {
    evaluators: HashMap<Relationship, Arc<dyn EdgeEvaluator>>,
}

impl std::fmt::Debug for EdgeEvaluators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut relationships: Vec<_> = self.evaluators.keys().collect();
        relationships.sort();
        f.debug_struct("EdgeEvaluators")
            .field("relationships", &relationships)
            .finish()
    }
}

impl EdgeEvaluators {
    /// The standard evaluators, invoking operations through `invoker`.
    pub fn new(invoker: Arc<dyn OperationInvoker>) -> Self {
        let table = Self {
            evaluators: HashMap::new(),
        };
        table
            .with_evaluator(Arc::new(AttributeEvaluator::new(Relationship::HasAttribute)))
            .with_evaluator(Arc::new(PassThroughEvaluator::new(Relationship::IsTypeOf)))
            .with_evaluator(Arc::new(AttributeOfEvaluator))
            .with_evaluator(Arc::new(PassThroughEvaluator::new(Relationship::OperationParameter)))
            .with_evaluator(Arc::new(RequiresParameterEvaluator::default()))
            .with_evaluator(Arc::new(OperationInvocationEvaluator::new(invoker)))
            .with_evaluator(Arc::new(AttributeEvaluator::new(Relationship::InstanceHasAttribute)))
            .with_evaluator(Arc::new(PassThroughEvaluator::new(Relationship::CanPopulate)))
    }

    /// Register or replace the evaluator for its relationship.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn EdgeEvaluator>) -> Self {
        self.evaluators.insert(evaluator.relationship(), evaluator);
        self
    }

    /// The evaluator for a relationship.
    pub fn get(&self, relationship: Relationship) -> Option<&Arc<dyn EdgeEvaluator>> {
        self.evaluators.get(&relationship)
    }

    /// Whether the edge is currently traversable.
    pub fn can_evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> bool {
        self.get(edge.edge.relationship)
            .is_some_and(|evaluator| evaluator.can_evaluate(edge, context))
    }

    /// Search cost of an edge.
    pub fn cost(&self, edge: &EvaluatableEdge) -> u32 {
        self.get(edge.edge.relationship)
            .map_or_else(|| edge.edge.cost(), |evaluator| evaluator.cost(edge))
    }

    /// Traverse an edge without recording anything.
    pub async fn evaluate(&self, edge: &EvaluatableEdge, context: &QueryContext) -> EvaluatedEdge {
        match self.get(edge.edge.relationship) {
            Some(evaluator) => evaluator.evaluate(edge, context).await,
            None => EvaluatedEdge::failed(
                edge.edge.clone(),
                format!("no evaluator for {}", edge.edge.relationship),
            ),
        }
    }

    /// Traverse an edge, profiling it and appending the outcome to the
    /// context's evaluation history.
    pub async fn evaluate_recorded(&self, edge: &EvaluatableEdge, context: &mut QueryContext) -> EvaluatedEdge {
        let operation = match (&edge.edge.relationship, &edge.edge.from) {
            (Relationship::Provides, Element::Operation(name)) => Some(name.clone()),
            _ => None,
        };
        let kind = if operation.is_some() {
            OperationType::RemoteCall
        } else {
            OperationType::GraphTraversal
        };
        let id = context
            .profiler_mut()
            .start_child("EdgeEvaluators", edge.edge.to_string(), kind);

        let evaluated = self.evaluate(edge, context).await;

        let profiler = context.profiler_mut();
        profiler.stop(id);
        if let Some(operation) = operation {
            let call = RemoteCall {
                operation,
                result_count: evaluated.value().map_or(0, |value| value.members().len()),
                failed: !evaluated.is_success(),
                duration_ms: profiler.duration(id),
            };
            profiler.add_remote_call(id, call);
        }
        log::debug!("[{}] Evaluated {evaluated}", context.query_id());
        context.record_evaluation(evaluated.clone());
        evaluated
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;
    use strata_cache::StubInvoker;
    use strata_core::config::ContextConfig;
    use strata_core::{Constraint, Error, Operation, Parameter, Schema, Type};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .with_scalar("OrderId")
                .with_scalar("Total")
                .with_type(
                    Type::new("Order")
                        .attribute("id", "OrderId")
                        .attribute("total", "Total"),
                )
                .with_operation(
                    "Orders",
                    Operation::new("getTotalById", "Total")
                        .with_parameter(Parameter::new("OrderId")),
                )
                .with_operation(
                    "Orders",
                    Operation::new("listTotals", "Total[]").with_parameter(Parameter::new("OrderId")),
                )
                .with_operation(
                    "Orders",
                    Operation::new("getSpecialTotal", "Total").with_parameter(
                        Parameter::new("OrderId").with_constraint(Constraint::ValueEquals {
                            value: json!("special"),
                        }),
                    ),
                )
                .build()
                .unwrap(),
        )
    }

    fn context(facts: Vec<TypedInstance>) -> QueryContext {
        QueryContext::new(schema(), &ContextConfig::default()).with_facts(facts)
    }

    fn totals(values: Vec<i64>) -> Arc<StubInvoker> {
        Arc::new(StubInvoker::new(move |_| {
            let items: Vec<_> = values
                .iter()
                .map(|v| Ok(TypedInstance::scalar("Total", *v)))
                .collect();
            Ok(stream::iter(items).boxed())
        }))
    }

    fn provides(operation: &str, returns: &str, previous: Option<TypedInstance>) -> EvaluatableEdge {
        EvaluatableEdge::new(
            Edge::new(
                Element::operation(operation),
                Relationship::Provides,
                Element::instance(returns),
            ),
            previous.map(Arc::new),
        )
    }

    fn order() -> TypedInstance {
        TypedInstance::object(
            "Order",
            [
                ("id", TypedInstance::scalar("OrderId", "123")),
                ("total", TypedInstance::null("Total")),
            ],
        )
    }

    #[tokio::test]
    async fn test_provides_invokes_with_previous_value() {
        let stub = totals(vec![100]);
        let evaluators = EdgeEvaluators::new(stub.clone());
        let ctx = context(Vec::new());
        let edge = provides(
            "Orders@@getTotalById",
            "Total",
            Some(TypedInstance::scalar("OrderId", "123")),
        );

        assert!(evaluators.can_evaluate(&edge, &ctx));
        let evaluated = evaluators.evaluate(&edge, &ctx).await;
        assert_eq!(evaluated.value().unwrap().to_raw(), json!(100));

        let calls = stub.invoked_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters[0].value.to_raw(), json!("123"));
        assert_eq!(calls[0].query_id, ctx.query_id());
    }

    #[tokio::test]
    async fn test_provides_binds_from_context_and_uses_first_of_many() {
        let evaluators = EdgeEvaluators::new(totals(vec![1, 2]));
        let ctx = context(vec![TypedInstance::scalar("OrderId", "123")]);
        let evaluated = evaluators
            .evaluate(&provides("Orders@@getTotalById", "Total", None), &ctx)
            .await;
        assert_eq!(evaluated.value().unwrap().to_raw(), json!(1));
    }

    #[tokio::test]
    async fn test_provides_collects_collection_returns() {
        let evaluators = EdgeEvaluators::new(totals(vec![1, 2, 3]));
        let ctx = context(vec![TypedInstance::scalar("OrderId", "123")]);
        let evaluated = evaluators
            .evaluate(&provides("Orders@@listTotals", "Total[]", None), &ctx)
            .await;
        let value = evaluated.value().unwrap();
        assert_eq!(value.type_name.as_str(), "Total[]");
        assert_eq!(value.to_raw(), json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn test_provides_failures_are_values() {
        let ctx = context(vec![TypedInstance::scalar("OrderId", "123")]);

        let empty = EdgeEvaluators::new(totals(Vec::new()));
        let evaluated = empty
            .evaluate(&provides("Orders@@getTotalById", "Total", None), &ctx)
            .await;
        assert_eq!(evaluated.error(), Some("Orders@@getTotalById returned no results"));

        let broken = EdgeEvaluators::new(Arc::new(StubInvoker::new(|request| {
            Err(Error::invocation(request.qualified_name(), "down"))
        })));
        let evaluated = broken
            .evaluate(&provides("Orders@@getTotalById", "Total", None), &ctx)
            .await;
        assert_eq!(
            evaluated.error(),
            Some("Invocation of Orders@@getTotalById failed: down")
        );
    }

    #[tokio::test]
    async fn test_provides_checks_constraints_before_calling() {
        let stub = totals(vec![1]);
        let evaluators = EdgeEvaluators::new(stub.clone());
        let ctx = context(vec![TypedInstance::scalar("OrderId", "123")]);
        let evaluated = evaluators
            .evaluate(&provides("Orders@@getSpecialTotal", "Total", None), &ctx)
            .await;
        assert!(!evaluated.is_success());
        assert_eq!(stub.invocation_count(), 0);
    }

    #[test]
    fn test_provides_cannot_evaluate_without_parameters() {
        let evaluators = EdgeEvaluators::new(totals(vec![1]));
        let ctx = context(Vec::new());
        assert!(!evaluators.can_evaluate(&provides("Orders@@getTotalById", "Total", None), &ctx));
    }

    #[tokio::test]
    async fn test_attribute_evaluation() {
        let evaluators = EdgeEvaluators::new(totals(Vec::new()));
        let ctx = context(vec![order()]);

        let id = EvaluatableEdge::new(
            Edge::new(
                Element::type_of("Order"),
                Relationship::HasAttribute,
                Element::attribute("Order", "id"),
            ),
            None,
        );
        assert!(evaluators.can_evaluate(&id, &ctx));
        let evaluated = evaluators.evaluate(&id, &ctx).await;
        assert_eq!(*evaluated.value().unwrap().as_ref(), TypedInstance::scalar("OrderId", "123"));

        let total = EvaluatableEdge::new(
            Edge::new(
                Element::type_of("Order"),
                Relationship::HasAttribute,
                Element::attribute("Order", "total"),
            ),
            None,
        );
        let evaluated = evaluators.evaluate(&total, &ctx).await;
        assert_eq!(evaluated.error(), Some("Order.total is null"));
    }

    #[tokio::test]
    async fn test_attribute_of_finds_owner() {
        let evaluators = EdgeEvaluators::new(totals(Vec::new()));
        let ctx = context(vec![order()]);
        let edge = EvaluatableEdge::new(
            Edge::new(
                Element::attribute("Order", "id"),
                Relationship::AttributeOf,
                Element::type_of("Order"),
            ),
            Some(Arc::new(TypedInstance::scalar("OrderId", "123"))),
        );
        let evaluated = evaluators.evaluate(&edge, &ctx).await;
        assert_eq!(evaluated.value().unwrap().type_name.as_str(), "Order");

        let stranger = EvaluatableEdge {
            previous: Some(Arc::new(TypedInstance::scalar("OrderId", "999"))),
            ..edge
        };
        assert!(!evaluators.evaluate(&stranger, &ctx).await.is_success());
    }

    #[tokio::test]
    async fn test_requires_parameter_and_pass_through() {
        let evaluators = EdgeEvaluators::new(totals(Vec::new()));
        let ctx = context(vec![TypedInstance::scalar("OrderId", "123")]);

        let requires = EvaluatableEdge::new(
            Edge::new(
                Element::operation("Orders@@getTotalById"),
                Relationship::RequiresParameter,
                Element::type_of("OrderId"),
            ),
            None,
        );
        let evaluated = evaluators.evaluate(&requires, &ctx).await;
        assert_eq!(evaluated.value().unwrap().to_raw(), json!("123"));

        let populate = EvaluatableEdge::new(
            Edge::new(
                Element::instance("Total"),
                Relationship::CanPopulate,
                Element::type_of("Total"),
            ),
            None,
        );
        assert!(!evaluators.can_evaluate(&populate, &ctx));
        assert!(!evaluators.evaluate(&populate, &ctx).await.is_success());
    }

    #[tokio::test]
    async fn test_evaluate_recorded_profiles_and_records() {
        let evaluators = EdgeEvaluators::new(totals(vec![100]));
        let mut ctx = context(vec![TypedInstance::scalar("OrderId", "123")]);
        let evaluated = evaluators
            .evaluate_recorded(&provides("Orders@@getTotalById", "Total", None), &mut ctx)
            .await;

        assert!(evaluated.is_success());
        assert_eq!(ctx.evaluated_path(), vec![evaluated]);
        let calls = ctx.profiler().remote_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, "Orders@@getTotalById");
        assert_eq!(calls[0].result_count, 1);
        assert!(!calls[0].failed);
    }

    #[test]
    fn test_every_relationship_has_an_evaluator() {
        let evaluators = EdgeEvaluators::new(totals(Vec::new()));
        for relationship in Relationship::ALL {
            assert_eq!(evaluators.get(relationship).unwrap().relationship(), relationship);
        }
    }
}
