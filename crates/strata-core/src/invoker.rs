//! The outbound seam to remote operations.
//!
//! Connector crates (HTTP, databases, message buses) implement
//! [`OperationInvoker`]; the engine only ever talks to this trait, usually
//! through the caching decorator in `strata-cache`.

use crate::Result;
use crate::instance::TypedInstance;
use crate::schema::{Operation, Parameter, QualifiedName};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// A stream of results from one invocation.
///
/// An `Err` item is terminal: nothing follows it.
pub type ResultStream = BoxStream<'static, Result<TypedInstance>>;

/// One argument bound to its parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterValue {
    /// The declared parameter.
    pub parameter: Parameter,
    /// The argument passed for it.
    pub value: TypedInstance,
}

impl ParameterValue {
    /// Bind an argument to a parameter.
    pub fn new(parameter: Parameter, value: TypedInstance) -> Self {
        Self { parameter, value }
    }
}

/// Everything needed to call one operation.
#[derive(Clone, Debug)]
pub struct InvocationRequest {
    /// Owning service.
    pub service: QualifiedName,
    /// The operation to call.
    pub operation: Operation,
    /// Arguments in parameter order.
    pub parameters: Vec<ParameterValue>,
    /// Id of the query on whose behalf the call is made.
    pub query_id: String,
}

impl InvocationRequest {
    /// Create a request for `operation` with the given arguments.
    pub fn new(
        operation: &Operation,
        parameters: Vec<ParameterValue>,
        query_id: impl Into<String>,
    ) -> Self {
        Self {
            service: operation.service.clone(),
            operation: operation.clone(),
            parameters,
            query_id: query_id.into(),
        }
    }

    /// The `Service@@operation` name of the target.
    pub fn qualified_name(&self) -> String {
        self.operation.qualified_name()
    }
}

/// Whether results of an operation may be shared between callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachingBehaviour {
    /// Deduplicate and replay results.
    #[default]
    Cache,
    /// Always call through.
    NoCache,
}

/// Invokes remote operations.
///
/// Implementations own transport concerns, including timeouts.
#[async_trait]
pub trait OperationInvoker: Send + Sync {
    /// Start the call and return its result stream.
    ///
    /// Failures may surface either as an `Err` here or as an `Err` item in
    /// the stream; callers treat both the same way.
    async fn invoke(&self, request: InvocationRequest) -> Result<ResultStream>;

    /// How results of `operation` may be cached.
    fn caching_behaviour(&self, _operation: &Operation) -> CachingBehaviour {
        CachingBehaviour::Cache
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct EchoInvoker;

    #[async_trait]
    impl OperationInvoker for EchoInvoker {
        async fn invoke(&self, request: InvocationRequest) -> Result<ResultStream> {
            let items: Vec<Result<TypedInstance>> = request
                .parameters
                .into_iter()
                .map(|p| Ok(p.value))
                .collect();
            Ok(futures::stream::iter(items).boxed())
        }
    }

    #[tokio::test]
    async fn test_invoker_streams_results() {
        let mut op = Operation::new("echo", "String").with_parameter(Parameter::new("String"));
        op.service = "EchoService".into();
        let request = InvocationRequest::new(
            &op,
            vec![ParameterValue::new(
                op.parameters[0].clone(),
                TypedInstance::scalar("String", "hi"),
            )],
            "q1",
        );
        assert_eq!(request.qualified_name(), "EchoService@@echo");

        let results: Vec<_> = EchoInvoker.invoke(request).await.unwrap().collect().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().to_raw(), serde_json::json!("hi"));
    }

    #[test]
    fn test_default_caching_behaviour() {
        let op = Operation::new("echo", "String");
        assert_eq!(EchoInvoker.caching_behaviour(&op), CachingBehaviour::Cache);
    }
}
