//! Stub invokers for tests and offline runs.
//!
//! [`StubInvoker`] answers every call through a handler closure and records
//! what it was asked. [`StubResponses`] builds such a handler from canned JSON
//! responses keyed by `Service@@operation`.

use crate::key::CacheKey;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strata_core::{
    CachingBehaviour, Error, InvocationRequest, Operation, OperationInvoker, Result, ResultStream,
    Schema, TypedInstance,
};

type Handler = Arc<dyn Fn(&InvocationRequest) -> Result<ResultStream> + Send + Sync>;

// ============================================================================
// StubInvoker
// ============================================================================

/// An invoker driven by a closure.
pub struct StubInvoker {
    handler: Handler,
    delay: Option<Duration>,
    caching_behaviour: CachingBehaviour,
    in_progress: Option<Mutex<HashSet<CacheKey>>>,
    count: AtomicUsize,
    calls: Mutex<Vec<InvocationRequest>>,
}

impl StubInvoker {
    /// Answer every call with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&InvocationRequest) -> Result<ResultStream> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            delay: None,
            caching_behaviour: CachingBehaviour::Cache,
            in_progress: None,
            count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Wait before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report this caching behaviour for every operation.
    pub fn with_caching_behaviour(mut self, behaviour: CachingBehaviour) -> Self {
        self.caching_behaviour = behaviour;
        self
    }

    /// Fail any call that overlaps an in-flight call for the same request.
    pub fn prohibit_concurrent_access(mut self) -> Self {
        self.in_progress = Some(Mutex::new(HashSet::new()));
        self
    }

    /// Number of calls received.
    pub fn invocation_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn invoked_calls(&self) -> Vec<InvocationRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn enter(&self, key: CacheKey) -> bool {
        match &self.in_progress {
            Some(guard) => guard
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key),
            None => true,
        }
    }

    fn leave(&self, key: &CacheKey) {
        if let Some(guard) = &self.in_progress {
            guard
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(key);
        }
    }
}

impl std::fmt::Debug for StubInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubInvoker")
            .field("delay", &self.delay)
            .field("caching_behaviour", &self.caching_behaviour)
            .field("invocation_count", &self.invocation_count())
            .finish()
    }
}

#[async_trait]
impl OperationInvoker for StubInvoker {
    async fn invoke(&self, request: InvocationRequest) -> Result<ResultStream> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let key = CacheKey::for_request(&request);
        if !self.enter(key) {
            return Err(Error::invocation(
                request.qualified_name(),
                "concurrent invocation of the same request",
            ));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let outcome = (self.handler)(&request);
        self.leave(&key);
        outcome
    }

    fn caching_behaviour(&self, _operation: &Operation) -> CachingBehaviour {
        self.caching_behaviour
    }
}

// ============================================================================
// StubResponses
// ============================================================================

/// One canned answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StubResponse {
    /// Raw argument values to match; absent matches any arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Value>>,

    /// Raw result, typed by the operation's return type.
    pub result: Value,
}

impl StubResponse {
    fn matches(&self, request: &InvocationRequest) -> bool {
        match &self.parameters {
            None => true,
            Some(expected) => {
                expected.len() == request.parameters.len()
                    && expected
                        .iter()
                        .zip(&request.parameters)
                        .all(|(want, got)| *want == got.value.to_raw())
            }
        }
    }
}

/// Canned responses keyed by `Service@@operation`.
///
/// ```json
/// {
///   "Orders@@getTotalById": [
///     { "parameters": ["123"], "result": 100 },
///     { "result": 0 }
///   ]
/// }
/// ```
///
/// The first matching response wins. Collection results are streamed one
/// member at a time.
#[derive(Clone, Debug)]
pub struct StubResponses {
    schema: Arc<Schema>,
    responses: BTreeMap<String, Vec<StubResponse>>,
}

impl StubResponses {
    /// An empty set of responses.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            responses: BTreeMap::new(),
        }
    }

    /// Parse responses from JSON, checking every operation exists.
    pub fn from_json(schema: Arc<Schema>, json: &str) -> Result<Self> {
        let responses: BTreeMap<String, Vec<StubResponse>> = serde_json::from_str(json)?;
        for operation in responses.keys() {
            schema.operation(operation)?;
        }
        Ok(Self { schema, responses })
    }

    /// Add a response.
    pub fn with_response(mut self, operation: impl Into<String>, response: StubResponse) -> Self {
        self.responses
            .entry(operation.into())
            .or_default()
            .push(response);
        self
    }

    /// Number of operations with responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether there are no responses.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Answer a request.
    pub fn respond(&self, request: &InvocationRequest) -> Result<ResultStream> {
        let name = request.qualified_name();
        let response = self
            .responses
            .get(&name)
            .and_then(|rules| rules.iter().find(|rule| rule.matches(request)))
            .ok_or_else(|| Error::invocation(&name, "no stub response matches the arguments"))?;

        let result = TypedInstance::from_json(
            &self.schema,
            &request.operation.return_type,
            &response.result,
        )?;
        let items: Vec<Result<TypedInstance>> = if result.is_collection() {
            result.members().into_iter().cloned().map(Ok).collect()
        } else {
            vec![Ok(result)]
        };
        Ok(stream::iter(items).boxed())
    }

    /// An invoker answering from these responses.
    pub fn into_invoker(self) -> StubInvoker {
        StubInvoker::new(move |request| self.respond(request))
    }
}

// ============================================================================
// Tests
// ============================================================================
