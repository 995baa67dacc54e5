//! The caching invoker decorator.
//!
//! [`CachingOperationInvoker`] wraps any [`OperationInvoker`] and guarantees
//! at most one in-flight underlying call per [`CacheKey`]:
//!
//! - The first caller for a key atomically inserts a [`ReplayBroadcast`] and
//!   spawns a task that pumps the underlying stream into it.
//! - Every caller, including the first, subscribes to that broadcast, so
//!   concurrent and late callers all see the full stream in order.
//! - A failure evicts the entry before it is broadcast, so the next caller
//!   starts a fresh invocation instead of replaying the error.
//! - Once a result grows past the configured ceiling the entry is evicted
//!   while still streaming and stops keeping history: callers already
//!   attached receive every item, new callers start a fresh invocation.
//! - A pump that panics fails its subscribers and is evicted.
//!
//! Different keys never contend beyond the brief map lookup.

use crate::broadcast::{BroadcastStatus, ReplayBroadcast};
use crate::key::CacheKey;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strata_core::config::CacheConfig;
use strata_core::{
    CachingBehaviour, Error, InvocationRequest, OperationInvoker, Result, ResultStream,
    TypedInstance,
};

type Entry = Arc<ReplayBroadcast<TypedInstance>>;
type Entries = Arc<Mutex<HashMap<CacheKey, Entry>>>;

/// Default ceiling on the number of results kept for one key.
pub const DEFAULT_EVICT_WHEN_RESULT_SIZE_EXCEEDS: usize = 10;

/// Deduplicating, replaying wrapper around an invoker.
pub struct CachingOperationInvoker {
    inner: Arc<dyn OperationInvoker>,
    entries: Entries,
    evict_when_result_size_exceeds: usize,
}

impl CachingOperationInvoker {
    /// Wrap an invoker with the default eviction ceiling.
    pub fn new(inner: Arc<dyn OperationInvoker>) -> Self {
        Self {
            inner,
            entries: Arc::new(Mutex::new(HashMap::new())),
            evict_when_result_size_exceeds: DEFAULT_EVICT_WHEN_RESULT_SIZE_EXCEEDS,
        }
    }

    /// Set the result-size ceiling above which entries are evicted.
    pub fn with_evict_when_result_size_exceeds(mut self, ceiling: usize) -> Self {
        self.evict_when_result_size_exceeds = ceiling;
        self
    }

    /// Wrap `inner` according to `config`, or return it untouched when
    /// caching is disabled.
    pub fn decorate(
        inner: Arc<dyn OperationInvoker>,
        config: &CacheConfig,
    ) -> Arc<dyn OperationInvoker> {
        if config.enabled {
            Arc::new(
                Self::new(inner)
                    .with_evict_when_result_size_exceeds(config.evict_when_result_size_exceeds),
            )
        } else {
            inner
        }
    }

    /// Number of cached or in-flight entries.
    pub fn cache_size(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Status of the entry for a request, if one exists.
    pub fn entry_status(&self, request: &InvocationRequest) -> Option<BroadcastStatus> {
        let key = CacheKey::for_request(request);
        lock(&self.entries).get(&key).map(|entry| entry.status())
    }

    /// Find the entry for `key`, creating it if absent, and subscribe to it.
    ///
    /// Subscribing under the map lock means an entry is never joined after
    /// its eviction. Returns the entry, the subscription and whether this
    /// call created the entry.
    fn entry_for(&self, key: CacheKey) -> (Entry, ResultStream, bool) {
        let mut entries = lock(&self.entries);
        match entries.get(&key) {
            Some(existing) => (Arc::clone(existing), existing.subscribe(), false),
            None => {
                let entry: Entry = Arc::new(ReplayBroadcast::new());
                let subscription = entry.subscribe();
                entries.insert(key, Arc::clone(&entry));
                (entry, subscription, true)
            }
        }
    }

    /// Run the invocation on its own task, watched by a second task that
    /// fails and evicts the entry if the first one panics.
    fn spawn_pump(&self, key: CacheKey, entry: Entry, request: InvocationRequest) {
        let entries = Arc::clone(&self.entries);
        let operation = request.qualified_name();
        let pump = Pump {
            inner: Arc::clone(&self.inner),
            entries: Arc::clone(&entries),
            key,
            entry: Arc::clone(&entry),
            ceiling: self.evict_when_result_size_exceeds,
            operation: operation.clone(),
        };
        let handle = tokio::spawn(pump.run(request));

        tokio::spawn(async move {
            if let Err(err) = handle.await {
                log::error!("Invocation of {operation} aborted: {err}");
                evict(&entries, &key, &entry);
                entry.fail(Error::invocation(operation, "invocation aborted"));
            }
        });
    }
}

/// Moves one underlying result stream into its broadcast.
struct Pump {
    inner: Arc<dyn OperationInvoker>,
    entries: Entries,
    key: CacheKey,
    entry: Entry,
    ceiling: usize,
    operation: String,
}

impl Pump {
    async fn run(self, request: InvocationRequest) {
        let operation = &self.operation;
        let mut stream = match self.inner.invoke(request).await {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("Invocation of {operation} failed before streaming: {err}");
                evict(&self.entries, &self.key, &self.entry);
                self.entry.fail(err);
                return;
            }
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(value) => {
                    self.entry.publish(value);
                    if self.entry.is_recording() && self.entry.len() > self.ceiling {
                        log::info!(
                            "Evicting {operation} from the cache: more than {} results",
                            self.ceiling
                        );
                        evict(&self.entries, &self.key, &self.entry);
                        self.entry.stop_recording();
                    }
                }
                Err(err) => {
                    log::warn!("Invocation of {operation} failed: {err}");
                    evict(&self.entries, &self.key, &self.entry);
                    self.entry.fail(err);
                    return;
                }
            }
        }
        self.entry.complete();
    }
}

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remove `entry` under `key`, unless a newer entry has replaced it.
fn evict(entries: &Entries, key: &CacheKey, entry: &Entry) {
    let mut entries = lock(entries);
    if entries
        .get(key)
        .is_some_and(|current| Arc::ptr_eq(current, entry))
    {
        entries.remove(key);
    }
}

#[async_trait]
impl OperationInvoker for CachingOperationInvoker {
    async fn invoke(&self, request: InvocationRequest) -> Result<ResultStream> {
        if self.inner.caching_behaviour(&request.operation) == CachingBehaviour::NoCache {
            log::debug!("{} is not cacheable, calling through", request.qualified_name());
            return self.inner.invoke(request).await;
        }

        let key = CacheKey::for_request(&request);
        let (entry, subscription, created) = self.entry_for(key);
        if created {
            log::info!(
                "Cache miss for {} ({key}), invoking",
                CacheKey::describe(&request)
            );
            self.spawn_pump(key, entry, request);
        } else {
            log::debug!("Cache hit for {}", CacheKey::describe(&request));
        }
        Ok(subscription)
    }

    fn caching_behaviour(&self, operation: &strata_core::Operation) -> CachingBehaviour {
        self.inner.caching_behaviour(operation)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::stub::StubInvoker;
    use futures::stream;
    use std::task::Poll;
    use std::time::Duration;
    use strata_core::{Operation, Parameter, ParameterValue};
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    fn say_hello() -> Operation {
        let mut op = Operation::new("sayHello", "String").with_parameter(Parameter::named("input", "String"));
        op.service = "Service".into();
        op
    }

    fn say_many_things() -> Operation {
        let mut op = Operation::new("sayManyThings", "String[]");
        op.service = "Service".into();
        op
    }

    fn hello_request(input: &str) -> InvocationRequest {
        let op = say_hello();
        InvocationRequest::new(
            &op,
            vec![ParameterValue::new(
                op.parameters[0].clone(),
                TypedInstance::scalar("String", input),
            )],
            "queryId",
        )
    }

    fn many_request() -> InvocationRequest {
        InvocationRequest::new(&say_many_things(), Vec::new(), "queryId")
    }

    fn strings(values: &[&str]) -> Vec<Result<TypedInstance>> {
        values
            .iter()
            .map(|v| Ok(TypedInstance::scalar("String", *v)))
            .collect()
    }

    fn greeting_stub() -> StubInvoker {
        StubInvoker::new(|request| {
            let input = request.parameters[0].value.to_raw();
            let input = input.as_str().unwrap_or_default().to_string();
            if input == "error" {
                return Ok(stream::iter(vec![Err(Error::invocation("Service@@sayHello", "Kaboom"))]).boxed());
            }
            let greeting = format!("Hello {input}");
            Ok(stream::iter(strings(&[greeting.as_str()])).boxed())
        })
        .with_delay(Duration::from_millis(200))
        .prohibit_concurrent_access()
    }

    async fn collect(invoker: &CachingOperationInvoker, request: InvocationRequest) -> Vec<Result<TypedInstance>> {
        invoker.invoke(request).await.unwrap().collect().await
    }

    #[tokio::test]
    async fn test_returns_value_and_caches_it() {
        let stub = Arc::new(greeting_stub());
        let cache = CachingOperationInvoker::new(stub.clone());

        let first = collect(&cache, hello_request("A")).await;
        assert_eq!(first, strings(&["Hello A"]));

        let second = collect(&cache, hello_request("A")).await;
        assert_eq!(second, strings(&["Hello A"]));

        assert_eq!(stub.invocation_count(), 1);
        assert_eq!(cache.cache_size(), 1);
        assert_eq!(
            cache.entry_status(&hello_request("A")),
            Some(BroadcastStatus::Completed)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_key_invokes_once() {
        let stub = Arc::new(greeting_stub());
        let cache = Arc::new(CachingOperationInvoker::new(stub.clone()));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { collect(&cache, hello_request("A")).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), strings(&["Hello A"]));
        }
        assert_eq!(stub.invocation_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_twenty_five_calls_over_five_keys_invoke_five_times() {
        let stub = Arc::new(greeting_stub());
        let cache = Arc::new(CachingOperationInvoker::new(stub.clone()));

        let mut handles = Vec::new();
        for input in ["A", "B", "C", "D", "E"] {
            for _ in 0..5 {
                let cache = Arc::clone(&cache);
                handles.push(tokio::spawn(async move {
                    collect(&cache, hello_request(input)).await
                }));
            }
        }

        let mut results = Vec::new();
        for handle in handles {
            results.extend(handle.await.unwrap());
        }
        assert_eq!(results.len(), 25);
        for input in ["A", "B", "C", "D", "E"] {
            let expected = TypedInstance::scalar("String", format!("Hello {input}"));
            let count = results
                .iter()
                .filter(|r| r.as_ref().is_ok_and(|v| *v == expected))
                .count();
            assert_eq!(count, 5, "results for {input}");
        }
        assert_eq!(stub.invocation_count(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_errors_are_shared_by_concurrent_callers_then_evicted() {
        let stub = Arc::new(greeting_stub());
        let cache = Arc::new(CachingOperationInvoker::new(stub.clone()));

        let mut handles = Vec::new();
        for input in ["A", "B", "error", "D", "E"] {
            for _ in 0..5 {
                let cache = Arc::clone(&cache);
                handles.push(tokio::spawn(async move {
                    collect(&cache, hello_request(input)).await
                }));
            }
        }

        let mut results = Vec::new();
        for handle in handles {
            results.extend(handle.await.unwrap());
        }
        assert_eq!(results.len(), 25);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 5);
        assert_eq!(stub.invocation_count(), 5);
        assert_eq!(cache.cache_size(), 4);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let stub = Arc::new(greeting_stub());
        let cache = CachingOperationInvoker::new(stub.clone());

        let first = collect(&cache, hello_request("error")).await;
        assert!(matches!(&first[..], [Err(Error::Invocation { message, .. })] if message == "Kaboom"));
        assert_eq!(cache.cache_size(), 0);

        let second = collect(&cache, hello_request("error")).await;
        assert!(second[0].is_err());
        assert_eq!(stub.invocation_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_before_stream_is_broadcast() {
        let stub = Arc::new(StubInvoker::new(|_| {
            Err(Error::invocation("Service@@sayManyThings", "You shall not pass"))
        }));
        let cache = CachingOperationInvoker::new(stub.clone());

        let results = collect(&cache, many_request()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].as_ref().unwrap_err().to_string(),
            "Invocation of Service@@sayManyThings failed: You shall not pass"
        );
        assert_eq!(cache.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_oversized_results_are_evicted() {
        let stub = Arc::new(StubInvoker::new(|_| {
            Ok(stream::iter(strings(&["Hello", "World", "I'm", "Very", "Long"])).boxed())
        }));
        let cache = CachingOperationInvoker::new(stub.clone()).with_evict_when_result_size_exceeds(3);

        let first = collect(&cache, many_request()).await;
        assert_eq!(first.len(), 5);
        assert_eq!(first[0], Ok(TypedInstance::scalar("String", "Hello")));
        assert_eq!(cache.cache_size(), 0);

        let second = collect(&cache, many_request()).await;
        assert_eq!(second.len(), 5);
        assert_eq!(stub.invocation_count(), 2);
        assert_eq!(cache.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_open_stream_past_ceiling_is_evicted_while_running() {
        let (tx, rx) = mpsc::unbounded_channel::<Result<TypedInstance>>();
        let rx = Arc::new(std::sync::Mutex::new(Some(rx)));
        let stub = Arc::new(StubInvoker::new(move |_| {
            let open = rx.lock().unwrap().take();
            match open {
                Some(rx) => Ok(UnboundedReceiverStream::new(rx).boxed()),
                None => Ok(stream::iter(strings(&["fresh"])).boxed()),
            }
        }));
        let cache = CachingOperationInvoker::new(stub.clone()).with_evict_when_result_size_exceeds(3);

        let mut first = cache.invoke(many_request()).await.unwrap();
        for n in 0..1000 {
            tx.send(Ok(TypedInstance::scalar("Int", n))).unwrap();
        }
        for n in 0..1000 {
            assert_eq!(first.next().await, Some(Ok(TypedInstance::scalar("Int", n))));
        }
        assert_eq!(cache.cache_size(), 0);
        assert_eq!(cache.entry_status(&many_request()), None);

        // The first call is still open, yet a new caller gets its own invocation.
        let second = collect(&cache, many_request()).await;
        assert_eq!(second, strings(&["fresh"]));
        assert_eq!(stub.invocation_count(), 2);

        tx.send(Ok(TypedInstance::scalar("Int", 1000))).unwrap();
        drop(tx);
        assert_eq!(first.next().await, Some(Ok(TypedInstance::scalar("Int", 1000))));
        assert_eq!(first.next().await, None);
    }

    #[tokio::test]
    async fn test_panicking_invoker_fails_callers_and_is_evicted() {
        let stub = Arc::new(StubInvoker::new(|_| unreachable!("invoker bug")));
        let cache = CachingOperationInvoker::new(stub.clone());

        let results = collect(&cache, many_request()).await;
        assert!(matches!(
            &results[..],
            [Err(Error::Invocation { message, .. })] if message == "invocation aborted"
        ));
        assert_eq!(cache.cache_size(), 0);

        collect(&cache, many_request()).await;
        assert_eq!(stub.invocation_count(), 2);
    }

    #[tokio::test]
    async fn test_panicking_stream_fails_callers_after_delivered_items() {
        let stub = Arc::new(StubInvoker::new(|_| {
            let broken = stream::poll_fn(|_| -> Poll<Option<Result<TypedInstance>>> {
                unreachable!("stream bug")
            });
            Ok(stream::iter(strings(&["partial"])).chain(broken).boxed())
        }));
        let cache = CachingOperationInvoker::new(stub.clone());

        let results = collect(&cache, many_request()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], Ok(TypedInstance::scalar("String", "partial")));
        assert!(results[1].is_err());
        assert_eq!(cache.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_streams_results_without_waiting_for_completion() {
        let (tx, rx) = mpsc::unbounded_channel::<Result<TypedInstance>>();
        let rx = Arc::new(std::sync::Mutex::new(Some(rx)));
        let stub = Arc::new(StubInvoker::new(move |_| {
            let rx = rx.lock().unwrap().take().unwrap();
            Ok(UnboundedReceiverStream::new(rx).boxed())
        }));
        let cache = CachingOperationInvoker::new(stub.clone());

        let mut first = cache.invoke(many_request()).await.unwrap();
        tx.send(Ok(TypedInstance::scalar("String", "Hello"))).unwrap();
        assert_eq!(first.next().await, Some(Ok(TypedInstance::scalar("String", "Hello"))));
        tx.send(Ok(TypedInstance::scalar("String", "World"))).unwrap();
        assert_eq!(first.next().await, Some(Ok(TypedInstance::scalar("String", "World"))));
        drop(first);

        // The underlying call is still open; a new caller replays what it missed.
        let mut second = cache.invoke(many_request()).await.unwrap();
        assert_eq!(second.next().await, Some(Ok(TypedInstance::scalar("String", "Hello"))));
        assert_eq!(second.next().await, Some(Ok(TypedInstance::scalar("String", "World"))));

        tx.send(Ok(TypedInstance::scalar("String", "Again"))).unwrap();
        drop(tx);
        assert_eq!(second.next().await, Some(Ok(TypedInstance::scalar("String", "Again"))));
        assert_eq!(second.next().await, None);
        assert_eq!(stub.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_after_two_items_sees_all() {
        let (tx, rx) = mpsc::unbounded_channel::<Result<TypedInstance>>();
        let rx = Arc::new(std::sync::Mutex::new(Some(rx)));
        let stub = Arc::new(StubInvoker::new(move |_| {
            let rx = rx.lock().unwrap().take().unwrap();
            Ok(UnboundedReceiverStream::new(rx).boxed())
        }));
        let cache = CachingOperationInvoker::new(stub.clone());

        let mut early = cache.invoke(many_request()).await.unwrap();
        for word in ["one", "two"] {
            tx.send(Ok(TypedInstance::scalar("String", word))).unwrap();
            early.next().await.unwrap().unwrap();
        }

        let late = cache.invoke(many_request()).await.unwrap();
        for word in ["three", "four"] {
            tx.send(Ok(TypedInstance::scalar("String", word))).unwrap();
        }
        drop(tx);

        let seen: Vec<_> = late.map(|r| r.unwrap().to_raw()).collect().await;
        assert_eq!(seen, vec!["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn test_no_cache_operations_call_through() {
        let stub = Arc::new(greeting_stub().with_caching_behaviour(CachingBehaviour::NoCache));
        let cache = CachingOperationInvoker::new(stub.clone());

        collect(&cache, hello_request("A")).await;
        collect(&cache, hello_request("A")).await;
        assert_eq!(stub.invocation_count(), 2);
        assert_eq!(cache.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_decorate_respects_config() {
        let stub: Arc<dyn OperationInvoker> = Arc::new(greeting_stub());
        let disabled = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let passthrough = CachingOperationInvoker::decorate(Arc::clone(&stub), &disabled);
        assert!(Arc::ptr_eq(&passthrough, &stub));

        let cached = CachingOperationInvoker::decorate(Arc::clone(&stub), &CacheConfig::default());
        assert!(!Arc::ptr_eq(&cached, &stub));
    }
}
