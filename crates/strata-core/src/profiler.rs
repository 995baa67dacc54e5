//! Hierarchical timing of query work.
//!
//! A [`QueryProfiler`] records a tree of operations rooted at a synthetic
//! `Root` node. Child operations are started against whichever operation is
//! currently open (a stack), and stopping an operation closes it and any of
//! its still-open descendants.
//!
//! [`QueryProfiler::timings`] attributes time to [`OperationType`]s using
//! self time: the time spent in children is subtracted from the parent so
//! nothing is counted twice.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

// ============================================================================
// Clocks
// ============================================================================

/// Millisecond time source.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start` milliseconds.
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Types
// ============================================================================

/// Category of profiled work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// The whole query.
    Root,
    /// Building or expanding the search graph.
    GraphBuilding,
    /// Walking the search graph.
    GraphTraversal,
    /// Looking up facts.
    Lookup,
    /// Evaluating policies or constraints.
    PolicyEvaluation,
    /// Waiting on a remote operation.
    RemoteCall,
}

impl OperationType {
    /// Whether time of this type is the engine's own overhead, as opposed to
    /// work that would have happened anyway.
    pub fn is_internal(self) -> bool {
        !matches!(self, Self::Root | Self::RemoteCall)
    }
}

/// Handle to a profiled operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperationId(usize);

/// A remote call made while profiling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteCall {
    /// `Service@@operation` that was called.
    pub operation: String,
    /// Number of results received.
    pub result_count: usize,
    /// Whether the call failed.
    pub failed: bool,
    /// Call duration in milliseconds.
    pub duration_ms: i64,
}

#[derive(Debug)]
struct Node {
    component: String,
    name: String,
    kind: OperationType,
    children: Vec<usize>,
    started: i64,
    stopped: Option<i64>,
    context: BTreeMap<String, String>,
    remote_calls: Vec<RemoteCall>,
}

/// Read-only view of one recorded operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfiledOperation {
    /// Component that did the work.
    pub component: String,
    /// Name of the work.
    pub name: String,
    /// Category.
    pub kind: OperationType,
    /// Total duration including children.
    pub duration_ms: i64,
    /// Whether the operation has been stopped.
    pub stopped: bool,
    /// Free-form annotations.
    pub context: BTreeMap<String, String>,
    /// Remote calls attributed to this operation.
    pub remote_calls: Vec<RemoteCall>,
    /// Child operations in start order.
    pub children: Vec<ProfiledOperation>,
}

// ============================================================================
// Profiler
// ============================================================================

/// Records a timing tree for one query.
pub struct QueryProfiler {
    clock: Arc<dyn Clock>,
    nodes: Vec<Node>,
    stack: Vec<usize>,
}

impl std::fmt::Debug for QueryProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryProfiler")
            .field("operations", &self.nodes.len())
            .field("open", &self.stack.len())
            .finish()
    }
}

impl Default for QueryProfiler {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl QueryProfiler {
    /// Create a profiler whose root starts now.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started = clock.now_millis();
        Self {
            clock,
            nodes: vec![Node {
                component: "QueryProfiler".to_string(),
                name: "Root".to_string(),
                kind: OperationType::Root,
                children: Vec::new(),
                started,
                stopped: None,
                context: BTreeMap::new(),
                remote_calls: Vec::new(),
            }],
            stack: vec![0],
        }
    }

    /// The root operation.
    pub fn root(&self) -> OperationId {
        OperationId(0)
    }

    /// Start an operation beneath the currently open one.
    pub fn start_child(
        &mut self,
        component: impl Into<String>,
        name: impl Into<String>,
        kind: OperationType,
    ) -> OperationId {
        let parent = self.stack.last().copied().unwrap_or(0);
        let idx = self.nodes.len();
        self.nodes.push(Node {
            component: component.into(),
            name: name.into(),
            kind,
            children: Vec::new(),
            started: self.clock.now_millis(),
            stopped: None,
            context: BTreeMap::new(),
            remote_calls: Vec::new(),
        });
        self.nodes[parent].children.push(idx);
        self.stack.push(idx);
        idx_to_id(idx)
    }

    /// Stop an operation and any of its descendants still open.
    pub fn stop(&mut self, id: OperationId) {
        let now = self.clock.now_millis();
        let Some(node) = self.nodes.get_mut(id.0) else {
            log::error!("Attempted to stop unknown profiler operation {}", id.0);
            return;
        };
        if node.stopped.is_some() {
            log::error!(
                "Attempted to stop operation {}.{} which is already stopped",
                node.component,
                node.name
            );
            return;
        }
        node.stopped = Some(now);

        if let Some(pos) = self.stack.iter().position(|&i| i == id.0) {
            for open in self.stack.split_off(pos).into_iter().skip(1) {
                if let Some(child) = self.nodes.get_mut(open) {
                    child.stopped.get_or_insert(now);
                }
            }
        }
    }

    /// Time `f` as a child operation.
    ///
    /// The operation is stopped whether `f` returns or panics; a panic is
    /// re-raised after recording.
    pub fn time<T>(
        &mut self,
        component: impl Into<String>,
        name: impl Into<String>,
        kind: OperationType,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let id = self.start_child(component, name, kind);
        let outcome = catch_unwind(AssertUnwindSafe(|| f(&mut *self)));
        self.stop(id);
        match outcome {
            Ok(value) => value,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Annotate an operation.
    pub fn add_context(&mut self, id: OperationId, key: impl Into<String>, value: impl Into<String>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.context.insert(key.into(), value.into());
        }
    }

    /// Attribute a remote call to an operation.
    pub fn add_remote_call(&mut self, id: OperationId, call: RemoteCall) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.remote_calls.push(call);
        }
    }

    /// Stop the root, closing everything still open.
    pub fn finish(&mut self) {
        if self.nodes[0].stopped.is_none() {
            self.stop(self.root());
        }
    }

    /// Duration of an operation; running operations measure up to now.
    pub fn duration(&self, id: OperationId) -> i64 {
        self.nodes
            .get(id.0)
            .map(|node| node.stopped.unwrap_or_else(|| self.clock.now_millis()) - node.started)
            .unwrap_or(0)
    }

    /// Duration of the whole query so far.
    pub fn total_duration(&self) -> i64 {
        self.duration(self.root())
    }

    /// Self time grouped by operation type.
    pub fn timings(&self) -> BTreeMap<OperationType, i64> {
        let mut out = BTreeMap::new();
        self.collect_timings(0, &mut out);
        out
    }

    fn collect_timings(&self, idx: usize, out: &mut BTreeMap<OperationType, i64>) {
        let node = &self.nodes[idx];
        let children: i64 = node
            .children
            .iter()
            .map(|&child| self.duration(idx_to_id(child)))
            .sum();
        *out.entry(node.kind).or_insert(0) += self.duration(idx_to_id(idx)) - children;
        for &child in &node.children {
            self.collect_timings(child, out);
        }
    }

    /// Time spent on the engine's own work rather than remote calls.
    pub fn internal_cost(&self) -> i64 {
        self.timings()
            .into_iter()
            .filter(|(kind, _)| kind.is_internal())
            .map(|(_, ms)| ms)
            .sum()
    }

    /// All remote calls recorded anywhere in the tree.
    pub fn remote_calls(&self) -> Vec<RemoteCall> {
        self.nodes
            .iter()
            .flat_map(|node| node.remote_calls.iter().cloned())
            .collect()
    }

    /// Snapshot of an operation and its subtree.
    pub fn operation(&self, id: OperationId) -> Option<ProfiledOperation> {
        let node = self.nodes.get(id.0)?;
        Some(ProfiledOperation {
            component: node.component.clone(),
            name: node.name.clone(),
            kind: node.kind,
            duration_ms: self.duration(id),
            stopped: node.stopped.is_some(),
            context: node.context.clone(),
            remote_calls: node.remote_calls.clone(),
            children: node
                .children
                .iter()
                .filter_map(|&child| self.operation(idx_to_id(child)))
                .collect(),
        })
    }
}

fn idx_to_id(idx: usize) -> OperationId {
    OperationId(idx)
}

// ============================================================================
// Tests
// ============================================================================
