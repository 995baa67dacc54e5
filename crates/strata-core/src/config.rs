//! Engine tunables.
//!
//! [`EngineConfig`] is plain serde data so front ends can embed it in their
//! own configuration files; every field has a default.

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration structs
// ============================================================================

/// Tunables for a query engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Operation invocation cache.
    pub cache: CacheConfig,

    /// Discovery search.
    pub search: SearchConfig,

    /// Per-query context.
    pub context: ContextConfig,

    /// Query profiling.
    pub profiler: ProfilerConfig,
}

/// Operation invocation cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether invocations are deduplicated at all.
    pub enabled: bool,

    /// Results with more items than this are evicted, even mid-stream.
    pub evict_when_result_size_exceeds: usize,
}

/// Discovery search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum edge evaluations for a single search from one fact.
    pub max_evaluations: usize,
}

/// Query context configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Evaluated edges kept for diagnostics; the oldest are dropped first.
    pub max_evaluated_edges: usize,
}

/// Query profiling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Whether timings are reported in query results.
    pub enabled: bool,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            evict_when_result_size_exceeds: 10,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 250,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_evaluated_edges: 1_000,
        }
    }
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ============================================================================
// Tests
// ============================================================================
