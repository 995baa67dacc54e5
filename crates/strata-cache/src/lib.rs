//! Operation invocation cache for Strata.
//!
//! Wraps an [`OperationInvoker`](strata_core::OperationInvoker) so that
//! logically identical calls share one underlying invocation and one
//! replayable result stream.
//!
//! # Modules
//!
//! - [`key`]: request digests
//! - [`broadcast`]: the replayable multi-subscriber stream
//! - [`decorator`]: [`CachingOperationInvoker`]
//! - [`stub`]: closure-driven and canned-response invokers

#![doc = include_str!("../README.md")]

pub mod broadcast;
pub mod decorator;
pub mod key;
pub mod stub;

pub use broadcast::{BroadcastStatus, ReplayBroadcast};
pub use decorator::CachingOperationInvoker;
pub use key::CacheKey;
pub use stub::{StubInvoker, StubResponse, StubResponses};
