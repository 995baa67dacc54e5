//! Query strategies.
//!
//! A strategy tries to resolve some of the requested targets from what the
//! context already knows, or can learn. The engine runs the strategies in a
//! fixed order, cheapest first, and hands each one only the targets still
//! unresolved.
//!
//! | Strategy | Resolves |
//! |----------|----------|
//! | [`DirectFactStrategy`] | targets already held as facts |
//! | [`CalculatedFieldStrategy`] | targets derivable by a formula on a held fact |
//! | [`SearchDiscoveryStrategy`] | targets reachable through the schema graph |
//! | [`GatherStrategy`] | `gather` targets, from every operation that returns them |

mod calculated;
mod direct;
mod discovery;
mod gather;

pub use calculated::CalculatedFieldStrategy;
pub use direct::DirectFactStrategy;
pub use discovery::SearchDiscoveryStrategy;
pub use gather::GatherStrategy;

use crate::context::QueryContext;
use crate::error::{QueryError, SearchFailure};
use crate::evaluators::EdgeEvaluators;
use crate::target::{QueryMode, QuerySpecTypeNode};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::TypedInstance;
use strata_core::config::SearchConfig;

/// What one strategy pass produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyResult {
    /// Targets resolved by this pass.
    pub matched: BTreeMap<QuerySpecTypeNode, Arc<TypedInstance>>,
    /// Facts learned along the way that were not themselves requested.
    pub additional_facts: Vec<Arc<TypedInstance>>,
    /// Set when a search reached none of its targets. The engine raises it
    /// only if the query as a whole resolved nothing.
    pub failure: Option<SearchFailure>,
}

impl StrategyResult {
    /// Nothing resolved, nothing learned.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the pass produced anything at all.
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty() && self.additional_facts.is_empty() && self.failure.is_none()
    }
}

/// One way of resolving targets.
#[async_trait]
pub trait QueryStrategy: Send + Sync {
    /// Name used in logs and profiles.
    fn name(&self) -> &'static str;

    /// Try to resolve `targets`.
    ///
    /// Targets a strategy does not handle or cannot reach are left out of
    /// the result. An unreachable search is reported through
    /// [`StrategyResult::failure`], not as an error.
    async fn invoke(
        &self,
        targets: &[QuerySpecTypeNode],
        context: &mut QueryContext,
    ) -> Result<StrategyResult, QueryError>;
}

/// The standard strategy chain in the order the engine runs it.
pub fn default_strategies(
    evaluators: Arc<EdgeEvaluators>,
    search: &SearchConfig,
) -> Vec<Arc<dyn QueryStrategy>> {
    let discovery = SearchDiscoveryStrategy::new(Arc::clone(&evaluators), search);
    vec![
        Arc::new(DirectFactStrategy),
        Arc::new(CalculatedFieldStrategy),
        Arc::new(discovery.clone()),
        Arc::new(GatherStrategy::new(evaluators, discovery)),
    ]
}

/// Targets handled in `mode`.
fn targets_in_mode(targets: &[QuerySpecTypeNode], mode: QueryMode) -> Vec<&QuerySpecTypeNode> {
    targets.iter().filter(|target| target.mode == mode).collect()
}
