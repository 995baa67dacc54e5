//! Handler for `strata find`.
//!
//! Loads the schema and facts, wires an engine whose operations are answered
//! from canned responses, and prints the query result as JSON. A failed
//! search prints the edges it evaluated before returning the error.

use crate::config::StrataConfig;
use crate::inputs::{load_facts, load_responses, load_schema};
use std::path::PathBuf;
use std::sync::Arc;
use strata_core::StaticSchemaProvider;
use strata_query::{QueryEngineFactory, QueryError, QueryResultSummary};

// ============================================================================
// Option types
// ============================================================================

/// Options for `strata find`.
#[derive(Debug, Clone)]
pub struct FindOptions {
    /// Schema file, if not taken from config.
    pub schema: Option<PathBuf>,
    /// Facts file; no facts when absent.
    pub facts: Option<PathBuf>,
    /// Responses file, if not taken from config.
    pub responses: Option<PathBuf>,
    /// The query expression.
    pub query: String,
    /// Print on one line.
    pub compact: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Answer the query and print the result.
pub async fn handle_find(config: &StrataConfig, options: FindOptions) -> anyhow::Result<()> {
    let summary = run_find(config, &options).await?;
    let output = if options.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };
    println!("{output}");
    Ok(())
}

/// Answer the query described by `options`.
pub async fn run_find(
    config: &StrataConfig,
    options: &FindOptions,
) -> anyhow::Result<QueryResultSummary> {
    let schema_path = config.schema_path(options.schema.clone())?;
    let schema = Arc::new(load_schema(&schema_path)?);
    let facts = match &options.facts {
        Some(path) => load_facts(&schema, path)?,
        None => Vec::new(),
    };
    let responses_path = config.responses_path(options.responses.clone());
    let responses = load_responses(Arc::clone(&schema), responses_path.as_deref())?;
    let invoker = Arc::new(responses.into_invoker());

    let provider = Arc::new(StaticSchemaProvider::from_shared(schema));
    let engine = QueryEngineFactory::new(config.engine.clone()).build(provider, invoker);
    tracing::debug!(strategies = ?engine.strategy_names(), "Engine ready");

    match engine.find_query(&options.query, facts).await {
        Ok(result) => Ok(result.summary()),
        Err(err @ QueryError::SearchFailed(_)) => {
            eprintln!("Evaluated path:");
            for edge in err.evaluated_path() {
                eprintln!("  {edge}");
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
