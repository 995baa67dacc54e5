//! Reading schema, fact and response files.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use strata_cache::StubResponses;
use strata_core::{Error, Result, Schema, TypedInstance};

/// One entry of a facts file.
#[derive(Debug, Deserialize)]
struct FactEntry {
    #[serde(rename = "type")]
    type_name: String,
    value: serde_json::Value,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))
}

/// Load a JSON schema definition.
pub fn load_schema(path: &Path) -> Result<Schema> {
    let schema = Schema::from_json(&read(path)?)?;
    log::debug!("Loaded schema from {}", path.display());
    Ok(schema)
}

/// Load facts, typing each value against `schema`.
pub fn load_facts(schema: &Schema, path: &Path) -> Result<Vec<TypedInstance>> {
    let entries: Vec<FactEntry> = serde_json::from_str(&read(path)?)
        .map_err(|e| Error::invalid_data(format!("{}: {e}", path.display())))?;
    entries
        .into_iter()
        .map(|entry| TypedInstance::from_json(schema, &entry.type_name.into(), &entry.value))
        .collect()
}

/// Load canned responses, or none at all when `path` is absent.
pub fn load_responses(schema: Arc<Schema>, path: Option<&Path>) -> Result<StubResponses> {
    match path {
        Some(path) => {
            let responses = StubResponses::from_json(schema, &read(path)?)?;
            log::debug!(
                "Loaded {} canned responses from {}",
                responses.len(),
                path.display()
            );
            Ok(responses)
        }
        None => {
            log::warn!("No responses file given; every operation call will fail");
            Ok(StubResponses::new(schema))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
