//! Core traits for Strata domain abstraction.
//!
//! [`SchemaProvider`] is the read-only seam through which the engine obtains
//! the schema snapshot for a query. Hot-reloading and registry integration
//! live behind implementations of this trait; a query holds on to the
//! snapshot it started with.

use crate::schema::Schema;
use std::sync::Arc;

/// Source of the current schema snapshot.
pub trait SchemaProvider: Send + Sync {
    /// The schema to use for the next query.
    fn schema(&self) -> Arc<Schema>;
}

/// A provider that always returns the same schema.
#[derive(Clone, Debug)]
pub struct StaticSchemaProvider {
    schema: Arc<Schema>,
}

impl StaticSchemaProvider {
    /// Wrap a schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    /// Share an already wrapped schema.
    pub fn from_shared(schema: Arc<Schema>) -> Self {
        Self { schema }
    }
}

impl SchemaProvider for StaticSchemaProvider {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }
}
