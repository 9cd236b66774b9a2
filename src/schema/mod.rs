//! Schema introspection
//!
//! The query translator consumes schema information through the
//! [`SchemaInfo`] capability only. The catalog is loaded once at startup
//! and is safe to share across requests without synchronization.

mod errors;
mod loader;
mod types;

pub use errors::{SchemaError, SchemaResult};
pub use loader::SchemaCatalog;
pub use types::{Column, EntitySchema, RelationDef, RelationKind, SemanticType};

/// Read-only schema introspection
pub trait SchemaInfo: Send + Sync {
    /// Looks up an entity by name
    fn entity(&self, name: &str) -> Option<&EntitySchema>;

    /// Column listing of an entity with semantic types
    fn columns(&self, entity: &str) -> Option<&[Column]> {
        self.entity(entity).map(|e| e.columns.as_slice())
    }
}
