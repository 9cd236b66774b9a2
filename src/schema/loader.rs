//! Schema catalog loaded from disk at startup
//!
//! The catalog file is a single JSON document:
//!
//! ```json
//! { "entities": [ { "name": "products", "columns": [...], "relations": [...] } ] }
//! ```
//!
//! It is read once, validated, and then shared read-only.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::errors::{SchemaError, SchemaResult};
use super::types::EntitySchema;
use super::SchemaInfo;

#[derive(Debug, Deserialize)]
struct CatalogFile {
    entities: Vec<EntitySchema>,
}

/// In-memory registry of entity schemas
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and validates a catalog file.
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_json_str(&content, &path.display().to_string())
    }

    /// Parses a catalog from JSON text. `origin` names the source in errors.
    pub fn from_json_str(content: &str, origin: &str) -> SchemaResult<Self> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(origin, format!("Invalid JSON: {}", e)))?;

        let mut catalog = Self::new();
        for entity in file.entities {
            entity
                .validate_structure()
                .map_err(|e| SchemaError::malformed(origin, e))?;
            catalog.register(entity)?;
        }
        catalog.verify_relations()?;

        Ok(catalog)
    }

    /// Registers an entity directly (for tests or programmatic setup).
    pub fn register(&mut self, entity: EntitySchema) -> SchemaResult<()> {
        if self.entities.contains_key(&entity.name) {
            return Err(SchemaError::DuplicateEntity(entity.name));
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Builder-style registration. A duplicate name keeps the first definition.
    pub fn with_entity(mut self, entity: EntitySchema) -> Self {
        self.entities.entry(entity.name.clone()).or_insert(entity);
        self
    }

    /// Every relation must target a declared entity.
    pub fn verify_relations(&self) -> SchemaResult<()> {
        for entity in self.entities.values() {
            for relation in &entity.relations {
                if !self.entities.contains_key(&relation.target) {
                    return Err(SchemaError::DanglingRelation {
                        entity: entity.name.clone(),
                        relation: relation.name.clone(),
                        target: relation.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity names, sorted
    pub fn entity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl SchemaInfo for SchemaCatalog {
    fn entity(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.get(name)
    }
}
