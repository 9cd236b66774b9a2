//! Schema type definitions
//!
//! Column semantic types decide which columns free-text search may touch.
//! Relation definitions tell the storage layer how to eager load.

use serde::{Deserialize, Serialize};

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Short string (VARCHAR)
    String,
    /// Long text (TEXT)
    Text,
    /// 64-bit signed integer
    Integer,
    /// 64-bit floating point
    Float,
    /// Fixed-point number
    Decimal,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Date with time
    DateTime,
    /// UUID stored as string
    Uuid,
    /// Arbitrary JSON
    Json,
}

impl SemanticType {
    /// String and text columns are eligible for free-text search
    pub fn is_textual(&self) -> bool {
        matches!(self, SemanticType::String | SemanticType::Text)
    }

    /// Integer, float and decimal columns take numeric filter operands
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer | SemanticType::Float | SemanticType::Decimal
        )
    }
}

/// A single column of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
}

impl Column {
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
        }
    }
}

/// How a relation links two entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// `local_key` on this entity references `foreign_key` on the target (one row)
    BelongsTo,
    /// `foreign_key` on the target references `local_key` on this entity (many rows)
    HasMany,
}

/// A named relation that can be eager loaded with `include`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub local_key: String,
    pub foreign_key: String,
}

/// Column listing and relations of one entity (table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

impl EntitySchema {
    /// Creates an entity with no relations
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            relations: Vec::new(),
        }
    }

    /// Adds a relation definition
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Names of string/text columns, in declaration order
    pub fn textual_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.semantic_type.is_textual())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Validates structural correctness (non-empty names, no duplicate columns)
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("entity name must not be empty".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(format!("entity '{}' has a column with an empty name", self.name));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(format!(
                    "entity '{}' declares column '{}' twice",
                    self.name, column.name
                ));
            }
        }

        for relation in &self.relations {
            if relation.name.trim().is_empty() || relation.target.trim().is_empty() {
                return Err(format!(
                    "entity '{}' has a relation with an empty name or target",
                    self.name
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products() -> EntitySchema {
        EntitySchema::new(
            "products",
            vec![
                Column::new("id", SemanticType::Integer),
                Column::new("name", SemanticType::String),
                Column::new("description", SemanticType::Text),
                Column::new("price", SemanticType::Decimal),
            ],
        )
    }

    #[test]
    fn test_textual_columns_keep_declaration_order() {
        assert_eq!(products().textual_columns(), vec!["name", "description"]);
    }

    #[test]
    fn test_semantic_type_deserialization() {
        let column: Column = serde_json::from_str(r#"{"name": "created_at", "type": "datetime"}"#).unwrap();
        assert_eq!(column.semantic_type, SemanticType::DateTime);
        assert!(!column.semantic_type.is_textual());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut schema = products();
        schema.columns.push(Column::new("price", SemanticType::Float));
        assert!(schema.validate_structure().is_err());
    }

    #[test]
    fn test_relation_deserialization() {
        let relation: RelationDef = serde_json::from_str(
            r#"{"name": "category", "target": "categories", "kind": "belongs_to",
                "local_key": "category_id", "foreign_key": "id"}"#,
        )
        .unwrap();
        assert_eq!(relation.kind, RelationKind::BelongsTo);
    }
}
