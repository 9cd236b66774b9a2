//! In-memory plan executor
//!
//! Holds JSON rows per entity and runs plans against them.
//!
//! # Execution Flow (strict order)
//!
//! 1. Resolve every include path (fail before reading data)
//! 2. Filter rows by WHERE clauses and OR groups
//! 3. Compute distance columns
//! 4. Filter by HAVING clauses
//! 5. Collapse to one row when the plan aggregates
//! 6. Sort
//! 7. Count the total, then cut the requested page
//! 8. Eager load relations on the page rows
//! 9. Project the selected columns

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Number, Value};

use crate::query::{ComputedExpr, GeoPoint, Page, PageRequest, QueryPlan};
use crate::schema::{RelationKind, SchemaInfo};

use super::aggregate::collapse;
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::{as_number, compare_scalars, ConditionFilter};
use super::sorter::ResultSorter;
use super::PlanExecutor;

type Tables = HashMap<String, Vec<Value>>;

pub struct InMemoryStore {
    schema: Arc<dyn SchemaInfo>,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store for the given schema
    pub fn new(schema: Arc<dyn SchemaInfo>) -> Self {
        Self {
            schema,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Loads seed rows from a JSON file shaped `{"entity": [rows...]}`
    pub fn load(path: &Path, schema: Arc<dyn SchemaInfo>) -> ExecutorResult<Self> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path)
            .map_err(|e| ExecutorError::data_load(&origin, e.to_string()))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| ExecutorError::data_load(&origin, format!("Invalid JSON: {}", e)))?;
        Self::from_json(&value, &origin, schema)
    }

    pub fn from_json(value: &Value, origin: &str, schema: Arc<dyn SchemaInfo>) -> ExecutorResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ExecutorError::data_load(origin, "expected an object keyed by entity"))?;

        let store = Self::new(schema);
        for (entity, rows) in object {
            let rows = rows.as_array().ok_or_else(|| {
                ExecutorError::data_load(origin, format!("'{}' must be an array of rows", entity))
            })?;
            store
                .insert_rows(entity, rows.clone())
                .map_err(|e| ExecutorError::data_load(origin, e.to_string()))?;
        }
        Ok(store)
    }

    /// Appends rows to an entity's table. Rows must be JSON objects.
    pub fn insert_rows(&self, entity: &str, rows: Vec<Value>) -> ExecutorResult<()> {
        if self.schema.entity(entity).is_none() {
            return Err(ExecutorError::UnknownEntity(entity.to_string()));
        }
        if let Some(position) = rows.iter().position(|r| !r.is_object()) {
            return Err(ExecutorError::internal(format!(
                "row {} of '{}' is not an object",
                position, entity
            )));
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|_| ExecutorError::internal("store lock poisoned"))?;
        tables.entry(entity.to_string()).or_default().extend(rows);
        Ok(())
    }

    pub fn row_count(&self, entity: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(entity).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Checks that every segment of a dotted include path is a defined relation
    fn resolve_path(&self, entity: &str, path: &str) -> ExecutorResult<()> {
        let mut current = entity.to_string();
        for segment in path.split('.') {
            let schema = self
                .schema
                .entity(&current)
                .ok_or_else(|| ExecutorError::UnknownEntity(current.clone()))?;
            let relation = schema.relation(segment).ok_or_else(|| ExecutorError::UnknownRelation {
                entity: current.clone(),
                relation: segment.to_string(),
            })?;
            current = relation.target.clone();
        }
        Ok(())
    }

    fn eager_load(
        &self,
        tables: &Tables,
        entity: &str,
        rows: &mut [Value],
        path: &[&str],
    ) -> ExecutorResult<()> {
        let Some((name, rest)) = path.split_first() else {
            return Ok(());
        };
        let relation = self
            .schema
            .entity(entity)
            .and_then(|e| e.relation(name))
            .ok_or_else(|| ExecutorError::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })?;
        let targets = tables.get(&relation.target).map(Vec::as_slice).unwrap_or(&[]);

        for row in rows.iter_mut() {
            let Some(object) = row.as_object_mut() else {
                continue;
            };

            // a shared prefix (`a.b`, `a.c`) is loaded once
            let loaded = matches!(object.get(*name), Some(Value::Object(_) | Value::Array(_)));
            if !loaded {
                let key = object.get(&relation.local_key).cloned().unwrap_or(Value::Null);
                let linked = |target: &&Value| keys_equal(target.get(&relation.foreign_key), &key);
                let related = match relation.kind {
                    RelationKind::BelongsTo => {
                        targets.iter().find(linked).cloned().unwrap_or(Value::Null)
                    }
                    RelationKind::HasMany => {
                        Value::Array(targets.iter().filter(linked).cloned().collect())
                    }
                };
                object.insert(name.to_string(), related);
            }

            if !rest.is_empty() {
                match object.get_mut(*name) {
                    Some(Value::Array(children)) => {
                        self.eager_load(tables, &relation.target, children, rest)?
                    }
                    Some(child @ Value::Object(_)) => self.eager_load(
                        tables,
                        &relation.target,
                        std::slice::from_mut(child),
                        rest,
                    )?,
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

impl PlanExecutor for InMemoryStore {
    fn execute(&self, plan: &QueryPlan, page: &PageRequest) -> ExecutorResult<Page<Value>> {
        if self.schema.entity(&plan.entity).is_none() {
            return Err(ExecutorError::UnknownEntity(plan.entity.clone()));
        }
        for path in &plan.eager_load {
            self.resolve_path(&plan.entity, path)?;
        }

        let tables = self
            .tables
            .read()
            .map_err(|_| ExecutorError::internal("store lock poisoned"))?;
        let source = tables.get(&plan.entity).map(Vec::as_slice).unwrap_or(&[]);

        let mut rows: Vec<Value> = source
            .iter()
            .filter(|row| ConditionFilter::matches_where(row, plan))
            .cloned()
            .collect();

        add_distances(&mut rows, plan);
        rows.retain(|row| ConditionFilter::matches_having(row, plan));

        if plan.has_aggregates() {
            rows = vec![collapse(&rows, plan)];
        }

        ResultSorter::sort(&mut rows, &plan.order_by);

        let total = rows.len();
        let mut page_rows: Vec<Value> = rows
            .into_iter()
            .skip(page.offset())
            .take(page.limit())
            .collect();

        for path in &plan.eager_load {
            let segments: Vec<&str> = path.split('.').collect();
            self.eager_load(&tables, &plan.entity, &mut page_rows, &segments)?;
        }

        let data = page_rows.into_iter().map(|row| project(row, plan)).collect();
        Ok(Page::new(data, page, total))
    }
}

fn add_distances(rows: &mut [Value], plan: &QueryPlan) {
    for computed in &plan.extra_selects {
        let ComputedExpr::Distance {
            origin,
            lat_column,
            lng_column,
        } = &computed.expr
        else {
            continue;
        };

        for row in rows.iter_mut() {
            let point = match (
                row.get(lat_column).and_then(as_number),
                row.get(lng_column).and_then(as_number),
            ) {
                (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
                _ => None,
            };
            let distance = point
                .and_then(|p| Number::from_f64(origin.distance_km(&p)))
                .map(Value::Number)
                .unwrap_or(Value::Null);

            if let Some(object) = row.as_object_mut() {
                object.insert(computed.alias.clone(), distance);
            }
        }
    }
}

fn keys_equal(a: Option<&Value>, b: &Value) -> bool {
    match a {
        Some(a) if !a.is_null() && !b.is_null() => {
            compare_scalars(a, b) == Some(std::cmp::Ordering::Equal)
        }
        _ => false,
    }
}

/// Keeps selected columns, computed columns and loaded relations
fn project(row: Value, plan: &QueryPlan) -> Value {
    let Some(columns) = &plan.selected_columns else {
        return row;
    };
    let Value::Object(mut object) = row else {
        return row;
    };

    let mut projected = Map::new();
    for column in columns {
        projected.insert(column.clone(), object.remove(column).unwrap_or(Value::Null));
    }
    for computed in &plan.extra_selects {
        if let Some(value) = object.remove(&computed.alias) {
            projected.insert(computed.alias.clone(), value);
        }
    }
    for path in &plan.eager_load {
        let name = path.split('.').next().unwrap_or(path);
        if let Some(value) = object.remove(name) {
            projected.insert(name.to_string(), value);
        }
    }
    Value::Object(projected)
}
