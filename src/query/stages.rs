//! Plan stages
//!
//! Each stage reads one slice of the [`ParameterSet`] and mutates the plan.
//! Stages never look at each other's output except through the plan, and
//! every failure aborts the whole translation.

use crate::observability::{Event, Logger};
use crate::schema::EntitySchema;

use super::config::TranslatorConfig;
use super::errors::{QueryError, QueryResult};
use super::filter::{Condition, FilterOperator, FilterSpec};
use super::params::{coerce_operand, ParameterSet};
use super::plan::{ComputedColumn, OrderBy, QueryPlan, WhereClause};

/// A single transformation step
pub type Stage = fn(&mut QueryPlan, &ParameterSet, &StageContext<'_>) -> QueryResult<()>;

/// What every stage may consult besides the parameters
pub struct StageContext<'a> {
    pub entity: &'a EntitySchema,
    pub config: &'a TranslatorConfig,
}

impl<'a> StageContext<'a> {
    pub fn new(entity: &'a EntitySchema, config: &'a TranslatorConfig) -> Self {
        Self { entity, config }
    }

    /// Column check applied when `strict_columns` is on
    pub fn check_column(&self, column: &str) -> QueryResult<()> {
        if self.config.strict_columns {
            self.require_column(column)
        } else {
            Ok(())
        }
    }

    /// Column check applied regardless of configuration
    pub fn require_column(&self, column: &str) -> QueryResult<()> {
        if self.entity.has_column(column) {
            Ok(())
        } else {
            Err(QueryError::unknown_column(&self.entity.name, column))
        }
    }
}

/// Replaces the projection with the requested columns
pub fn apply_field_selection(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    let Some(fields) = &params.fields else {
        return Ok(());
    };

    for field in fields {
        ctx.check_column(field)?;
    }
    plan.selected_columns = Some(fields.clone());
    Ok(())
}

/// One clause per literal, one clause per operator, all AND'd
pub fn apply_filters(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    for (field, spec) in &params.filters {
        ctx.check_column(field)?;
        let semantic_type = ctx.entity.column(field).map(|c| c.semantic_type);

        match spec {
            FilterSpec::Literal(raw) => {
                plan.where_clauses.push(WhereClause::Compare(Condition::eq(
                    field,
                    coerce_operand(raw, semantic_type),
                )));
            }
            FilterSpec::Operators(operators) => {
                for (symbol, operand) in operators {
                    let (operator, known) = FilterOperator::from_symbol(symbol);
                    if !known {
                        Logger::warn(
                            Event::UnknownOperatorDefaulted.as_str(),
                            &[("field", field.as_str()), ("operator", symbol.as_str())],
                        );
                    }
                    plan.where_clauses.push(WhereClause::Compare(Condition::new(
                        field,
                        operator,
                        coerce_operand(operand, semantic_type),
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Appends ordering in request order
pub fn apply_sorting(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    for key in &params.sort {
        ctx.check_column(&key.field)?;
        plan.order_by.push(OrderBy {
            expr: key.field.clone(),
            direction: key.direction,
        });
    }
    Ok(())
}

/// Records relations to eager load. Existence is the executor's concern.
pub fn apply_includes(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    _ctx: &StageContext<'_>,
) -> QueryResult<()> {
    for relation in &params.includes {
        plan.add_eager_load(relation.as_str());
    }
    Ok(())
}

/// Adds `function(field) AS function_field` columns
pub fn apply_aggregation(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    for request in &params.aggregates {
        // rendered unbound, so the column must exist whatever the config says
        ctx.require_column(&request.field)?;
        plan.add_extra_select(ComputedColumn::aggregate(request.function, &request.field));
    }
    Ok(())
}

/// Inclusive window over the configured timestamp column
pub fn apply_time_range(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    let Some(range) = &params.time_range else {
        return Ok(());
    };

    let column = &ctx.config.timestamp_column;
    ctx.check_column(column)?;

    plan.where_clauses.push(WhereClause::Between {
        field: column.clone(),
        low: format_timestamp(&range.start).into(),
        high: format_timestamp(&range.end).into(),
    });
    Ok(())
}

/// Timestamp bind format
pub fn format_timestamp(datetime: &chrono::NaiveDateTime) -> String {
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::params::{AggregateRequest, SortKey, TimeRange};
    use crate::query::plan::{AggregateFunction, SortDirection};
    use crate::schema::{Column, SemanticType};
    use serde_json::{json, Value};

    fn products() -> EntitySchema {
        EntitySchema::new(
            "products",
            vec![
                Column::new("id", SemanticType::Integer),
                Column::new("name", SemanticType::String),
                Column::new("price", SemanticType::Decimal),
                Column::new("status", SemanticType::String),
                Column::new("created_at", SemanticType::DateTime),
            ],
        )
    }

    fn run(stage: Stage, params: &ParameterSet, config: &TranslatorConfig) -> QueryResult<QueryPlan> {
        let entity = products();
        let ctx = StageContext::new(&entity, config);
        let mut plan = QueryPlan::new("products");
        stage(&mut plan, params, &ctx)?;
        Ok(plan)
    }

    #[test]
    fn test_field_selection_replaces_projection() {
        let params = ParameterSet {
            fields: Some(vec!["id".to_string(), "name".to_string()]),
            ..Default::default()
        };
        let plan = run(apply_field_selection, &params, &TranslatorConfig::default()).unwrap();
        assert_eq!(
            plan.selected_columns,
            Some(vec!["id".to_string(), "name".to_string()])
        );
    }

    #[test]
    fn test_field_selection_unknown_column() {
        let params = ParameterSet {
            fields: Some(vec!["password".to_string()]),
            ..Default::default()
        };
        let err = run(apply_field_selection, &params, &TranslatorConfig::default()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { ref column, .. } if column == "password"));

        let lenient = TranslatorConfig {
            strict_columns: false,
            ..Default::default()
        };
        assert!(run(apply_field_selection, &params, &lenient).is_ok());
    }

    #[test]
    fn test_literal_filters_are_equality() {
        let params = ParameterSet {
            filters: vec![
                ("status".to_string(), FilterSpec::Literal("active".to_string())),
                ("price".to_string(), FilterSpec::Literal("10".to_string())),
            ],
            ..Default::default()
        };
        let plan = run(apply_filters, &params, &TranslatorConfig::default()).unwrap();
        assert_eq!(
            plan.where_clauses,
            vec![
                WhereClause::Compare(Condition::eq("status", json!("active"))),
                WhereClause::Compare(Condition::eq("price", json!(10))),
            ]
        );
    }

    #[test]
    fn test_filter_operands_follow_column_type() {
        let params = ParameterSet {
            filters: vec![
                ("status".to_string(), FilterSpec::Literal("007".to_string())),
                (
                    "price".to_string(),
                    FilterSpec::Operators(vec![("gt".to_string(), "007".to_string())]),
                ),
            ],
            ..Default::default()
        };
        let plan = run(apply_filters, &params, &TranslatorConfig::default()).unwrap();
        assert_eq!(
            plan.where_clauses,
            vec![
                WhereClause::Compare(Condition::eq("status", json!("007"))),
                WhereClause::Compare(Condition::gt("price", json!(7))),
            ]
        );

        let lenient = TranslatorConfig {
            strict_columns: false,
            ..Default::default()
        };
        let params = ParameterSet {
            filters: vec![("rating".to_string(), FilterSpec::Literal("4".to_string()))],
            ..Default::default()
        };
        let plan = run(apply_filters, &params, &lenient).unwrap();
        assert_eq!(
            plan.where_clauses,
            vec![WhereClause::Compare(Condition::eq("rating", json!(4)))]
        );
    }

    #[test]
    fn test_operator_filters() {
        let params = ParameterSet {
            filters: vec![(
                "price".to_string(),
                FilterSpec::Operators(vec![
                    ("gte".to_string(), "10".to_string()),
                    ("lt".to_string(), "20".to_string()),
                    ("approximately".to_string(), "15".to_string()),
                ]),
            )],
            ..Default::default()
        };
        let plan = run(apply_filters, &params, &TranslatorConfig::default()).unwrap();
        let operators: Vec<FilterOperator> = plan
            .where_clauses
            .iter()
            .map(|c| match c {
                WhereClause::Compare(cond) => cond.operator,
                other => panic!("unexpected clause {:?}", other),
            })
            .collect();
        assert_eq!(
            operators,
            vec![FilterOperator::Gte, FilterOperator::Lt, FilterOperator::Eq]
        );
    }

    #[test]
    fn test_sorting_preserves_order() {
        let params = ParameterSet {
            sort: vec![
                SortKey {
                    field: "price".to_string(),
                    direction: SortDirection::Desc,
                },
                SortKey {
                    field: "name".to_string(),
                    direction: SortDirection::Asc,
                },
            ],
            ..Default::default()
        };
        let plan = run(apply_sorting, &params, &TranslatorConfig::default()).unwrap();
        assert_eq!(plan.order_by, vec![OrderBy::desc("price"), OrderBy::asc("name")]);
    }

    #[test]
    fn test_includes_not_validated() {
        let params = ParameterSet {
            includes: vec!["category".to_string(), "nonexistent".to_string()],
            ..Default::default()
        };
        let plan = run(apply_includes, &params, &TranslatorConfig::default()).unwrap();
        assert_eq!(plan.eager_load, vec!["category", "nonexistent"]);
    }

    #[test]
    fn test_aggregation_always_checks_columns() {
        let lenient = TranslatorConfig {
            strict_columns: false,
            ..Default::default()
        };
        let params = ParameterSet {
            aggregates: vec![AggregateRequest {
                function: AggregateFunction::Sum,
                field: "cost".to_string(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            run(apply_aggregation, &params, &lenient),
            Err(QueryError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_aggregation_emits_aliased_columns() {
        let params = ParameterSet {
            aggregates: vec![
                AggregateRequest {
                    function: AggregateFunction::Sum,
                    field: "price".to_string(),
                },
                AggregateRequest {
                    function: AggregateFunction::Max,
                    field: "price".to_string(),
                },
                AggregateRequest {
                    function: AggregateFunction::Sum,
                    field: "price".to_string(),
                },
            ],
            ..Default::default()
        };
        let plan = run(apply_aggregation, &params, &TranslatorConfig::default()).unwrap();
        let aliases: Vec<&str> = plan.extra_selects.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(aliases, vec!["sum_price", "max_price"]);
    }

    #[test]
    fn test_time_range_between() {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let params = ParameterSet {
            time_range: Some(TimeRange { start, end }),
            ..Default::default()
        };
        let plan = run(apply_time_range, &params, &TranslatorConfig::default()).unwrap();
        assert_eq!(
            plan.where_clauses,
            vec![WhereClause::Between {
                field: "created_at".to_string(),
                low: Value::from("2024-01-01 00:00:00"),
                high: Value::from("2024-01-31 23:59:59"),
            }]
        );
    }
}
