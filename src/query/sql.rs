//! SQL rendering
//!
//! Renders a [`QueryPlan`] as MySQL-flavoured SQL. Identifiers come from the
//! plan, which only ever holds validated names, and are backtick-quoted.
//! Every operand is a `?` placeholder with its value in `binds`.

use serde::Serialize;
use serde_json::Value;

use super::filter::{Condition, FilterOperator};
use super::pagination::PageRequest;
use super::plan::{ComputedColumn, ComputedExpr, QueryPlan, WhereClause, EARTH_RADIUS_KM};

/// A statement ready for a driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    pub sql: String,
    pub binds: Vec<Value>,
}

pub struct SqlRenderer;

impl SqlRenderer {
    /// `SELECT ... LIMIT ? OFFSET ?` for one page
    pub fn select(plan: &QueryPlan, page: &PageRequest) -> SqlStatement {
        let mut binds = Vec::new();
        let mut sql = Self::body(plan, &mut binds);

        if !plan.order_by.is_empty() {
            let keys: Vec<String> = plan
                .order_by
                .iter()
                .map(|o| format!("{} {}", quote(&o.expr), o.direction.as_str().to_uppercase()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        sql.push_str(" LIMIT ? OFFSET ?");
        binds.push(Value::from(page.limit() as u64));
        binds.push(Value::from(page.offset() as u64));

        SqlStatement { sql, binds }
    }

    /// Total number of rows the plan matches, ignoring pagination
    pub fn count(plan: &QueryPlan) -> SqlStatement {
        let mut binds = Vec::new();
        if plan.having_clauses.is_empty() && !plan.has_aggregates() {
            let sql = format!(
                "SELECT COUNT(*) AS `total` FROM {}{}",
                quote(&plan.entity),
                where_sql(plan, &mut binds)
            );
            return SqlStatement { sql, binds };
        }

        let inner = Self::body(plan, &mut binds);
        SqlStatement {
            sql: format!("SELECT COUNT(*) AS `total` FROM ({}) AS `counted`", inner),
            binds,
        }
    }

    /// SELECT, FROM, WHERE and HAVING
    fn body(plan: &QueryPlan, binds: &mut Vec<Value>) -> String {
        let mut projection: Vec<String> = match &plan.selected_columns {
            // aggregates alone collapse the result to one row
            None if plan.has_aggregates() => Vec::new(),
            None => vec!["*".to_string()],
            Some(columns) => columns.iter().map(|c| quote(c)).collect(),
        };
        for column in &plan.extra_selects {
            projection.push(computed_sql(column, binds));
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            projection.join(", "),
            quote(&plan.entity)
        );
        sql.push_str(&where_sql(plan, binds));

        if !plan.having_clauses.is_empty() {
            let having: Vec<String> = plan
                .having_clauses
                .iter()
                .map(|c| condition_sql(c, binds))
                .collect();
            sql.push_str(" HAVING ");
            sql.push_str(&having.join(" AND "));
        }
        sql
    }
}

fn where_sql(plan: &QueryPlan, binds: &mut Vec<Value>) -> String {
    let mut parts: Vec<String> = Vec::new();

    for clause in &plan.where_clauses {
        match clause {
            WhereClause::Compare(cond) => parts.push(condition_sql(cond, binds)),
            WhereClause::Between { field, low, high } => {
                binds.push(low.clone());
                binds.push(high.clone());
                parts.push(format!("{} BETWEEN ? AND ?", quote(field)));
            }
        }
    }

    for group in &plan.or_groups {
        if group.is_empty() {
            parts.push("1 = 0".to_string());
            continue;
        }
        let alternatives: Vec<String> = group.iter().map(|c| condition_sql(c, binds)).collect();
        parts.push(format!("({})", alternatives.join(" OR ")));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn condition_sql(cond: &Condition, binds: &mut Vec<Value>) -> String {
    let column = quote(&cond.field);
    if cond.operand.is_null() {
        match cond.operator {
            FilterOperator::Eq => return format!("{} IS NULL", column),
            FilterOperator::Neq => return format!("{} IS NOT NULL", column),
            _ => {}
        }
    }

    binds.push(cond.operand.clone());
    match cond.operator {
        FilterOperator::Like => format!("{} LIKE ? ESCAPE '\\\\'", column),
        op => format!("{} {} ?", column, op.sql_symbol()),
    }
}

fn computed_sql(column: &ComputedColumn, binds: &mut Vec<Value>) -> String {
    let expr = match &column.expr {
        ComputedExpr::Aggregate { function, field } => {
            format!("{}({})", function.as_str().to_uppercase(), quote(field))
        }
        ComputedExpr::Distance {
            origin,
            lat_column,
            lng_column,
        } => {
            binds.push(Value::from(origin.lat));
            binds.push(Value::from(origin.lng));
            binds.push(Value::from(origin.lat));
            let lat = quote(lat_column);
            let lng = quote(lng_column);
            format!(
                "({} * ACOS(COS(RADIANS(?)) * COS(RADIANS({lat})) * COS(RADIANS({lng}) - RADIANS(?)) + SIN(RADIANS(?)) * SIN(RADIANS({lat}))))",
                EARTH_RADIUS_KM as u32,
            )
        }
    };
    format!("{} AS {}", expr, quote(&column.alias))
}

fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::plan::{AggregateFunction, GeoPoint, OrderBy};
    use serde_json::json;

    #[test]
    fn test_empty_plan() {
        let plan = QueryPlan::new("products");
        let stmt = SqlRenderer::select(&plan, &PageRequest::default());
        assert_eq!(stmt.sql, "SELECT * FROM `products` LIMIT ? OFFSET ?");
        assert_eq!(stmt.binds, vec![json!(15), json!(0)]);

        let count = SqlRenderer::count(&plan);
        assert_eq!(count.sql, "SELECT COUNT(*) AS `total` FROM `products`");
        assert!(count.binds.is_empty());
    }

    #[test]
    fn test_operands_are_bound() {
        let mut plan = QueryPlan::new("products");
        plan.selected_columns = Some(vec!["id".to_string(), "name".to_string()]);
        plan.where_clauses
            .push(WhereClause::Compare(Condition::eq("status", json!("x' OR 1=1 --"))));
        plan.where_clauses
            .push(WhereClause::Compare(Condition::gt("price", json!(10))));
        plan.order_by.push(OrderBy::desc("price"));

        let stmt = SqlRenderer::select(&plan, &PageRequest::new(2, 10, 100));
        assert_eq!(
            stmt.sql,
            "SELECT `id`, `name` FROM `products` WHERE `status` = ? AND `price` > ? ORDER BY `price` DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.binds,
            vec![json!("x' OR 1=1 --"), json!(10), json!(10), json!(10)]
        );
    }

    #[test]
    fn test_null_operands() {
        let mut plan = QueryPlan::new("products");
        plan.where_clauses
            .push(WhereClause::Compare(Condition::eq("deleted_at", Value::Null)));
        plan.where_clauses.push(WhereClause::Compare(Condition::new(
            "category_id",
            FilterOperator::Neq,
            Value::Null,
        )));
        let stmt = SqlRenderer::count(&plan);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS `total` FROM `products` WHERE `deleted_at` IS NULL AND `category_id` IS NOT NULL"
        );
        assert!(stmt.binds.is_empty());
    }

    #[test]
    fn test_search_groups() {
        let mut plan = QueryPlan::new("products");
        plan.or_groups.push(vec![
            Condition::contains("name", "abc"),
            Condition::contains("description", "abc"),
        ]);
        let stmt = SqlRenderer::count(&plan);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS `total` FROM `products` WHERE (`name` LIKE ? ESCAPE '\\\\' OR `description` LIKE ? ESCAPE '\\\\')"
        );
        assert_eq!(stmt.binds, vec![json!("%abc%"), json!("%abc%")]);

        let mut nothing = QueryPlan::new("products");
        nothing.or_groups.push(Vec::new());
        assert_eq!(
            SqlRenderer::count(&nothing).sql,
            "SELECT COUNT(*) AS `total` FROM `products` WHERE 1 = 0"
        );
    }

    #[test]
    fn test_between() {
        let mut plan = QueryPlan::new("orders");
        plan.where_clauses.push(WhereClause::Between {
            field: "created_at".to_string(),
            low: json!("2024-01-01 00:00:00"),
            high: json!("2024-01-31 23:59:59"),
        });
        let stmt = SqlRenderer::count(&plan);
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS `total` FROM `orders` WHERE `created_at` BETWEEN ? AND ?"
        );
        assert_eq!(stmt.binds.len(), 2);
    }

    #[test]
    fn test_aggregates_only() {
        let mut plan = QueryPlan::new("orders");
        plan.add_extra_select(ComputedColumn::aggregate(AggregateFunction::Sum, "amount"));
        plan.add_extra_select(ComputedColumn::aggregate(AggregateFunction::Count, "id"));

        let stmt = SqlRenderer::select(&plan, &PageRequest::default());
        assert_eq!(
            stmt.sql,
            "SELECT SUM(`amount`) AS `sum_amount`, COUNT(`id`) AS `count_id` FROM `orders` LIMIT ? OFFSET ?"
        );
        assert_eq!(
            SqlRenderer::count(&plan).sql,
            "SELECT COUNT(*) AS `total` FROM (SELECT SUM(`amount`) AS `sum_amount`, COUNT(`id`) AS `count_id` FROM `orders`) AS `counted`"
        );
    }

    #[test]
    fn test_distance() {
        let mut plan = QueryPlan::new("stores");
        plan.add_extra_select(ComputedColumn::distance(
            GeoPoint::new(40.5, -73.25),
            "latitude",
            "longitude",
        ));
        plan.having_clauses.push(Condition::lt("distance", json!(10.0)));
        plan.order_by = vec![OrderBy::asc("distance")];

        let stmt = SqlRenderer::select(&plan, &PageRequest::default());
        assert_eq!(
            stmt.sql,
            "SELECT *, (6371 * ACOS(COS(RADIANS(?)) * COS(RADIANS(`latitude`)) * COS(RADIANS(`longitude`) - RADIANS(?)) + SIN(RADIANS(?)) * SIN(RADIANS(`latitude`)))) AS `distance` FROM `stores` HAVING `distance` < ? ORDER BY `distance` ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.binds,
            vec![
                json!(40.5),
                json!(-73.25),
                json!(40.5),
                json!(10.0),
                json!(15),
                json!(0)
            ]
        );

        let count = SqlRenderer::count(&plan);
        assert!(count.sql.starts_with("SELECT COUNT(*) AS `total` FROM (SELECT *, (6371"));
        assert_eq!(count.binds.len(), 4);
    }

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(quote("name"), "`name`");
        assert_eq!(quote("we`ird"), "`we``ird`");
    }
}
