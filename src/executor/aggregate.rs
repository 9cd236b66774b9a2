//! Aggregate functions over a column
//!
//! NULL and missing values are skipped. Over no values, COUNT is 0 and the
//! other functions are NULL.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use crate::query::{AggregateFunction, ComputedExpr, QueryPlan};

use super::filters::as_number;
use super::sorter::ResultSorter;

/// Evaluates one aggregate over the given column values
pub fn aggregate<'a>(function: AggregateFunction, values: impl Iterator<Item = &'a Value>) -> Value {
    let values: Vec<&Value> = values.filter(|v| !v.is_null()).collect();

    match function {
        AggregateFunction::Count => Value::from(values.len() as u64),
        AggregateFunction::Sum => sum(&values),
        AggregateFunction::Avg => {
            let numbers: Vec<f64> = values.iter().filter_map(|v| as_number(v)).collect();
            if numbers.is_empty() {
                return Value::Null;
            }
            float(numbers.iter().sum::<f64>() / numbers.len() as f64)
        }
        AggregateFunction::Min => extreme(&values, Ordering::Less),
        AggregateFunction::Max => extreme(&values, Ordering::Greater),
    }
}

/// Collapses rows into the single row an aggregate query returns.
/// Selected plain columns take their value from the first row.
pub fn collapse(rows: &[Value], plan: &QueryPlan) -> Value {
    let mut out = Map::new();

    if let Some(columns) = &plan.selected_columns {
        let first = rows.first();
        for column in columns {
            let value = first
                .and_then(|row| row.get(column))
                .cloned()
                .unwrap_or(Value::Null);
            out.insert(column.clone(), value);
        }
    }

    for computed in &plan.extra_selects {
        if let ComputedExpr::Aggregate { function, field } = &computed.expr {
            let value = aggregate(*function, rows.iter().filter_map(|row| row.get(field)));
            out.insert(computed.alias.clone(), value);
        }
    }

    Value::Object(out)
}

fn sum(values: &[&Value]) -> Value {
    let integers: Option<Vec<i64>> = values.iter().map(|v| v.as_i64()).collect();
    if let Some(integers) = integers {
        if integers.is_empty() {
            return Value::Null;
        }
        if let Some(total) = integers.iter().try_fold(0i64, |acc, n| acc.checked_add(*n)) {
            return Value::from(total);
        }
    }

    let numbers: Vec<f64> = values.iter().filter_map(|v| as_number(v)).collect();
    if numbers.is_empty() {
        return Value::Null;
    }
    float(numbers.iter().sum())
}

fn extreme(values: &[&Value], wanted: Ordering) -> Value {
    values
        .iter()
        .copied()
        .reduce(|best, v| {
            if ResultSorter::compare_values(Some(v), Some(best)) == wanted {
                v
            } else {
                best
            }
        })
        .cloned()
        .unwrap_or(Value::Null)
}

fn float(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}
