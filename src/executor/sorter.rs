//! Row sorting
//!
//! Multi-key, stable and deterministic.

use std::cmp::Ordering;

use serde_json::Value;

use crate::query::{OrderBy, SortDirection};

pub struct ResultSorter;

impl ResultSorter {
    /// Sorts rows by each key in turn. Ties keep their input order.
    pub fn sort(rows: &mut [Value], order_by: &[OrderBy]) {
        if order_by.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for key in order_by {
                let ordering = Self::compare_values(a.get(&key.expr), b.get(&key.expr));
                let ordering = match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Ordering rules:
    /// - missing = null < bool < number < string
    /// - same types use natural ordering
    pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let a = a.unwrap_or(&Value::Null);
        let b = b.unwrap_or(&Value::Null);

        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };

        let (a_type, b_type) = (type_order(a), type_order(b));
        if a_type != b_type {
            return a_type.cmp(&b_type);
        }

        match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }
}
