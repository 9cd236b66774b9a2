//! # Filter Expressions
//!
//! Filter operators, the decoded `filter[...]` parameter shape, and the
//! single-column conditions the plan is built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equals
    #[serde(rename = "eq")]
    Eq,

    /// Not equals
    #[serde(rename = "neq")]
    Neq,

    /// Greater than
    #[serde(rename = "gt")]
    Gt,

    /// Greater than or equal
    #[serde(rename = "gte")]
    Gte,

    /// Less than
    #[serde(rename = "lt")]
    Lt,

    /// Less than or equal
    #[serde(rename = "lte")]
    Lte,

    /// Case-insensitive pattern match. Produced by search, never by `filter`.
    #[serde(rename = "like")]
    Like,
}

impl FilterOperator {
    /// Maps a `filter[field][op]` symbol to an operator.
    ///
    /// Total over all inputs: an unrecognized symbol is equality. The second
    /// element tells the caller whether the symbol was recognized.
    pub fn from_symbol(symbol: &str) -> (Self, bool) {
        match symbol {
            "eq" => (FilterOperator::Eq, true),
            "gt" => (FilterOperator::Gt, true),
            "gte" => (FilterOperator::Gte, true),
            "lt" => (FilterOperator::Lt, true),
            "lte" => (FilterOperator::Lte, true),
            "neq" => (FilterOperator::Neq, true),
            _ => (FilterOperator::Eq, false),
        }
    }

    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Neq => "neq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::Like => "like",
        }
    }

    /// SQL comparison symbol
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Neq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Like => "LIKE",
        }
    }
}

/// Decoded value of one `filter[field]` entry. Operands stay raw text until
/// the filter stage knows the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterSpec {
    /// `filter[status]=active`
    Literal(String),
    /// `filter[price][gte]=10&filter[price][lt]=20`, in input order
    Operators(Vec<(String, String)>),
}

/// A single `field <op> operand` condition. The operand is always bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Column the condition applies to
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub operand: Value,
}

impl Condition {
    /// Create a new condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, operand: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            operand,
        }
    }

    /// Create an equality condition
    pub fn eq(field: impl Into<String>, operand: Value) -> Self {
        Self::new(field, FilterOperator::Eq, operand)
    }

    /// Create a greater than condition
    pub fn gt(field: impl Into<String>, operand: Value) -> Self {
        Self::new(field, FilterOperator::Gt, operand)
    }

    /// Create a "less than" condition
    pub fn lt(field: impl Into<String>, operand: Value) -> Self {
        Self::new(field, FilterOperator::Lt, operand)
    }

    /// Substring match: `field LIKE %term%` with LIKE metacharacters escaped
    pub fn contains(field: impl Into<String>, term: &str) -> Self {
        Self::new(
            field,
            FilterOperator::Like,
            Value::String(format!("%{}%", escape_like(term))),
        )
    }
}

/// Escapes `\`, `%` and `_` so they match literally inside a LIKE pattern
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
