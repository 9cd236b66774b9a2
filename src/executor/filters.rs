//! Condition evaluation against JSON rows
//!
//! Follows SQL semantics closely enough for an in-memory store:
//! - A NULL or missing value never satisfies a comparison
//! - `= null` / `!= null` mean IS NULL / IS NOT NULL
//! - Numeric comparison needs a real number on at least one side, so
//!   `"007"` and `"7"` stay distinct strings
//! - LIKE is case-insensitive with `%`, `_` and `\` escapes

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::query::{parse_datetime, Condition, FilterOperator, QueryPlan, WhereClause};

/// Evaluates plan conditions against rows
pub struct ConditionFilter;

impl ConditionFilter {
    /// WHERE clauses AND'd with every OR group
    pub fn matches_where(row: &Value, plan: &QueryPlan) -> bool {
        plan.where_clauses
            .iter()
            .all(|clause| Self::matches_clause(row, clause))
            && plan
                .or_groups
                .iter()
                .all(|group| group.iter().any(|cond| Self::matches_condition(row, cond)))
    }

    /// HAVING clauses, evaluated once computed columns are present
    pub fn matches_having(row: &Value, plan: &QueryPlan) -> bool {
        plan.having_clauses
            .iter()
            .all(|cond| Self::matches_condition(row, cond))
    }

    pub fn matches_clause(row: &Value, clause: &WhereClause) -> bool {
        match clause {
            WhereClause::Compare(cond) => Self::matches_condition(row, cond),
            WhereClause::Between { field, low, high } => {
                let (Some(value), Some(low), Some(high)) = (
                    row.get(field).and_then(as_datetime),
                    as_datetime(low),
                    as_datetime(high),
                ) else {
                    return false;
                };
                low <= value && value <= high
            }
        }
    }

    pub fn matches_condition(row: &Value, cond: &Condition) -> bool {
        let actual = row.get(&cond.field).unwrap_or(&Value::Null);

        if cond.operand.is_null() {
            return match cond.operator {
                FilterOperator::Eq => actual.is_null(),
                FilterOperator::Neq => !actual.is_null(),
                _ => false,
            };
        }
        if actual.is_null() {
            return false;
        }

        match cond.operator {
            FilterOperator::Like => match (scalar_text(actual), cond.operand.as_str()) {
                (Some(text), Some(pattern)) => like_match(&text, pattern),
                _ => false,
            },
            op => {
                let Some(ordering) = compare_scalars(actual, &cond.operand) else {
                    return false;
                };
                match op {
                    FilterOperator::Eq => ordering == Ordering::Equal,
                    FilterOperator::Neq => ordering != Ordering::Equal,
                    FilterOperator::Gt => ordering == Ordering::Greater,
                    FilterOperator::Gte => ordering != Ordering::Less,
                    FilterOperator::Lt => ordering == Ordering::Less,
                    FilterOperator::Lte => ordering != Ordering::Greater,
                    FilterOperator::Like => false,
                }
            }
        }
    }
}

/// Compares two non-null scalars. `None` when they are not comparable.
pub fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_number() || b.is_number() {
        if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
            return x.partial_cmp(&y);
        }
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Numeric view of a value: numbers, numeric strings and booleans (as 0/1)
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn as_datetime(value: &Value) -> Option<NaiveDateTime> {
    value.as_str().and_then(|s| parse_datetime("", s, false).ok())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyMany,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '%' => tokens.push(Token::AnyMany),
            '_' => tokens.push(Token::AnyOne),
            c => tokens.push(Token::Literal(c)),
        }
    }
    tokens
}

/// Case-insensitive SQL LIKE
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let tokens = tokenize(&pattern.to_lowercase());

    // matched[j]: the first i chars of text match the first j tokens
    let mut matched = vec![false; tokens.len() + 1];
    matched[0] = true;
    for (j, token) in tokens.iter().enumerate() {
        if *token == Token::AnyMany {
            matched[j + 1] = matched[j];
        }
    }

    for c in &text {
        let mut next = vec![false; tokens.len() + 1];
        for (j, token) in tokens.iter().enumerate() {
            next[j + 1] = match token {
                Token::AnyMany => next[j] || matched[j + 1],
                Token::AnyOne => matched[j],
                Token::Literal(l) => matched[j] && l == c,
            };
        }
        matched = next;
    }

    matched[tokens.len()]
}
