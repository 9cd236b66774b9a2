//! Identifier validation
//!
//! Column, relation and function names end up in generated SQL text, so
//! they are checked against a strict pattern before use. Values never pass
//! through here; they are always bound.

use std::sync::OnceLock;

use regex::Regex;

use super::errors::{QueryError, QueryResult};

fn column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid regex"))
}

fn relation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}(\.[A-Za-z_][A-Za-z0-9_]{0,63})*$")
            .expect("valid regex")
    })
}

/// True for a plain column name (`price`, `created_at`)
pub fn is_column_name(name: &str) -> bool {
    column_pattern().is_match(name)
}

/// True for a relation path (`category`, `category.parent`)
pub fn is_relation_path(name: &str) -> bool {
    relation_pattern().is_match(name)
}

/// Validates a column name taken from parameter `param`
pub fn column(param: &str, name: &str) -> QueryResult<String> {
    if is_column_name(name) {
        Ok(name.to_string())
    } else {
        Err(QueryError::invalid(
            param,
            format!("'{}' is not a valid column name", name),
        ))
    }
}

/// Validates a relation path taken from parameter `param`
pub fn relation(param: &str, name: &str) -> QueryResult<String> {
    if is_relation_path(name) {
        Ok(name.to_string())
    } else {
        Err(QueryError::invalid(
            param,
            format!("'{}' is not a valid relation name", name),
        ))
    }
}

/// Splits a comma list, trimming entries and dropping empty ones
pub fn split_list(value: &str) -> Vec<&str> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert!(is_column_name("price"));
        assert!(is_column_name("_internal"));
        assert!(is_column_name("created_at2"));
        assert!(!is_column_name("2fast"));
        assert!(!is_column_name("name)--"));
        assert!(!is_column_name("a.b"));
        assert!(!is_column_name(""));
        assert!(!is_column_name("price desc"));
    }

    #[test]
    fn test_relation_paths() {
        assert!(is_relation_path("category"));
        assert!(is_relation_path("category.parent"));
        assert!(!is_relation_path("category."));
        assert!(!is_relation_path(".category"));
        assert!(!is_relation_path("category;drop"));
    }

    #[test]
    fn test_column_error_names_param() {
        let err = column("fields", "1=1").unwrap_err();
        assert_eq!(err.parameter(), Some("fields"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" id, name ,,price"), vec!["id", "name", "price"]);
        assert!(split_list("").is_empty());
        assert!(split_list(" , ").is_empty());
    }
}
