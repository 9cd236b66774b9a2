//! Free-text search stage
//!
//! `search=term` becomes one OR group of case-insensitive substring matches,
//! AND'd with every other clause. With `search_fields` absent, empty or `*`
//! the group covers every string/text column of the entity.
//!
//! When no column qualifies the group is still added, empty, and matches
//! nothing: a search must never widen a result set.

use super::errors::QueryResult;
use super::filter::Condition;
use super::params::{ParameterSet, SearchFields};
use super::plan::QueryPlan;
use super::stages::StageContext;

/// Adds the search OR group
pub fn apply_search(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    let Some(search) = &params.search else {
        return Ok(());
    };

    let columns: Vec<String> = match &search.fields {
        SearchFields::All => ctx
            .entity
            .textual_columns()
            .into_iter()
            .map(str::to_string)
            .collect(),
        SearchFields::Columns(columns) => {
            for column in columns {
                ctx.check_column(column)?;
            }
            columns.clone()
        }
    };

    let group = columns
        .iter()
        .map(|column| Condition::contains(column, &search.term))
        .collect();
    plan.or_groups.push(group);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::config::TranslatorConfig;
    use crate::query::errors::QueryError;
    use crate::query::filter::FilterOperator;
    use crate::query::params::SearchParams;
    use crate::schema::{Column, EntitySchema, SemanticType};
    use serde_json::json;

    fn products() -> EntitySchema {
        EntitySchema::new(
            "products",
            vec![
                Column::new("id", SemanticType::Integer),
                Column::new("name", SemanticType::String),
                Column::new("price", SemanticType::Decimal),
                Column::new("description", SemanticType::Text),
            ],
        )
    }

    fn search(term: &str, fields: SearchFields) -> ParameterSet {
        ParameterSet {
            search: Some(SearchParams {
                term: term.to_string(),
                fields,
            }),
            ..Default::default()
        }
    }

    fn run(entity: &EntitySchema, params: &ParameterSet) -> QueryResult<QueryPlan> {
        let config = TranslatorConfig::default();
        let ctx = StageContext::new(entity, &config);
        let mut plan = QueryPlan::new(&entity.name);
        apply_search(&mut plan, params, &ctx)?;
        Ok(plan)
    }

    #[test]
    fn test_wildcard_uses_textual_columns() {
        let plan = run(&products(), &search("abc", SearchFields::All)).unwrap();

        assert_eq!(plan.or_groups.len(), 1);
        let group = &plan.or_groups[0];
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].field, "name");
        assert_eq!(group[1].field, "description");
        for cond in group {
            assert_eq!(cond.operator, FilterOperator::Like);
            assert_eq!(cond.operand, json!("%abc%"));
        }
        assert!(plan.where_clauses.is_empty());
    }

    #[test]
    fn test_explicit_fields() {
        let plan = run(
            &products(),
            &search("lamp", SearchFields::Columns(vec!["name".to_string()])),
        )
        .unwrap();
        assert_eq!(plan.or_groups, vec![vec![Condition::contains("name", "lamp")]]);
    }

    #[test]
    fn test_explicit_unknown_field() {
        let err = run(
            &products(),
            &search("lamp", SearchFields::Columns(vec!["sku".to_string()])),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { .. }));
    }

    #[test]
    fn test_no_textual_columns_matches_nothing() {
        let numbers = EntitySchema::new(
            "readings",
            vec![
                Column::new("id", SemanticType::Integer),
                Column::new("value", SemanticType::Float),
            ],
        );
        let plan = run(&numbers, &search("abc", SearchFields::All)).unwrap();
        assert_eq!(plan.or_groups, vec![Vec::<Condition>::new()]);
    }

    #[test]
    fn test_no_term_is_noop() {
        let plan = run(&products(), &ParameterSet::default()).unwrap();
        assert_eq!(plan, QueryPlan::new("products"));
    }
}
