//! Geospatial proximity stage
//!
//! `near[lat]`, `near[lng]` and optional `near[distance]` (km) add a
//! computed haversine `distance` column, keep rows strictly closer than the
//! radius, and replace any ordering with nearest first. This stage runs
//! after sorting so that the replacement sticks.

use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use super::filter::{Condition, FilterOperator};
use super::params::ParameterSet;
use super::plan::{ComputedColumn, OrderBy, QueryPlan, DISTANCE_ALIAS};
use super::stages::StageContext;

/// Adds the distance column, radius filter and ordering
pub fn apply_geospatial(
    plan: &mut QueryPlan,
    params: &ParameterSet,
    ctx: &StageContext<'_>,
) -> QueryResult<()> {
    let Some(near) = &params.near else {
        return Ok(());
    };

    let lat_column = &ctx.config.latitude_column;
    let lng_column = &ctx.config.longitude_column;
    ctx.check_column(lat_column)?;
    ctx.check_column(lng_column)?;

    let radius = near.distance_km.unwrap_or(ctx.config.default_distance_km);
    let radius = serde_json::Number::from_f64(radius)
        .map(Value::Number)
        .ok_or_else(|| QueryError::invalid("near.distance", "must be numeric"))?;

    // a second `distance` column would be ambiguous
    plan.extra_selects.retain(|c| c.alias != DISTANCE_ALIAS);
    plan.extra_selects
        .push(ComputedColumn::distance(near.origin, lat_column, lng_column));

    plan.having_clauses
        .push(Condition::new(DISTANCE_ALIAS, FilterOperator::Lt, radius));

    plan.order_by = vec![OrderBy::asc(DISTANCE_ALIAS)];

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::config::TranslatorConfig;
    use crate::query::params::NearParams;
    use crate::query::plan::{ComputedExpr, GeoPoint};
    use crate::schema::{Column, EntitySchema, SemanticType};
    use serde_json::json;

    fn stores() -> EntitySchema {
        EntitySchema::new(
            "stores",
            vec![
                Column::new("id", SemanticType::Integer),
                Column::new("name", SemanticType::String),
                Column::new("latitude", SemanticType::Float),
                Column::new("longitude", SemanticType::Float),
            ],
        )
    }

    fn near(distance_km: Option<f64>) -> ParameterSet {
        ParameterSet {
            near: Some(NearParams {
                origin: GeoPoint::new(40.0, -73.0),
                distance_km,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_radius_and_ordering_override() {
        let entity = stores();
        let config = TranslatorConfig::default();
        let ctx = StageContext::new(&entity, &config);

        let mut plan = QueryPlan::new("stores");
        plan.order_by = vec![OrderBy::desc("name")];

        apply_geospatial(&mut plan, &near(None), &ctx).unwrap();

        assert_eq!(plan.order_by, vec![OrderBy::asc("distance")]);
        assert_eq!(
            plan.having_clauses,
            vec![Condition::new("distance", FilterOperator::Lt, json!(10.0))]
        );

        let computed = plan.computed("distance").unwrap();
        match &computed.expr {
            ComputedExpr::Distance {
                origin,
                lat_column,
                lng_column,
            } => {
                assert_eq!(*origin, GeoPoint::new(40.0, -73.0));
                assert_eq!(lat_column, "latitude");
                assert_eq!(lng_column, "longitude");
            }
            other => panic!("unexpected expression {:?}", other),
        }
    }

    #[test]
    fn test_explicit_radius() {
        let entity = stores();
        let config = TranslatorConfig::default();
        let ctx = StageContext::new(&entity, &config);
        let mut plan = QueryPlan::new("stores");

        apply_geospatial(&mut plan, &near(Some(2.5)), &ctx).unwrap();
        assert_eq!(plan.having_clauses[0].operand, json!(2.5));
    }

    #[test]
    fn test_missing_coordinate_columns() {
        let entity = EntitySchema::new("notes", vec![Column::new("id", SemanticType::Integer)]);
        let config = TranslatorConfig::default();
        let ctx = StageContext::new(&entity, &config);
        let mut plan = QueryPlan::new("notes");

        let err = apply_geospatial(&mut plan, &near(None), &ctx).unwrap_err();
        assert!(matches!(err, QueryError::UnknownColumn { ref column, .. } if column == "latitude"));
    }

    #[test]
    fn test_absent_is_noop() {
        let entity = stores();
        let config = TranslatorConfig::default();
        let ctx = StageContext::new(&entity, &config);
        let mut plan = QueryPlan::new("stores");
        plan.order_by = vec![OrderBy::asc("name")];

        apply_geospatial(&mut plan, &ParameterSet::default(), &ctx).unwrap();
        assert_eq!(plan.order_by, vec![OrderBy::asc("name")]);
        assert!(plan.extra_selects.is_empty());
    }
}
