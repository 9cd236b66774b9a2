//! Query plan structures
//!
//! A [`QueryPlan`] is the storage-agnostic result of translating one request.
//! It is created empty, mutated by each stage in turn, handed to an executor
//! and then dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::filter::Condition;

/// Mean Earth radius used by the haversine distance, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Alias of the computed haversine column
pub const DISTANCE_ALIAS: &str = "distance";

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Parses `asc` / `desc`, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One ORDER BY entry. `expr` is a column or a computed column alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expr: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A clause of the top-level conjunction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WhereClause {
    /// `field <op> ?`
    Compare(Condition),
    /// `field BETWEEN ? AND ?`, both bounds inclusive
    Between { field: String, low: Value, high: Value },
}

/// Allow-listed aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    /// Parses an aggregate name, case-insensitively. Anything outside the
    /// allow-list is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "count" => Some(AggregateFunction::Count),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
        }
    }
}

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in kilometres (spherical law of cosines form of haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lng1) = (self.lat.to_radians(), self.lng.to_radians());
        let (lat2, lng2) = (other.lat.to_radians(), other.lng.to_radians());

        let cosine = lat1.cos() * lat2.cos() * (lng2 - lng1).cos() + lat1.sin() * lat2.sin();
        // rounding can push identical points just past 1.0
        EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos()
    }
}

/// Expression behind a computed column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputedExpr {
    /// `function(field)`
    Aggregate {
        function: AggregateFunction,
        field: String,
    },
    /// Haversine distance from `origin` to each row's coordinates
    Distance {
        origin: GeoPoint,
        lat_column: String,
        lng_column: String,
    },
}

/// A computed column added to the projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedColumn {
    pub alias: String,
    pub expr: ComputedExpr,
}

impl ComputedColumn {
    /// `function(field) AS function_field`
    pub fn aggregate(function: AggregateFunction, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            alias: format!("{}_{}", function.as_str(), field),
            expr: ComputedExpr::Aggregate { function, field },
        }
    }

    pub fn distance(
        origin: GeoPoint,
        lat_column: impl Into<String>,
        lng_column: impl Into<String>,
    ) -> Self {
        Self {
            alias: DISTANCE_ALIAS.to_string(),
            expr: ComputedExpr::Distance {
                origin,
                lat_column: lat_column.into(),
                lng_column: lng_column.into(),
            },
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.expr, ComputedExpr::Aggregate { .. })
    }
}

/// The accumulated query for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    /// Primary entity (table)
    pub entity: String,

    /// Explicit projection. `None` keeps the storage default (all columns).
    pub selected_columns: Option<Vec<String>>,

    /// Conditions combined with AND
    pub where_clauses: Vec<WhereClause>,

    /// Each group is OR'd internally and AND'd with everything else.
    /// An empty group matches nothing.
    pub or_groups: Vec<Vec<Condition>>,

    /// Ordering, highest priority first
    pub order_by: Vec<OrderBy>,

    /// Relations to eager load, deduplicated, in request order
    pub eager_load: Vec<String>,

    /// Computed columns appended to the projection
    pub extra_selects: Vec<ComputedColumn>,

    /// Conditions on computed columns
    pub having_clauses: Vec<Condition>,
}

impl QueryPlan {
    /// Creates an empty plan for an entity
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            selected_columns: None,
            where_clauses: Vec::new(),
            or_groups: Vec::new(),
            order_by: Vec::new(),
            eager_load: Vec::new(),
            extra_selects: Vec::new(),
            having_clauses: Vec::new(),
        }
    }

    /// True when the plan carries any aggregate column
    pub fn has_aggregates(&self) -> bool {
        self.extra_selects.iter().any(ComputedColumn::is_aggregate)
    }

    pub fn computed(&self, alias: &str) -> Option<&ComputedColumn> {
        self.extra_selects.iter().find(|c| c.alias == alias)
    }

    /// Adds a relation unless it is already present
    pub fn add_eager_load(&mut self, relation: impl Into<String>) {
        let relation = relation.into();
        if !self.eager_load.contains(&relation) {
            self.eager_load.push(relation);
        }
    }

    /// Adds a computed column unless one with the same alias exists.
    /// Returns whether it was added.
    pub fn add_extra_select(&mut self, column: ComputedColumn) -> bool {
        if self.computed(&column.alias).is_some() {
            return false;
        }
        self.extra_selects.push(column);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("up"), None);
        assert_eq!(SortDirection::parse(""), None);
    }

    #[test]
    fn test_aggregate_allow_list() {
        assert_eq!(AggregateFunction::parse("SUM"), Some(AggregateFunction::Sum));
        assert_eq!(AggregateFunction::parse("sleep"), None);
        assert_eq!(AggregateFunction::parse("sum(price);--"), None);
    }

    #[test]
    fn test_aggregate_alias() {
        let col = ComputedColumn::aggregate(AggregateFunction::Avg, "price");
        assert_eq!(col.alias, "avg_price");
        assert!(col.is_aggregate());
    }

    #[test]
    fn test_distance_known_points() {
        // New York City to Philadelphia is roughly 130 km
        let nyc = GeoPoint::new(40.7128, -74.0060);
        let philly = GeoPoint::new(39.9526, -75.1652);
        let d = nyc.distance_km(&philly);
        assert!((d - 129.6).abs() < 1.5, "got {}", d);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(51.5074, -0.1278);
        assert!(p.distance_km(&p) < 1e-6);
    }

    #[test]
    fn test_eager_load_dedup() {
        let mut plan = QueryPlan::new("products");
        plan.add_eager_load("category");
        plan.add_eager_load("reviews");
        plan.add_eager_load("category");
        assert_eq!(plan.eager_load, vec!["category", "reviews"]);
    }

    #[test]
    fn test_extra_select_dedup() {
        let mut plan = QueryPlan::new("products");
        assert!(plan.add_extra_select(ComputedColumn::aggregate(AggregateFunction::Sum, "price")));
        assert!(!plan.add_extra_select(ComputedColumn::aggregate(AggregateFunction::Sum, "price")));
        assert_eq!(plan.extra_selects.len(), 1);
    }
}
