//! # Query Translation
//!
//! Turns flat HTTP query parameters into a [`QueryPlan`]:
//!
//! 1. [`RawParams`] rebuilds the bracket-notation tree
//! 2. [`ParameterSet::decode`] checks shapes and types
//! 3. [`Translator::translate`] runs the stages against the entity schema
//! 4. An executor or [`SqlRenderer`] consumes the plan
//!
//! Identifiers reach a plan only after passing the identifier allow-list and,
//! in strict mode, the schema column check. Operands are always values.

mod config;
mod errors;
mod filter;
mod geo;
mod identifier;
mod pagination;
mod params;
mod pipeline;
mod plan;
mod search;
mod sql;
mod stages;

pub use config::TranslatorConfig;
pub use errors::{ErrorBody, ErrorResponse, QueryError, QueryResult, GENERIC_FAILURE_MESSAGE};
pub use filter::{escape_like, Condition, FilterOperator, FilterSpec};
pub use geo::apply_geospatial;
pub use identifier::{is_column_name, is_relation_path};
pub use pagination::{Page, PageMeta, PageRequest};
pub use params::{
    coerce_operand, coerce_scalar, parse_datetime, AggregateRequest, NearParams, ParamValue, ParameterSet,
    RawParams, SearchFields, SearchParams, SortKey, TimeRange, RECOGNIZED_PARAMS,
};
pub use pipeline::Translator;
pub use plan::{
    AggregateFunction, ComputedColumn, ComputedExpr, GeoPoint, OrderBy, QueryPlan,
    SortDirection, WhereClause, DISTANCE_ALIAS, EARTH_RADIUS_KM,
};
pub use search::apply_search;
pub use sql::{SqlRenderer, SqlStatement};
pub use stages::{
    apply_aggregation, apply_field_selection, apply_filters, apply_includes, apply_sorting,
    apply_time_range, format_timestamp, Stage, StageContext,
};
