//! # Query Parameter Decoding
//!
//! Turns flat `key=value` pairs (bracket notation for nested maps, e.g.
//! `filter[price][gt]=10`) into a [`ParameterSet`]. Decoding checks the
//! shape and type of every recognized parameter; schema checks are left to
//! the stages.

use std::num::IntErrorKind;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::observability::{Event, Logger};
use crate::schema::SemanticType;

use super::config::TranslatorConfig;
use super::errors::{QueryError, QueryResult};
use super::filter::FilterSpec;
use super::identifier::{self, split_list};
use super::pagination::PageRequest;
use super::plan::{AggregateFunction, GeoPoint, SortDirection};

/// Parameter names with a defined meaning. Anything else is ignored.
pub const RECOGNIZED_PARAMS: &[&str] = &[
    "fields",
    "filter",
    "search",
    "search_fields",
    "sort",
    "include",
    "aggregate",
    "start_date",
    "end_date",
    "near",
    "page",
    "per_page",
];

// =============================================================================
// Raw parameter tree
// =============================================================================

/// A raw parameter value: a scalar, or a map built from bracketed keys
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(String),
    /// Ordered entries. `key[]=v` entries have an empty name.
    Map(Vec<(String, ParamValue)>),
}

impl ParamValue {
    /// Expects a single value
    pub fn as_scalar(&self, param: &str) -> QueryResult<&str> {
        match self {
            ParamValue::Scalar(s) => Ok(s),
            ParamValue::Map(_) => Err(QueryError::invalid(param, "expected a single value")),
        }
    }

    /// Expects a map, e.g. `filter[field]=value`
    pub fn as_map(&self, param: &str) -> QueryResult<&[(String, ParamValue)]> {
        match self {
            ParamValue::Map(entries) => Ok(entries),
            ParamValue::Scalar(_) => Err(QueryError::invalid(
                param,
                format!("expected keyed values, e.g. {}[key]=value", param),
            )),
        }
    }

    /// Accepts `a,b,c` as well as `key[]=a&key[]=b,c`
    pub fn as_list(&self, param: &str) -> QueryResult<Vec<String>> {
        match self {
            ParamValue::Scalar(s) => Ok(split_list(s).into_iter().map(str::to_string).collect()),
            ParamValue::Map(entries) => {
                let mut items = Vec::new();
                for (_, value) in entries {
                    let s = value.as_scalar(param)?;
                    items.extend(split_list(s).into_iter().map(str::to_string));
                }
                Ok(items)
            }
        }
    }
}

/// The undecoded parameters of one request, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParams {
    entries: Vec<(String, ParamValue)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the tree from already percent-decoded `(key, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut raw = Self::new();
        for (key, value) in pairs {
            raw.insert(key.as_ref(), value.into())?;
        }
        Ok(raw)
    }

    /// Builds the tree from a JSON object (`{"filter": {"price": {"gt": 10}}}`)
    pub fn from_json(value: &Value) -> QueryResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| QueryError::invalid("params", "expected a JSON object"))?;

        let entries = object
            .iter()
            .map(|(k, v)| (k.clone(), json_to_param(v)))
            .collect();
        Ok(Self { entries })
    }

    /// Inserts one flat pair. Later scalars replace earlier ones; a key used
    /// both as a scalar and as a map is rejected.
    pub fn insert(&mut self, key: &str, value: String) -> QueryResult<()> {
        let (base, segments) = split_key(key).ok_or_else(|| {
            QueryError::invalid(
                key.split('[').next().unwrap_or(key),
                format!("malformed parameter name '{}'", key),
            )
        })?;

        let mut path = Vec::with_capacity(segments.len() + 1);
        path.push(base);
        path.extend(segments);

        insert_path(&mut self.entries, &path, value, base)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits `filter[price][gt]` into `("filter", ["price", "gt"])`
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let Some(open) = key.find('[') else {
        return Some((key, Vec::new()));
    };

    let base = &key[..open];
    if base.is_empty() {
        return None;
    }

    let mut segments = Vec::new();
    let mut rest = &key[open..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    Some((base, segments))
}

fn insert_path(
    entries: &mut Vec<(String, ParamValue)>,
    path: &[&str],
    value: String,
    base: &str,
) -> QueryResult<()> {
    let Some((head, tail)) = path.split_first() else {
        return Ok(());
    };
    let conflict = || QueryError::invalid(base, "mixes a plain value with keyed values");

    if tail.is_empty() {
        if !head.is_empty() {
            if let Some((_, existing)) = entries.iter_mut().find(|(k, _)| k == head) {
                return match existing {
                    ParamValue::Scalar(s) => {
                        *s = value;
                        Ok(())
                    }
                    ParamValue::Map(_) => Err(conflict()),
                };
            }
        }
        entries.push((head.to_string(), ParamValue::Scalar(value)));
        return Ok(());
    }

    // `key[]` always opens a fresh element
    let position = if head.is_empty() {
        None
    } else {
        entries.iter().position(|(k, _)| k == head)
    };

    let index = match position {
        Some(i) => i,
        None => {
            entries.push((head.to_string(), ParamValue::Map(Vec::new())));
            entries.len() - 1
        }
    };

    match &mut entries[index].1 {
        ParamValue::Map(children) => insert_path(children, tail, value, base),
        ParamValue::Scalar(_) => Err(conflict()),
    }
}

fn json_to_param(value: &Value) -> ParamValue {
    match value {
        Value::Object(map) => ParamValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_param(v)))
                .collect(),
        ),
        Value::Array(items) => ParamValue::Map(
            items
                .iter()
                .map(|v| (String::new(), json_to_param(v)))
                .collect(),
        ),
        Value::String(s) => ParamValue::Scalar(s.clone()),
        Value::Null => ParamValue::Scalar("null".to_string()),
        other => ParamValue::Scalar(other.to_string()),
    }
}

// =============================================================================
// Typed parameter set
// =============================================================================

/// Which columns free-text search covers
#[derive(Debug, Clone, PartialEq)]
pub enum SearchFields {
    /// Every string/text column of the entity
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub term: String,
    pub fields: SearchFields,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    pub function: AggregateFunction,
    pub field: String,
}

/// Inclusive time window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearParams {
    pub origin: GeoPoint,
    /// `None` means the configured default radius
    pub distance_km: Option<f64>,
}

/// The validated, typed view of the recognized query parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    pub fields: Option<Vec<String>>,
    pub filters: Vec<(String, FilterSpec)>,
    pub search: Option<SearchParams>,
    pub sort: Vec<SortKey>,
    pub includes: Vec<String>,
    pub aggregates: Vec<AggregateRequest>,
    pub time_range: Option<TimeRange>,
    pub near: Option<NearParams>,
    pub page: PageRequest,
}

impl ParameterSet {
    /// Decodes and validates raw parameters
    pub fn decode(raw: &RawParams, config: &TranslatorConfig) -> QueryResult<Self> {
        for key in raw.keys() {
            if !RECOGNIZED_PARAMS.contains(&key) {
                Logger::trace(Event::ParameterIgnored.as_str(), &[("param", key)]);
            }
        }

        Ok(Self {
            fields: decode_fields(raw)?,
            filters: decode_filters(raw)?,
            search: decode_search(raw)?,
            sort: decode_sort(raw)?,
            includes: decode_includes(raw)?,
            aggregates: decode_aggregates(raw)?,
            time_range: decode_time_range(raw)?,
            near: decode_near(raw)?,
            page: decode_page(raw, config)?,
        })
    }
}

fn decode_fields(raw: &RawParams) -> QueryResult<Option<Vec<String>>> {
    let Some(value) = raw.get("fields") else {
        return Ok(None);
    };

    let names = value.as_list("fields")?;
    if names.len() == 1 && names[0] == "*" {
        return Ok(None);
    }
    if names.is_empty() {
        return Err(QueryError::invalid("fields", "must name at least one column"));
    }

    names
        .iter()
        .map(|name| identifier::column("fields", name))
        .collect::<QueryResult<Vec<_>>>()
        .map(Some)
}

fn decode_filters(raw: &RawParams) -> QueryResult<Vec<(String, FilterSpec)>> {
    let Some(value) = raw.get("filter") else {
        return Ok(Vec::new());
    };

    let mut filters = Vec::new();
    for (field, spec) in value.as_map("filter")? {
        let field = identifier::column("filter", field)?;
        let spec = match spec {
            ParamValue::Scalar(s) => FilterSpec::Literal(s.clone()),
            ParamValue::Map(ops) => {
                let mut operators = Vec::with_capacity(ops.len());
                for (op, operand) in ops {
                    let operand = operand.as_scalar("filter")?;
                    operators.push((op.clone(), operand.to_string()));
                }
                FilterSpec::Operators(operators)
            }
        };
        filters.push((field, spec));
    }
    Ok(filters)
}

fn decode_search(raw: &RawParams) -> QueryResult<Option<SearchParams>> {
    let term = match raw.get("search") {
        Some(value) => value.as_scalar("search")?.trim(),
        None => return Ok(None),
    };
    if term.is_empty() {
        return Ok(None);
    }

    let fields = match raw.get("search_fields") {
        None => SearchFields::All,
        Some(value) => {
            let names = value.as_list("search_fields")?;
            if names.is_empty() || (names.len() == 1 && names[0] == "*") {
                SearchFields::All
            } else {
                SearchFields::Columns(
                    names
                        .iter()
                        .map(|name| identifier::column("search_fields", name))
                        .collect::<QueryResult<Vec<_>>>()?,
                )
            }
        }
    };

    Ok(Some(SearchParams {
        term: term.to_string(),
        fields,
    }))
}

fn decode_sort(raw: &RawParams) -> QueryResult<Vec<SortKey>> {
    let Some(value) = raw.get("sort") else {
        return Ok(Vec::new());
    };

    let mut keys = Vec::new();
    for token in value.as_list("sort")? {
        let (field, direction) = token.split_once(':').ok_or_else(|| {
            QueryError::invalid(
                "sort",
                format!("'{}' must be written as field:direction", token),
            )
        })?;

        let direction = SortDirection::parse(direction.trim()).ok_or_else(|| {
            QueryError::invalid(
                "sort",
                format!("invalid direction '{}', expected asc or desc", direction.trim()),
            )
        })?;

        keys.push(SortKey {
            field: identifier::column("sort", field.trim())?,
            direction,
        });
    }
    Ok(keys)
}

fn decode_includes(raw: &RawParams) -> QueryResult<Vec<String>> {
    let Some(value) = raw.get("include") else {
        return Ok(Vec::new());
    };

    let mut relations: Vec<String> = Vec::new();
    for name in value.as_list("include")? {
        let relation = identifier::relation("include", &name)?;
        if !relations.contains(&relation) {
            relations.push(relation);
        }
    }
    Ok(relations)
}

fn decode_aggregates(raw: &RawParams) -> QueryResult<Vec<AggregateRequest>> {
    let Some(value) = raw.get("aggregate") else {
        return Ok(Vec::new());
    };

    let mut aggregates: Vec<AggregateRequest> = Vec::new();
    for (function_name, fields) in value.as_map("aggregate")? {
        let function = AggregateFunction::parse(function_name).ok_or_else(|| {
            QueryError::invalid(
                "aggregate",
                format!(
                    "unsupported function '{}', expected one of sum, avg, min, max, count",
                    function_name
                ),
            )
        })?;

        for field in fields.as_list("aggregate")? {
            let request = AggregateRequest {
                function,
                field: identifier::column("aggregate", &field)?,
            };
            if !aggregates.contains(&request) {
                aggregates.push(request);
            }
        }
    }
    Ok(aggregates)
}

fn decode_time_range(raw: &RawParams) -> QueryResult<Option<TimeRange>> {
    let start = raw
        .get("start_date")
        .map(|v| v.as_scalar("start_date"))
        .transpose()?;
    let end = raw
        .get("end_date")
        .map(|v| v.as_scalar("end_date"))
        .transpose()?;

    match (start, end) {
        (None, None) => Ok(None),
        (Some(_), None) => Err(QueryError::invalid(
            "end_date",
            "is required when start_date is present",
        )),
        (None, Some(_)) => Err(QueryError::invalid(
            "start_date",
            "is required when end_date is present",
        )),
        (Some(start), Some(end)) => {
            let start = parse_datetime("start_date", start, false)?;
            let end = parse_datetime("end_date", end, true)?;
            if end < start {
                return Err(QueryError::invalid(
                    "end_date",
                    "must be a date after or equal to start_date",
                ));
            }
            Ok(Some(TimeRange { start, end }))
        }
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// RFC 3339. A bare end date covers the whole day.
pub fn parse_datetime(param: &str, value: &str, end_of_day: bool) -> QueryResult<NaiveDateTime> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let datetime = if end_of_day {
            date.and_hms_opt(23, 59, 59)
        } else {
            date.and_hms_opt(0, 0, 0)
        };
        if let Some(datetime) = datetime {
            return Ok(datetime);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(datetime);
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Ok(datetime.naive_utc());
    }

    Err(QueryError::invalid(
        param,
        format!("'{}' is not a valid date", value),
    ))
}

fn decode_near(raw: &RawParams) -> QueryResult<Option<NearParams>> {
    let Some(value) = raw.get("near") else {
        return Ok(None);
    };
    let entries = value.as_map("near")?;

    let lookup = |key: &str| -> QueryResult<Option<f64>> {
        let param = format!("near.{}", key);
        match entries.iter().find(|(k, _)| k == key) {
            None => Ok(None),
            Some((_, v)) => {
                let s = v.as_scalar(&param)?.trim();
                s.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(Some)
                    .ok_or_else(|| QueryError::invalid(param, "must be numeric"))
            }
        }
    };

    let lat = lookup("lat")?
        .ok_or_else(|| QueryError::invalid("near.lat", "is required when near is present"))?;
    let lng = lookup("lng")?
        .ok_or_else(|| QueryError::invalid("near.lng", "is required when near is present"))?;
    let distance_km = lookup("distance")?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(QueryError::invalid("near.lat", "must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(QueryError::invalid("near.lng", "must be between -180 and 180"));
    }
    if distance_km.is_some_and(|d| d < 0.0) {
        return Err(QueryError::invalid("near.distance", "must be at least 0"));
    }

    Ok(Some(NearParams {
        origin: GeoPoint::new(lat, lng),
        distance_km,
    }))
}

fn decode_page(raw: &RawParams, config: &TranslatorConfig) -> QueryResult<PageRequest> {
    let page = match raw.get("page") {
        None => 1,
        Some(value) => {
            let s = value.as_scalar("page")?.trim();
            let page = parse_saturating(s).ok_or_else(|| QueryError::invalid("page", "must be an integer"))?;
            if page < 1 {
                return Err(QueryError::invalid("page", "must be at least 1"));
            }
            u32::try_from(page).unwrap_or(u32::MAX)
        }
    };

    let per_page = match raw.get("per_page") {
        None => config.default_per_page,
        Some(value) => {
            let s = value.as_scalar("per_page")?.trim();
            let per_page = parse_saturating(s)
                .ok_or_else(|| QueryError::invalid("per_page", "must be an integer"))?;
            per_page.clamp(1, i64::from(config.max_per_page.max(1))) as u32
        }
    };

    Ok(PageRequest::new(page, per_page, config.max_per_page))
}

/// Integer parse where out-of-range digits saturate instead of failing
fn parse_saturating(s: &str) -> Option<i64> {
    match s.parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Coerces a filter operand against the column it targets. Numeric and
/// boolean columns get typed operands; every other column keeps the text as
/// sent, so `007` stays `"007"`. Without a known column the operand falls back
/// to [`coerce_scalar`].
pub fn coerce_operand(raw: &str, semantic_type: Option<SemanticType>) -> Value {
    if raw == "null" {
        return Value::Null;
    }

    match semantic_type {
        None => coerce_scalar(raw),
        Some(t) if t.is_numeric() => match coerce_scalar(raw) {
            number @ Value::Number(_) => number,
            _ => Value::String(raw.to_string()),
        },
        Some(SemanticType::Boolean) => match coerce_scalar(raw) {
            flag @ (Value::Bool(_) | Value::Number(_)) => flag,
            _ => Value::String(raw.to_string()),
        },
        Some(_) => Value::String(raw.to_string()),
    }
}

/// Coerces a filter operand: `null`, booleans, integers, floats, else string
pub fn coerce_scalar(value: &str) -> Value {
    if value == "null" {
        return Value::Null;
    }

    if value == "true" {
        return Value::Bool(true);
    }
    if value == "false" {
        return Value::Bool(false);
    }

    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = value.parse::<f64>() {
        if let Some(num) = serde_json::Number::from_f64(n) {
            return Value::Number(num);
        }
    }

    Value::String(value.to_string())
}
