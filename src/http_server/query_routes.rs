//! Entity listing routes
//!
//! `GET /api/:entity?filter[price][gt]=10&sort=name:asc&page=2`

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::executor::{ExecutorError, PlanExecutor};
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::query::{Page, QueryError, QueryResult, RawParams, Translator};

/// State shared by every handler
pub struct AppState {
    pub translator: Translator,
    pub executor: Arc<dyn PlanExecutor>,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    /// Wires the translator to the shared metrics registry
    pub fn new(translator: Translator, executor: Arc<dyn PlanExecutor>) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        Self {
            translator: translator.with_metrics(metrics.clone()),
            executor,
            metrics,
        }
    }
}

pub fn query_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:entity", get(list_handler))
}

async fn list_handler(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> QueryResult<Json<Page<Value>>> {
    let Query(pairs) = query.map_err(|rejection| QueryError::invalid("query", rejection.body_text()))?;
    let raw = RawParams::from_pairs(pairs)?;

    let (plan, params) = state.translator.translate_raw(&entity, &raw)?;

    let page = state
        .executor
        .execute(&plan, &params.page)
        .map_err(|err| execution_error(&state, &entity, err))?;

    Ok(Json(page))
}

/// Maps executor failures, logging details that never reach the client
fn execution_error(state: &AppState, entity: &str, err: ExecutorError) -> QueryError {
    if matches!(err, ExecutorError::Internal(_) | ExecutorError::DataLoad { .. }) {
        state.metrics.increment_executions_failed();
        Logger::error(
            Event::ExecutionFailed.as_str(),
            &[("entity", entity), ("code", err.code()), ("detail", &err.to_string())],
        );
    }
    err.into()
}
