//! Translation pipeline
//!
//! Runs the stages in a fixed order over one owned plan. The order matters:
//! geospatial ordering must replace any explicit sort, so it runs last.

use std::sync::Arc;

use crate::observability::{Event, Logger, MetricsRegistry};
use crate::schema::SchemaInfo;

use super::config::TranslatorConfig;
use super::errors::{QueryError, QueryResult};
use super::geo::apply_geospatial;
use super::params::{ParameterSet, RawParams};
use super::plan::QueryPlan;
use super::search::apply_search;
use super::stages::{
    apply_aggregation, apply_field_selection, apply_filters, apply_includes, apply_sorting,
    apply_time_range, Stage, StageContext,
};

const STAGES: [(&str, Stage); 8] = [
    ("fields", apply_field_selection),
    ("filter", apply_filters),
    ("search", apply_search),
    ("sort", apply_sorting),
    ("include", apply_includes),
    ("aggregate", apply_aggregation),
    ("time_range", apply_time_range),
    ("near", apply_geospatial),
];

/// Turns parameter sets into query plans for one schema catalog
#[derive(Clone)]
pub struct Translator {
    schema: Arc<dyn SchemaInfo>,
    config: TranslatorConfig,
    metrics: Arc<MetricsRegistry>,
}

impl Translator {
    pub fn new(schema: Arc<dyn SchemaInfo>, config: TranslatorConfig) -> Self {
        Self {
            schema,
            config,
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Shares a metrics registry with the caller
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Builds the plan for `entity`. The first failing stage aborts.
    pub fn translate(&self, entity: &str, params: &ParameterSet) -> QueryResult<QueryPlan> {
        match self.run_stages(entity, params) {
            Ok(plan) => {
                self.metrics.increment_plans_built();
                Logger::info(
                    Event::PlanBuilt.as_str(),
                    &[
                        ("entity", entity),
                        ("where", &plan.where_clauses.len().to_string()),
                        ("or_groups", &plan.or_groups.len().to_string()),
                        ("computed", &plan.extra_selects.len().to_string()),
                    ],
                );
                Ok(plan)
            }
            Err(err) => {
                self.reject(entity, &err);
                Err(err)
            }
        }
    }

    /// Decodes raw parameters, then translates
    pub fn translate_raw(&self, entity: &str, raw: &RawParams) -> QueryResult<(QueryPlan, ParameterSet)> {
        let params = ParameterSet::decode(raw, &self.config).inspect_err(|err| {
            self.reject(entity, err);
        })?;
        let plan = self.translate(entity, &params)?;
        Ok((plan, params))
    }

    fn run_stages(&self, entity: &str, params: &ParameterSet) -> QueryResult<QueryPlan> {
        let schema = self
            .schema
            .entity(entity)
            .ok_or_else(|| QueryError::UnknownEntity(entity.to_string()))?;

        let ctx = StageContext::new(schema, &self.config);
        let mut plan = QueryPlan::new(entity);
        for (name, stage) in STAGES {
            stage(&mut plan, params, &ctx).inspect_err(|err| {
                Logger::trace(
                    Event::PlanRejected.as_str(),
                    &[("entity", entity), ("stage", name), ("error", &err.to_string())],
                );
            })?;
        }
        Ok(plan)
    }

    fn reject(&self, entity: &str, err: &QueryError) {
        self.metrics.increment_plans_rejected();
        Logger::info(
            Event::PlanRejected.as_str(),
            &[
                ("entity", entity),
                ("kind", err.kind()),
                ("parameter", err.parameter().unwrap_or("")),
            ],
        );
    }
}
