//! CLI command implementations
//!
//! Boot order for `serve`:
//! 1. Configuration load
//! 2. Schema catalog load
//! 3. Seed data load
//! 4. HTTP activation

use std::path::Path;
use std::sync::Arc;

use axum::extract::Query;
use axum::http::Uri;
use serde_json::{json, Value};

use crate::executor::InMemoryStore;
use crate::http_server::{AppState, HttpServer};
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::query::{QueryError, RawParams, SqlRenderer, Translator};
use crate::schema::{SchemaCatalog, SchemaInfo};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{read_request, write_error, write_response};

/// Main CLI entry point. This is the only function main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Plan { config } => plan(&config),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Everything a command needs after boot
struct Booted {
    config: Config,
    schema: Arc<SchemaCatalog>,
    store: InMemoryStore,
}

fn boot(config_path: &Path) -> CliResult<Booted> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &config_path.display().to_string())],
    );

    let schema = Arc::new(SchemaCatalog::load(&config.schema_path)?);
    log_event_with_fields(
        Event::SchemasLoaded,
        &[("entities", &schema.len().to_string())],
    );

    let shared: Arc<dyn SchemaInfo> = schema.clone();
    let store = match &config.data_path {
        Some(path) => InMemoryStore::load(path, shared)?,
        None => InMemoryStore::new(shared),
    };
    let rows: usize = schema
        .entity_names()
        .iter()
        .map(|name| store.row_count(name))
        .sum();
    log_event_with_fields(Event::DataLoaded, &[("rows", &rows.to_string())]);

    Ok(Booted {
        config,
        schema,
        store,
    })
}

/// Starts the HTTP server and blocks until shutdown
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    log_event(Event::BootStart);

    let booted = boot(config_path).inspect_err(|e| {
        Logger::fatal(
            Event::BootFailed.as_str(),
            &[("code", e.code_str()), ("message", e.message())],
        );
    })?;

    let mut server_config = booted.config.server.clone();
    if let Some(port) = port {
        server_config.port = port;
    }

    let translator = Translator::new(booted.schema.clone(), booted.config.translator.clone());
    let state = AppState::new(translator, Arc::new(booted.store));
    let server = HttpServer::new(server_config, state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Reads `{"entity", "query"}` or `{"entity", "params"}` from stdin and
/// prints the plan with its rendered SQL.
pub fn plan(config_path: &Path) -> CliResult<()> {
    let booted = boot(config_path)?;
    let translator = Translator::new(booted.schema, booted.config.translator);

    let request = read_request()?;
    let entity = request
        .get("entity")
        .and_then(Value::as_str)
        .ok_or_else(|| CliError::io_error("request must carry a string 'entity'"))?;
    let raw = raw_params(&request)?;

    match translator.translate_raw(entity, &raw) {
        Ok((plan, params)) => write_response(json!({
            "plan": plan,
            "page": params.page,
            "sql": {
                "select": SqlRenderer::select(&plan, &params.page),
                "count": SqlRenderer::count(&plan),
            }
        })),
        Err(err) => {
            write_error(CliErrorCode::QueryRejected.code(), &err.to_string())?;
            Err(err.into())
        }
    }
}

/// Loads everything `serve` would, reports what was found, and exits
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let booted = boot(config_path)?;

    let entities: Vec<Value> = booted
        .schema
        .entity_names()
        .into_iter()
        .map(|name| json!({"name": name, "rows": booted.store.row_count(name)}))
        .collect();

    write_response(json!({
        "valid": true,
        "listen": booted.config.server.socket_addr(),
        "entities": entities,
    }))
}

/// Builds raw parameters from a URL-encoded `query` string or a `params` object
pub fn raw_params(request: &Value) -> CliResult<RawParams> {
    if let Some(params) = request.get("params") {
        return Ok(RawParams::from_json(params)?);
    }

    let query = match request.get("query") {
        None => return Ok(RawParams::new()),
        Some(Value::String(query)) => query.trim_start_matches('?'),
        Some(_) => return Err(CliError::io_error("'query' must be a string")),
    };

    let uri: Uri = format!("/?{}", query)
        .parse()
        .map_err(|e| CliError::io_error(format!("'query' is not a valid query string: {}", e)))?;
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&uri)
        .map_err(|e| QueryError::invalid("query", e.body_text()))?;

    Ok(RawParams::from_pairs(pairs)?)
}
