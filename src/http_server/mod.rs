//! # HTTP Server
//!
//! # Endpoints
//!
//! - `GET /api/:entity` - translate the query string, execute, return one page
//! - `GET /health` - health check
//! - `GET /metrics` - counters as JSON

pub mod config;
pub mod observability_routes;
pub mod query_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use query_routes::AppState;
pub use server::{HttpServer, REQUEST_ID_HEADER};
