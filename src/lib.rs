//! apiquery - translate flat HTTP query parameters into safe query plans
//!
//! `GET /products?filter[price][gt]=10&search=lamp&sort=price:desc` becomes a
//! [`query::QueryPlan`]: validated columns, bound operands, search groups,
//! ordering, eager loads, computed columns and pagination.

pub mod cli;
pub mod executor;
pub mod http_server;
pub mod observability;
pub mod query;
pub mod schema;
