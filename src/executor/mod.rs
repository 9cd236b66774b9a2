//! Plan execution
//!
//! The translator never touches storage. An executor consumes a finished
//! [`QueryPlan`] and returns one page of rows with totals.
//!
//! [`InMemoryStore`] evaluates plans over JSON rows; a SQL-backed executor
//! would render the plan with [`crate::query::SqlRenderer`] instead.

mod aggregate;
mod errors;
mod filters;
mod memory;
mod sorter;

pub use aggregate::{aggregate, collapse};
pub use errors::{ExecutorError, ExecutorResult};
pub use filters::{like_match, ConditionFilter};
pub use memory::InMemoryStore;
pub use sorter::ResultSorter;

use serde_json::Value;

use crate::query::{Page, PageRequest, QueryPlan};

/// Runs a finished plan against storage
pub trait PlanExecutor: Send + Sync {
    fn execute(&self, plan: &QueryPlan, page: &PageRequest) -> ExecutorResult<Page<Value>>;
}
