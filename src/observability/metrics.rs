//! Metrics registry
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by the HTTP layer and the translator
///
/// Relaxed ordering is enough: counters are independent and read for
/// reporting only.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    plans_built: AtomicU64,
    plans_rejected: AtomicU64,
    executions_failed: AtomicU64,
    requests_served: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_plans_built(&self) {
        self.plans_built.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_executions_failed(&self) {
        self.executions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests_served(&self) {
        self.requests_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_built: self.plans_built.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            executions_failed: self.executions_failed.load(Ordering::Relaxed),
            requests_served: self.requests_served.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"{{"plans_built":{},"plans_rejected":{},"executions_failed":{},"requests_served":{}}}"#,
            s.plans_built, s.plans_rejected, s.executions_failed, s.requests_served,
        )
    }
}

/// A point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_built: u64,
    pub plans_rejected: u64,
    pub executions_failed: u64,
    pub requests_served: u64,
}
