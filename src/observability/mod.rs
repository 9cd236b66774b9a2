//! Observability
//!
//! - Structured logging (one JSON line per event)
//! - Typed lifecycle and request events
//! - Atomic counters exported at `/metrics`
//!
//! Observability is read-only: a failed log write never fails a request.
//!
//! ```ignore
//! use apiquery::observability::{Event, Logger, MetricsRegistry};
//!
//! Logger::info(Event::PlanBuilt.as_str(), &[("entity", "products")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_plans_built();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Logs a lifecycle event at INFO, or FATAL for fatal events
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    if event.is_fatal() {
        Logger::fatal(event.as_str(), fields);
    } else {
        Logger::info(event.as_str(), fields);
    }
}

pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::BootStart);
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/apiquery.json")]);
    }
}
