//! Observable events
//!
//! Every log line names one of these.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Process startup begins
    BootStart,
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Schema catalog loaded
    SchemasLoaded,
    /// Seed rows loaded into the store
    DataLoaded,
    /// HTTP listener bound
    ServerListening,
    /// Server stopped
    ShutdownComplete,
    /// Startup could not complete
    BootFailed,

    // Requests
    /// One line per HTTP request
    RequestComplete,

    // Translation
    /// Unrecognized query parameter skipped
    ParameterIgnored,
    /// Filter operator outside the allow-list treated as `=`
    UnknownOperatorDefaulted,
    PlanBuilt,
    PlanRejected,

    // Execution
    ExecutionFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "BOOT_START",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasLoaded => "SCHEMAS_LOADED",
            Event::DataLoaded => "DATA_LOADED",
            Event::ServerListening => "SERVER_LISTENING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::BootFailed => "BOOT_FAILED",
            Event::RequestComplete => "REQUEST_COMPLETE",
            Event::ParameterIgnored => "PARAMETER_IGNORED",
            Event::UnknownOperatorDefaulted => "UNKNOWN_OPERATOR_DEFAULTED",
            Event::PlanBuilt => "PLAN_BUILT",
            Event::PlanRejected => "PLAN_REJECTED",
            Event::ExecutionFailed => "EXECUTION_FAILED",
        }
    }

    /// Returns true if the process cannot continue after this event
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::BootFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
