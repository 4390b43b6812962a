//! Observability subsystem for aeroquery
//!
//! Structured JSON event logging for the query lifecycle.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. Logging never fails an operation
//!
//! # Usage
//!
//! ```ignore
//! use aeroquery::observability::{log_event, Event, Timer};
//!
//! let timer = Timer::new();
//! // ... run the query ...
//! log_event(Event::QueryExecuted, &[("duration_ms", timer.elapsed_ms().as_str())]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// A duration timer for logging elapsed time
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
