//! Logging utilities for gcmtools.
//!
//! Status lines carry a category (`STAT`, `INFO`, `WARN`, `ERROR`, `E-INFO`)
//! as a structured field so that a session log can be filtered by the kind of
//! message as well as by level. Logging never influences control flow.

use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Category of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Start of a processing step
    Stat,
    /// Details about the current step
    Info,
    /// Something suspicious but recoverable
    Warn,
    /// A failed requirement
    Error,
    /// Detail attached to an error
    ErrorInfo,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Stat => "STAT",
            Status::Info => "INFO",
            Status::Warn => "WARN",
            Status::Error => "ERROR",
            Status::ErrorInfo => "E-INFO",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialize the tracing subscriber with the given log level
pub fn init_tracing(log_level: &str) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(val) => val,
        Err(_) => log_level.to_string(),
    };

    // A second init (tests, embedding applications) is not an error.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Write a categorized status line
pub fn write_status(status: Status, message: &str) {
    let category = status.as_str();
    match status {
        Status::Stat | Status::Info => info!(category = category, "{}", message),
        Status::Warn => warn!(category = category, "{}", message),
        Status::Error | Status::ErrorInfo => error!(category = category, "{}", message),
    }
}

/// Write the session banner
pub fn write_banner(title: &str) {
    let line = "=".repeat(60);
    info!("{}", line);
    info!("{:^60}", title);
    info!("{}", line);
}

/// Log a start message for a significant operation
pub fn log_operation_start(operation: &str, details: Option<&str>) {
    if let Some(details) = details {
        info!(
            category = Status::Stat.as_str(),
            operation = operation,
            details = details,
            "Starting operation"
        );
    } else {
        info!(
            category = Status::Stat.as_str(),
            operation = operation,
            "Starting operation"
        );
    }
}

/// Log the completion of a significant operation
pub fn log_operation_end(operation: &str, start_time: Instant, success: bool) {
    let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    if success {
        info!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed successfully"
        );
    } else {
        warn!(
            operation = operation,
            duration_ms = duration_ms,
            "Operation completed with warnings"
        );
    }
}

/// Log an operation with timing and result in a single statement
pub fn log_timed_operation<F, R>(operation: &str, f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    debug!(operation = operation, "Starting operation");

    let result = f();

    debug!(
        operation = operation,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Operation completed"
    );

    result
}

/// Log detailed information about a dataset that was just loaded
pub fn log_data_load_stats(
    tag: &str,
    source: &str,
    var_names: &[&str],
    dim_details: &str,
    time_steps: usize,
) {
    info!(
        category = Status::Info.as_str(),
        operation = "data_load",
        tag = tag,
        source = source,
        var_count = var_names.len(),
        vars = %var_names.join(", "),
        dims = dim_details,
        time_steps = time_steps,
        "Data loaded successfully"
    );
}

/// Log an error with context
pub fn log_error(error: &crate::error::GcmError, context: &str) {
    error!(
        category = Status::Error.as_str(),
        error = %error,
        context = context,
        "Error occurred"
    );
}
