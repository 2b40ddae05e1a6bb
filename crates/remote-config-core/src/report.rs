//! Failure reporting
//!
//! Failures the client absorbs (cache outages, stale substitutions) and the
//! ones it surfaces are both handed to an [`ErrorReporter`] with structured
//! context, so a host application can route them to its own observability.

use serde_json::{Map, Value};
use tracing::error;

/// Structured fields attached to a report
pub type ReportContext = Map<String, Value>;

/// Receiver of failure events
pub trait ErrorReporter: Send + Sync {
    fn report(&self, message: &str, context: &ReportContext);
}

/// Reporter that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _message: &str, _context: &ReportContext) {}
}

/// Reporter that emits events as `tracing` errors
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, message: &str, context: &ReportContext) {
        let context = Value::Object(context.clone());
        error!(
            target: "remote_config::report",
            context = %context,
            "{}",
            message
        );
    }
}

/// Build a report context from field/value pairs
pub fn report_context<const N: usize>(fields: [(&str, Value); N]) -> ReportContext {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_context() {
        let context = report_context([
            ("client", json!("billing")),
            ("timeout", json!(3)),
        ]);

        assert_eq!(context.len(), 2);
        assert_eq!(context["client"], json!("billing"));
        assert_eq!(context["timeout"], json!(3));
    }

    #[test]
    fn test_reporters_accept_events() {
        let context = report_context([("error_message", json!("boom"))]);
        NoopReporter.report("ignored", &context);
        TracingReporter.report("logged", &context);
    }
}
