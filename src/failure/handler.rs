//! Rendering and reporting of intercepted failures.
//!
//! # Responsibilities
//! - Render a diagnostic (message + stack) to the operational output
//! - Report the failure to an optional logging collaborator
//!
//! # Design Decisions
//! - Text output for humans, JSON output for log shippers
//! - A missing or mistyped collaborator is skipped silently

use std::io::{self, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::Strategy;
use crate::failure::error::{FailureKind, NormalizedError};

/// Logging collaborator consulted during the report step.
pub trait ErrorReporter: Send + Sync {
    fn error(&self, message: &str);
}

/// Registry binding for a reporter.
///
/// The interceptor resolves `Arc<dyn ErrorReporter>` under the configured
/// logger name, so reporters must be bound through this helper.
pub fn reporter_binding<R: ErrorReporter + 'static>(reporter: R) -> Strategy {
    Strategy::value(Arc::new(reporter) as Arc<dyn ErrorReporter>)
}

/// Reporter that forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn error(&self, message: &str) {
        tracing::error!(target: "app_kernel::report", "{}", message);
    }
}

/// Render/report strategy used by the interceptor.
pub trait FailureHandler: Send + Sync {
    /// Write the diagnostic for `error` to `out`.
    fn render(&self, error: &NormalizedError, out: &mut dyn Write) -> io::Result<()>;

    /// Hand `error` to the logging collaborator, if one is bound.
    fn report(&self, error: &NormalizedError, reporter: Option<&dyn ErrorReporter>) {
        if let Some(reporter) = reporter {
            reporter.error(&format!("message: {}", error.message));
        }
    }
}

/// Output format of the built-in handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    #[default]
    Text,
    Json,
}

impl RenderFormat {
    /// Built-in handler for this format.
    pub fn handler(self) -> Box<dyn FailureHandler> {
        match self {
            RenderFormat::Text => Box::new(ConsoleHandler),
            RenderFormat::Json => Box::new(JsonHandler),
        }
    }
}

/// Plain-text diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleHandler;

impl FailureHandler for ConsoleHandler {
    fn render(&self, error: &NormalizedError, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "***System error***")?;
        writeln!(out, "{}", error.message)?;
        writeln!(out)?;
        writeln!(out, "  kind: {}", error.kind)?;
        writeln!(out, "  at {}:{}", error.source_file, error.line)?;
        writeln!(out, "{}", error.stack)?;
        out.flush()
    }
}

/// Single-line JSON diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonHandler;

#[derive(Serialize)]
struct FailureRecord<'a> {
    level: &'static str,
    kind: FailureKind,
    message: &'a str,
    file: &'a str,
    line: u32,
    stack: Vec<&'a str>,
}

impl FailureHandler for JsonHandler {
    fn render(&self, error: &NormalizedError, out: &mut dyn Write) -> io::Result<()> {
        let record = FailureRecord {
            level: "error",
            kind: error.kind,
            message: &error.message,
            file: &error.source_file,
            line: error.line,
            stack: error.stack.lines().map(str::trim).collect(),
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        out.flush()
    }
}
