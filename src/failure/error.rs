//! Normalized failure representation.
//!
//! Every interception path (panic, escaped error, reported condition,
//! exit-time fatal check) produces exactly one [`NormalizedError`] before
//! any render/report/exit logic runs.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::fmt;
use std::panic::{Location, PanicHookInfo};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::BoxError;

thread_local! {
    static DESCRIBING: Cell<u32> = const { Cell::new(0) };
}

/// Classification of a normalized failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Recoverable,
    Fatal,
    OutOfMemory,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Recoverable => "recoverable",
            FailureKind::Fatal => "fatal",
            FailureKind::OutOfMemory => "out_of_memory",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a runtime condition reported to the interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Notice,
    Deprecated,
    Warning,
    Error,
    CoreError,
    Fatal,
    OutOfMemory,
}

impl Severity {
    /// Severe conditions are intercepted; the rest keep their default handling.
    pub fn is_severe(self) -> bool {
        !matches!(self, Severity::Notice | Severity::Deprecated | Severity::Warning)
    }

    /// Conditions that cannot be recovered from and are acted on at exit time.
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::CoreError | Severity::Fatal | Severity::OutOfMemory)
    }

    /// Failure kind a severe condition normalizes to.
    pub fn kind(self) -> FailureKind {
        match self {
            Severity::OutOfMemory => FailureKind::OutOfMemory,
            Severity::CoreError | Severity::Fatal => FailureKind::Fatal,
            _ => FailureKind::Recoverable,
        }
    }
}

/// A runtime condition as reported by the host or a platform adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub line: u32,
}

impl Condition {
    /// Condition located at the caller.
    #[track_caller]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self::at(severity, message, location.file(), location.line())
    }

    /// Condition with an explicit location.
    pub fn at(severity: Severity, message: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            severity,
            message: message.into(),
            file: file.into(),
            line,
        }
    }
}

/// The single error representation all interception paths converge on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct NormalizedError {
    pub message: String,
    pub source_file: String,
    pub line: u32,
    pub kind: FailureKind,
    #[source]
    pub cause: Option<BoxError>,
    /// Stack captured when the failure was normalized.
    pub stack: String,
}

impl NormalizedError {
    pub fn new(kind: FailureKind, message: impl Into<String>, source_file: impl Into<String>, line: u32) -> Self {
        Self {
            message: message.into(),
            source_file: source_file.into(),
            line,
            kind,
            cause: None,
            stack: Backtrace::force_capture().to_string(),
        }
    }

    /// Normalize an error that escaped the host program.
    ///
    /// The error's description is produced inside a describe scope so that
    /// conditions raised by its `Display` impl are not re-raised.
    #[track_caller]
    pub fn uncaught(error: impl Into<BoxError>) -> Self {
        let cause = error.into();
        let message = {
            let _scope = DescribeScope::enter();
            cause.to_string()
        };
        let location = Location::caller();
        let mut normalized = Self::new(FailureKind::Recoverable, message, location.file(), location.line());
        normalized.cause = Some(cause);
        normalized
    }

    /// Normalize a panic from inside the panic hook.
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let (file, line) = info
            .location()
            .map(|l| (l.file().to_string(), l.line()))
            .unwrap_or_else(|| ("<unknown>".to_string(), 0));
        Self::new(FailureKind::Recoverable, payload_message(info.payload()), file, line)
    }

    /// Normalize a panic payload caught by `catch_unwind`, located at the caller.
    #[track_caller]
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let location = Location::caller();
        Self::new(FailureKind::Recoverable, payload_message(payload), location.file(), location.line())
    }

    /// Normalize a reported condition.
    pub fn from_condition(condition: &Condition) -> Self {
        Self::new(
            condition.severity.kind(),
            condition.message.clone(),
            condition.file.clone(),
            condition.line,
        )
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Marks the current thread as producing an error description.
pub(crate) struct DescribeScope;

impl DescribeScope {
    pub(crate) fn enter() -> Self {
        DESCRIBING.with(|depth| depth.set(depth.get() + 1));
        DescribeScope
    }

    pub(crate) fn active() -> bool {
        DESCRIBING.with(|depth| depth.get() > 0)
    }
}

impl Drop for DescribeScope {
    fn drop(&mut self) {
        DESCRIBING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    use crate::container::ContainerError;

    #[test]
    fn test_severity_classification() {
        assert!(!Severity::Warning.is_severe());
        assert!(!Severity::Notice.is_severe());
        assert!(!Severity::Deprecated.is_severe());
        assert!(Severity::Error.is_severe());
        assert!(!Severity::Error.is_fatal());
        assert!(Severity::OutOfMemory.is_fatal());
        assert_eq!(Severity::CoreError.kind(), FailureKind::Fatal);
        assert_eq!(Severity::OutOfMemory.kind(), FailureKind::OutOfMemory);
    }

    #[test]
    fn test_uncaught_keeps_cause_and_location() {
        let err = NormalizedError::uncaught(ContainerError::NotFound("db".into()));
        assert_eq!(err.message, "no binding registered for [db]");
        assert_eq!(err.kind, FailureKind::Recoverable);
        assert!(err.source_file.ends_with("error.rs"));
        assert!(err.line > 0);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_condition() {
        let condition = Condition::at(Severity::OutOfMemory, "allocation of 4 GiB failed", "main.rs", 12);
        let err = NormalizedError::from_condition(&condition);
        assert_eq!(err.kind, FailureKind::OutOfMemory);
        assert_eq!(err.to_string(), "allocation of 4 GiB failed");
        assert_eq!((err.source_file.as_str(), err.line), ("main.rs", 12));
    }

    #[test]
    #[serial]
    fn test_from_payload() {
        let payload = std::panic::catch_unwind(|| panic!("worker {} died", 3)).unwrap_err();
        let err = NormalizedError::from_payload(payload.as_ref());
        assert_eq!(err.message, "worker 3 died");
        assert!(err.source_file.ends_with("error.rs"));

        let err = NormalizedError::from_payload(&42_u8);
        assert_eq!(err.message, "panic with non-string payload");
    }

    #[test]
    fn test_describe_scope_nests() {
        assert!(!DescribeScope::active());
        {
            let _outer = DescribeScope::enter();
            {
                let _inner = DescribeScope::enter();
                assert!(DescribeScope::active());
            }
            assert!(DescribeScope::active());
        }
        assert!(!DescribeScope::active());
    }
}
