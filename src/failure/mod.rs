//! Failure interception subsystem.
//!
//! # Data Flow
//! ```text
//! panic / Err escaping the host   ─┐
//! severe Condition                ─┼→ NormalizedError (error.rs)
//! fatal last condition at exit    ─┘      → FailureHandler::render  (handler.rs)
//!                                         → FailureHandler::report  (ErrorReporter binding)
//!                                         → exit(1)
//!
//! clean exit check → Kernel::terminate()
//! ```
//!
//! # Design Decisions
//! - Crash paths never run shutdown actions
//! - The panic hook only captures; panics the host catches are not failures
//! - Every path is testable through `Disposition`; only thin wrappers exit
//! - The memory reserve is released before anything else at exit time

pub mod error;
pub mod handler;
pub mod interceptor;
pub mod reserve;

pub use error::{Condition, FailureKind, NormalizedError, Severity};
pub use handler::{
    reporter_binding, ConsoleHandler, ErrorReporter, FailureHandler, JsonHandler, RenderFormat,
    TracingReporter,
};
pub use interceptor::{ConditionRoute, Disposition, FailureInterceptor, InterceptorState, NotHandled};
pub use reserve::MemoryReserve;
