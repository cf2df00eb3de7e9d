//! Kernel counters.
//!
//! # Metrics
//! - `kernel_actions_total` (counter): executed actions by phase and outcome
//! - `kernel_failures_intercepted_total` (counter): interceptor-handled failures by kind
//! - `kernel_terminations_total` (counter): terminate sequences started

use crate::failure::FailureKind;
use crate::lifecycle::Phase;

/// Record one executed action.
pub fn record_action(phase: Phase, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::counter!("kernel_actions_total", "phase" => phase.as_str(), "outcome" => outcome)
        .increment(1);
}

/// Record a failure that reached the interceptor.
pub fn record_failure(kind: FailureKind) {
    ::metrics::counter!("kernel_failures_intercepted_total", "kind" => kind.as_str()).increment(1);
}

/// Record the start of a terminate sequence.
pub fn record_termination() {
    ::metrics::counter!("kernel_terminations_total").increment(1);
}
