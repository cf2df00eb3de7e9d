//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / kernel / interceptor produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → stderr (pretty or JSON lines)
//!     → whatever recorder the host installs for metrics
//! ```
//!
//! # Design Decisions
//! - Log level configurable via config and `RUST_LOG`
//! - No exporter is bundled; counters are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
