//! Application Kernel Library
//!
//! A reusable process bootstrap: a named-dependency registry, ordered
//! startup/shutdown actions with exactly-once termination, and a
//! process-wide failure interceptor that turns panics, escaped errors and
//! fatal conditions into one render/report/exit sequence.
//!
//! ```text
//! host main()
//!     → Kernel::builder()...build()      (lifecycle)
//!     → set / add_run / add_terminate    (container, lifecycle)
//!     → kernel.supervise(|| { run()?; ... })   (failure)
//!           Ok           → exit check → terminate() → exit 0
//!           Err / panic  → render + report        → exit 1
//!     (dropping the kernel without exiting runs the exit check)
//! ```

pub mod config;
pub mod container;
pub mod failure;
pub mod lifecycle;
pub mod observability;
pub mod paths;

pub use config::KernelConfig;
pub use container::{BoxError, ContainerError, Params, Registry, Resolver, Strategy};
pub use failure::{Condition, FailureInterceptor, NormalizedError, Severity};
pub use lifecycle::{Action, ActionDescriptor, Kernel, KernelBuilder, KernelError};
pub use paths::Paths;
