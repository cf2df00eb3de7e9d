//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Construction (kernel.rs):
//!     Resolve config → Claim the process-wide slot → Bind → Register interceptor
//!
//! Startup (action.rs):
//!     run() → run actions in insertion order → first failure aborts
//!
//! Shutdown (shutdown.rs):
//!     terminate() / exit check / signal → guard flips once → terminate actions
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → exit check → process exit
//! ```
//!
//! # Design Decisions
//! - Startup is explicit: nothing runs until the host calls `run()`
//! - Shutdown is exactly-once; the guard never rolls back
//! - Named dispatch goes through per-type method tables (methods.rs)

pub mod action;
pub mod error;
pub mod kernel;
pub mod methods;
pub mod shutdown;
pub mod signals;

pub use action::{Action, ActionDescriptor, ActionList, Callable, DIRECT_CALL, NAMED_DISPATCH};
pub use error::{KernelError, KernelResult, Phase};
pub use kernel::{Kernel, KernelBuilder, KERNEL_ALIAS, KERNEL_BINDING};
pub use methods::{DispatchError, MethodTable};
pub use shutdown::Shutdown;
