//! Dependency registry subsystem.
//!
//! # Data Flow
//! ```text
//! host / config file
//!     → set(name, Strategy)        (binding.rs)
//!     → Registry slot per name     (registry.rs)
//!
//! get(name)          → cached singleton / value / fresh transient
//! make(name, params) → always fresh, cache untouched
//! call(params, f)    → f(&Resolver)  (params.rs)
//! ```
//!
//! # Design Decisions
//! - Values are `Arc<dyn Any + Send + Sync>`; typed access downcasts
//! - `get` and `make` differ only for singletons: identity is observable through `Arc::ptr_eq`

pub mod binding;
pub mod error;
pub mod params;
pub mod registry;

pub use binding::{Instance, Strategy, StrategyKind};
pub use error::{BoxError, ContainerError, ContainerResult};
pub use params::{Params, Resolver};
pub use registry::Registry;
