//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <base>/config/kernel.toml (or a config passed to the builder)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → KernelConfig (validated, immutable)
//!     → kernel construction: [parameters] become value bindings,
//!       [[run]] / [[terminate]] become actions
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_optional, ConfigError, CONFIG_FILE_NAME};
pub use schema::{FailureConfig, KernelConfig, ObservabilityConfig};
pub use validation::{validate_config, ValidationError};
