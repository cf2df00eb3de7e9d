//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (exit code non-zero, reserve bounded)
//! - Check action descriptors before any kernel state is touched
//! - Keep parameters away from the kernel's own binding names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KernelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the kernel

use std::fmt;

use crate::config::schema::KernelConfig;
use crate::lifecycle::{Action, ActionDescriptor, KERNEL_ALIAS, KERNEL_BINDING};

/// Upper bound for the memory reserve.
pub const MAX_MEMORY_RESERVE: usize = 64 * 1024 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &KernelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "must not be empty"));
    }

    let failure = &config.failure;
    if failure.logger_binding.trim().is_empty() {
        errors.push(ValidationError::new("failure.logger_binding", "must not be empty"));
    }
    if failure.exit_code == 0 {
        errors.push(ValidationError::new(
            "failure.exit_code",
            "must be non-zero",
        ));
    }
    if failure.memory_reserve_bytes > MAX_MEMORY_RESERVE {
        errors.push(ValidationError::new(
            "failure.memory_reserve_bytes",
            format!("must not exceed {} bytes", MAX_MEMORY_RESERVE),
        ));
    }

    for name in config.parameters.keys() {
        if name.trim().is_empty() {
            errors.push(ValidationError::new("parameters", "binding names must not be empty"));
        } else if name == KERNEL_BINDING || name == KERNEL_ALIAS {
            errors.push(ValidationError::new(
                format!("parameters.{}", name),
                "name is reserved for the kernel itself",
            ));
        }
    }

    validate_actions("run", &config.run, &mut errors);
    validate_actions("terminate", &config.terminate, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_actions(list: &str, descriptors: &[ActionDescriptor], errors: &mut Vec<ValidationError>) {
    for (position, descriptor) in descriptors.iter().enumerate() {
        let field = format!("{}[{}]", list, position);
        // Files cannot carry closures, so a DirectCall read from disk fails here.
        if let Err(e) = Action::try_from(descriptor.clone()) {
            errors.push(ValidationError::new(field, e.to_string()));
        }
    }
}
