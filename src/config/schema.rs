//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the kernel.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::failure::RenderFormat;
use crate::lifecycle::ActionDescriptor;

/// Root configuration for the kernel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Application name, used in log events.
    pub name: String,

    /// Failure interception settings.
    pub failure: FailureConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Values registered as bindings at construction.
    pub parameters: BTreeMap<String, toml::Value>,

    /// Startup actions, appended after construction.
    pub run: Vec<ActionDescriptor>,

    /// Shutdown actions, appended after construction.
    pub terminate: Vec<ActionDescriptor>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            failure: FailureConfig::default(),
            observability: ObservabilityConfig::default(),
            parameters: BTreeMap::new(),
            run: Vec::new(),
            terminate: Vec::new(),
        }
    }
}

/// Failure interception configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailureConfig {
    /// Route panics through the interceptor.
    pub install_panic_hook: bool,

    /// Size of the memory margin released at exit-check time.
    pub memory_reserve_bytes: usize,

    /// Binding name of the optional error reporter.
    pub logger_binding: String,

    /// Process exit status after an intercepted failure.
    pub exit_code: i32,

    /// Diagnostic format written to the operational output.
    pub render_format: RenderFormat,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            install_panic_hook: true,
            memory_reserve_bytes: 256 * 1024,
            logger_binding: "logger".to_string(),
            exit_code: 1,
            render_format: RenderFormat::Text,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the pretty format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.name, "app");
        assert!(config.failure.install_panic_hook);
        assert_eq!(config.failure.memory_reserve_bytes, 262_144);
        assert_eq!(config.failure.logger_binding, "logger");
        assert_eq!(config.failure.exit_code, 1);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.run.is_empty());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: KernelConfig = toml::from_str(
            r#"
            name = "billing"

            [failure]
            render_format = "json"

            [parameters]
            region = "eu-west-1"
            retries = 3

            [[terminate]]
            type = "NamedDispatch"
            target_name = "db"
            method_name = "close"
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "billing");
        assert_eq!(config.failure.render_format, RenderFormat::Json);
        assert_eq!(config.failure.memory_reserve_bytes, 262_144);
        assert_eq!(config.parameters["retries"], toml::Value::Integer(3));
        assert_eq!(config.terminate.len(), 1);
        assert_eq!(config.terminate[0].target_name.as_deref(), Some("db"));
    }
}
