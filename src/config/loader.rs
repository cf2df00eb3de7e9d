//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::KernelConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File name looked up under `<base>/config/`.
pub const CONFIG_FILE_NAME: &str = "kernel.toml";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<KernelConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: KernelConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load `path` if it exists.
pub fn load_optional(path: &Path) -> Result<Option<KernelConfig>, ConfigError> {
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(None);
    }
    let config = load_config(path)?;
    tracing::debug!(path = %path.display(), name = %config.name, "Loaded config file");
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = \"worker\"\n[observability]\njson = true").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.name, "worker");
        assert!(config.observability.json);
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = ").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_validation_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[failure]\nexit_code = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_optional(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(loaded.is_none());
    }
}
