//! Registry error definitions.

use thiserror::Error;

/// Boxed error returned by user factories, callables and actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving bindings.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// No binding is registered under the requested name.
    #[error("no binding registered for [{0}]")]
    NotFound(String),

    /// The binding's factory failed.
    #[error("failed to resolve [{name}]: {source}")]
    Resolution {
        name: String,
        #[source]
        source: BoxError,
    },

    /// The binding resolved to a value of another type.
    #[error("binding [{name}] does not hold a value of type {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// A factory (directly or through aliases) requested itself.
    #[error("circular dependency detected: {}", chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// A factory required a parameter that was neither passed nor bound.
    #[error("missing parameter [{0}]")]
    MissingParameter(String),
}

impl ContainerError {
    /// Name of the binding the error refers to, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            ContainerError::NotFound(name) => Some(name),
            ContainerError::Resolution { name, .. } => Some(name),
            ContainerError::TypeMismatch { name, .. } => Some(name),
            ContainerError::CircularDependency { chain } => chain.last().map(String::as_str),
            ContainerError::MissingParameter(name) => Some(name),
        }
    }
}

/// Result type for registry operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ContainerError::NotFound("greeter".into());
        assert_eq!(err.to_string(), "no binding registered for [greeter]");

        let err = ContainerError::CircularDependency {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "circular dependency detected: a -> b -> a");
        assert_eq!(err.name(), Some("a"));
    }
}
