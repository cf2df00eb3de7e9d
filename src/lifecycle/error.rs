//! Kernel error taxonomy.

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::container::{BoxError, ContainerError};

/// Which action list an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Run,
    Terminate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Run => "run",
            Phase::Terminate => "terminate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("a kernel instance is already live in this process")]
    AlreadyInitialized,

    #[error("no kernel instance has been constructed")]
    Uninitialized,

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("{phase} action #{position} ({action}) failed: {source}")]
    ActionFailed {
        phase: Phase,
        position: usize,
        action: String,
        #[source]
        source: BoxError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_failed_display() {
        let err = KernelError::ActionFailed {
            phase: Phase::Terminate,
            position: 2,
            action: "db.close".to_string(),
            source: "connection reset".into(),
        };
        assert_eq!(err.to_string(), "terminate action #2 (db.close) failed: connection reset");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_container_error_is_transparent() {
        let err: KernelError = ContainerError::NotFound("cache".into()).into();
        assert_eq!(err.to_string(), "no binding registered for [cache]");
    }
}
