//! Binding strategies.
//!
//! # Strategies
//! - Singleton: factory runs at most once, result cached for the binding's lifetime
//! - Transient: factory runs on every resolution
//! - Value: pre-built instance returned as-is
//! - Alias: resolution is forwarded to another binding

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::container::error::BoxError;
use crate::container::params::Resolver;

/// A resolved value as stored by the registry.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Type-erased factory.
pub type Factory = Arc<dyn Fn(&Resolver<'_>) -> Result<Instance, BoxError> + Send + Sync>;

/// How a name resolves to a value.
#[derive(Clone)]
pub enum Strategy {
    Singleton(Factory),
    Transient(Factory),
    Value(Instance),
    Alias(String),
}

/// Tag of a [`Strategy`], used for logging and introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Singleton,
    Transient,
    Value,
    Alias,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Singleton => "singleton",
            StrategyKind::Transient => "transient",
            StrategyKind::Value => "value",
            StrategyKind::Alias => "alias",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Strategy {
    /// Cached binding built by `factory` on first `get`.
    pub fn singleton<T, E, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&Resolver<'_>) -> Result<T, E> + Send + Sync + 'static,
    {
        Strategy::Singleton(erase(factory))
    }

    /// Binding built fresh by `factory` on every resolution.
    pub fn transient<T, E, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&Resolver<'_>) -> Result<T, E> + Send + Sync + 'static,
    {
        Strategy::Transient(erase(factory))
    }

    /// Pre-built value.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Strategy::Value(Arc::new(value))
    }

    /// Pre-built value that is already shared elsewhere.
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Strategy::Value(value)
    }

    /// Forward resolution to the binding named `target`.
    pub fn alias(target: impl Into<String>) -> Self {
        Strategy::Alias(target.into())
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Singleton(_) => StrategyKind::Singleton,
            Strategy::Transient(_) => StrategyKind::Transient,
            Strategy::Value(_) => StrategyKind::Value,
            Strategy::Alias(_) => StrategyKind::Alias,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Alias(target) => f.debug_tuple("Alias").field(target).finish(),
            other => write!(f, "{}", other.kind()),
        }
    }
}

fn erase<T, E, F>(factory: F) -> Factory
where
    T: Any + Send + Sync,
    E: Into<BoxError>,
    F: Fn(&Resolver<'_>) -> Result<T, E> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &Resolver<'_>| -> Result<Instance, BoxError> {
        factory(resolver)
            .map(|value| Arc::new(value) as Instance)
            .map_err(Into::into)
    })
}
