//! Call-time parameters and the resolver handed to factories.
//!
//! # Responsibilities
//! - Carry positional and named overrides into `make` and `call`
//! - Give factories and callables one place to ask for their arguments
//!
//! # Design Decisions
//! - Named overrides win over positional ones
//! - A parameter of the wrong type is treated as absent

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::binding::Instance;
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::registry::Registry;

/// Positional and named argument overrides.
#[derive(Clone, Default)]
pub struct Params {
    positional: Vec<Instance>,
    named: HashMap<String, Instance>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named override.
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.named.insert(name.into(), Arc::new(value));
        self
    }

    /// Append a positional override.
    pub fn push<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.positional.push(Arc::new(value));
        self
    }

    /// Look up a named override.
    pub fn named<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.named.get(name).cloned()?.downcast::<T>().ok()
    }

    /// Look up a positional override.
    pub fn positional<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.positional.get(index).cloned()?.downcast::<T>().ok()
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.named.keys().collect();
        names.sort();
        f.debug_struct("Params")
            .field("positional", &self.positional.len())
            .field("named", &names)
            .finish()
    }
}

/// View of the registry plus the parameters of the current resolution.
///
/// Factories receive one when they run; callables passed to
/// [`Registry::call`] receive one as their only argument.
pub struct Resolver<'a> {
    registry: &'a Registry,
    params: &'a Params,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(registry: &'a Registry, params: &'a Params) -> Self {
        Self { registry, params }
    }

    /// The registry this resolution runs against.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The parameters passed to the current resolution.
    pub fn params(&self) -> &'a Params {
        self.params
    }

    /// Parameter override by name, falling back to position.
    pub fn param<T: Any + Send + Sync>(&self, name: &str, position: usize) -> Option<Arc<T>> {
        self.params
            .named::<T>(name)
            .or_else(|| self.params.positional::<T>(position))
    }

    /// Parameter override, or `default` when none was supplied.
    pub fn param_or<T: Any + Send + Sync>(&self, name: &str, position: usize, default: T) -> Arc<T> {
        self.param(name, position).unwrap_or_else(|| Arc::new(default))
    }

    /// Required parameter override.
    pub fn require<T: Any + Send + Sync>(&self, name: &str, position: usize) -> ContainerResult<Arc<T>> {
        self.param(name, position)
            .ok_or_else(|| ContainerError::MissingParameter(name.to_string()))
    }

    /// Resolve a dependency through the shared path.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.registry.get(name)
    }

    /// Resolve a fresh instance of a dependency.
    pub fn make<T: Any + Send + Sync>(&self, name: &str, params: Params) -> ContainerResult<Arc<T>> {
        self.registry.make(name, params)
    }

    /// Named argument: a parameter override if present, else the binding of the same name.
    pub fn arg<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        if let Some(value) = self.params.named::<T>(name) {
            return Ok(value);
        }
        match self.registry.get::<T>(name) {
            Err(ContainerError::NotFound(_)) => Err(ContainerError::MissingParameter(name.to_string())),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_wins_over_positional() {
        let params = Params::new().push(1u32).with("level", 7u32);
        let registry = Registry::new();
        let resolver = Resolver::new(&registry, &params);

        assert_eq!(*resolver.param::<u32>("level", 0).unwrap(), 7);
        assert_eq!(*resolver.param::<u32>("other", 0).unwrap(), 1);
        assert!(resolver.param::<u32>("other", 1).is_none());
    }

    #[test]
    fn test_wrong_type_is_absent() {
        let params = Params::new().with("name", 3u8);
        assert!(params.named::<String>("name").is_none());
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_arg_falls_back_to_registry() {
        let registry = Registry::new();
        registry.set("threshold", crate::container::Strategy::value(10i64));
        let params = Params::new();
        let resolver = Resolver::new(&registry, &params);

        assert_eq!(*resolver.arg::<i64>("threshold").unwrap(), 10);
        assert!(matches!(
            resolver.arg::<i64>("absent"),
            Err(ContainerError::MissingParameter(name)) if name == "absent"
        ));
    }
}
