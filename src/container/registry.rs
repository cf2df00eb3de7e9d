//! Name → strategy registry.
//!
//! # Responsibilities
//! - Store bindings keyed by name
//! - Resolve shared (`get`) and fresh (`make`) instances
//! - Invoke callables with resolved arguments (`call`)
//!
//! # Design Decisions
//! - Each binding lives in its own slot; re-binding swaps the slot and drops its cache
//! - Factories run with no map lock held, so they may resolve other bindings
//! - Resolution chains are tracked per thread to reject cycles instead of deadlocking

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::container::binding::{Factory, Instance, Strategy, StrategyKind};
use crate::container::error::{ContainerError, ContainerResult};
use crate::container::params::{Params, Resolver};

thread_local! {
    static RESOLVING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// One binding plus its singleton cache.
struct Slot {
    strategy: Strategy,
    cached: OnceCell<Instance>,
}

impl Slot {
    fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            cached: OnceCell::new(),
        }
    }
}

/// Dependency registry.
#[derive(Default)]
pub struct Registry {
    bindings: DashMap<String, Arc<Slot>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous binding and its cached instance.
    pub fn set(&self, name: impl Into<String>, strategy: Strategy) {
        let name = name.into();
        tracing::debug!(name = %name, strategy = %strategy.kind(), "Binding registered");
        self.bindings.insert(name, Arc::new(Slot::new(strategy)));
    }

    /// True iff `name` is bound.
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Strategy tag of a binding.
    pub fn kind(&self, name: &str) -> Option<StrategyKind> {
        self.bindings.get(name).map(|slot| slot.strategy.kind())
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve `name` through the shared path and downcast it.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        downcast(name, self.get_instance(name)?)
    }

    /// Resolve `name` through the shared path.
    ///
    /// Singletons are built on first use and cached; values are returned
    /// as-is; transients behave like [`Registry::make_instance`].
    pub fn get_instance(&self, name: &str) -> ContainerResult<Instance> {
        let slot = self.slot(name)?;
        match &slot.strategy {
            Strategy::Value(instance) => Ok(instance.clone()),
            Strategy::Singleton(factory) => {
                if let Some(instance) = slot.cached.get() {
                    return Ok(instance.clone());
                }
                // Enter before touching the cell: re-entrant init would block forever.
                let _guard = ResolutionGuard::enter(name)?;
                slot.cached
                    .get_or_try_init(|| self.invoke(name, factory, &Params::new()))
                    .cloned()
            }
            Strategy::Transient(factory) => self.build(name, factory, &Params::new()),
            Strategy::Alias(target) => {
                let _guard = ResolutionGuard::enter(name)?;
                self.get_instance(target)
            }
        }
    }

    /// Build a fresh instance of `name` and downcast it.
    pub fn make<T: Any + Send + Sync>(&self, name: &str, params: Params) -> ContainerResult<Arc<T>> {
        downcast(name, self.make_instance(name, params)?)
    }

    /// Build a fresh instance of `name`, bypassing and never updating the cache.
    pub fn make_instance(&self, name: &str, params: Params) -> ContainerResult<Instance> {
        let slot = self.slot(name)?;
        match &slot.strategy {
            Strategy::Value(instance) => Ok(instance.clone()),
            Strategy::Singleton(factory) | Strategy::Transient(factory) => {
                self.build(name, factory, &params)
            }
            Strategy::Alias(target) => {
                let _guard = ResolutionGuard::enter(name)?;
                self.make_instance(target, params)
            }
        }
    }

    /// Invoke `callable` with a resolver over this registry and `params`.
    ///
    /// The callable's own error is returned unchanged.
    pub fn call<R, E, F>(&self, params: Params, callable: F) -> Result<R, E>
    where
        F: FnOnce(&Resolver<'_>) -> Result<R, E>,
    {
        callable(&Resolver::new(self, &params))
    }

    fn slot(&self, name: &str) -> ContainerResult<Arc<Slot>> {
        self.bindings
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }

    fn build(&self, name: &str, factory: &Factory, params: &Params) -> ContainerResult<Instance> {
        let _guard = ResolutionGuard::enter(name)?;
        self.invoke(name, factory, params)
    }

    fn invoke(&self, name: &str, factory: &Factory, params: &Params) -> ContainerResult<Instance> {
        tracing::trace!(name = %name, "Invoking factory");
        factory(&Resolver::new(self, params)).map_err(|source| ContainerError::Resolution {
            name: name.to_string(),
            source,
        })
    }
}

fn downcast<T: Any + Send + Sync>(name: &str, instance: Instance) -> ContainerResult<Arc<T>> {
    instance.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
        name: name.to_string(),
        expected: type_name::<T>(),
    })
}

/// Marks `name` as being resolved on this thread until dropped.
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(name: &str) -> ContainerResult<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|entry| entry == name) {
                let mut chain = stack.clone();
                chain.push(name.to_string());
                return Err(ContainerError::CircularDependency { chain });
            }
            stack.push(name.to_string());
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
