//! Per-type method tables for named dispatch.
//!
//! A `NamedDispatch` action names a binding and a method. The binding is
//! resolved through the registry at execution time; the method is looked up
//! in the table of the resolved value's concrete type. Tables are keyed by
//! `TypeId`, so a method registered for one type is never visible on another.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::container::{BoxError, Instance, Resolver};
use crate::lifecycle::Kernel;

type ErasedMethod = Arc<dyn Fn(&Instance, &Kernel, &Resolver<'_>) -> Result<(), BoxError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("[{target}] resolved to a type with no registered methods")]
    NoMethods { target: String },

    #[error("[{target}] ({type_name}) has no method `{method}`")]
    UnknownMethod {
        target: String,
        type_name: &'static str,
        method: String,
    },
}

struct MethodSet {
    type_name: &'static str,
    methods: HashMap<String, ErasedMethod>,
}

/// Method tables for all dispatch target types.
#[derive(Default)]
pub struct MethodTable {
    types: DashMap<TypeId, MethodSet>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method` under `name` for values of type `T`.
    ///
    /// Re-registering a name replaces the previous method.
    pub fn add<T, E, F>(&self, name: impl Into<String>, method: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&T, &Kernel, &Resolver<'_>) -> Result<(), E> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(target_type = type_name::<T>(), method = %name, "Registered dispatch method");

        let erased: ErasedMethod = Arc::new(
            move |instance: &Instance, kernel: &Kernel, resolver: &Resolver<'_>| -> Result<(), BoxError> {
                let target = instance.downcast_ref::<T>().ok_or_else(|| -> BoxError {
                    format!("dispatch target is not a {}", type_name::<T>()).into()
                })?;
                method(target, kernel, resolver).map_err(Into::into)
            },
        );

        self.types
            .entry(TypeId::of::<T>())
            .or_insert_with(|| MethodSet {
                type_name: type_name::<T>(),
                methods: HashMap::new(),
            })
            .methods
            .insert(name, erased);
    }

    /// Whether `T` has a method called `name`.
    pub fn has<T: 'static>(&self, name: &str) -> bool {
        self.types
            .get(&TypeId::of::<T>())
            .is_some_and(|set| set.methods.contains_key(name))
    }

    /// Call `method` on `instance`, the value bound under `target`.
    pub fn invoke(
        &self,
        target: &str,
        instance: &Instance,
        method: &str,
        kernel: &Kernel,
        resolver: &Resolver<'_>,
    ) -> Result<(), BoxError> {
        let type_id = (**instance).type_id();
        // Cloned out so no shard lock is held while user code runs.
        let found = {
            let set = self.types.get(&type_id).ok_or_else(|| DispatchError::NoMethods {
                target: target.to_string(),
            })?;
            set.methods
                .get(method)
                .cloned()
                .ok_or_else(|| DispatchError::UnknownMethod {
                    target: target.to_string(),
                    type_name: set.type_name,
                    method: method.to_string(),
                })?
        };
        found(instance, kernel, resolver)
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for entry in self.types.iter() {
            let mut names: Vec<&String> = entry.methods.keys().collect();
            names.sort();
            map.entry(&entry.type_name, &names);
        }
        map.finish()
    }
}
