//! Deferred units of work and the ordered lists that run them.
//!
//! # Execution Contract
//! - Actions run synchronously, in insertion order
//! - Each action receives the kernel as its explicit argument, plus a
//!   resolver for any further dependencies it needs
//! - The first failure aborts the rest of the list and is returned
//!   with its position; nothing is caught or retried here

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::container::{BoxError, Params, Resolver};
use crate::lifecycle::error::{KernelError, KernelResult, Phase};
use crate::lifecycle::Kernel;
use crate::observability::metrics;

/// Closure stored by a `DirectCall` action.
pub type Callable = Arc<dyn Fn(&Kernel, &Resolver<'_>) -> Result<(), BoxError> + Send + Sync>;

/// Descriptor tag for [`Action::NamedDispatch`].
pub const NAMED_DISPATCH: &str = "NamedDispatch";
/// Descriptor tag for [`Action::DirectCall`].
pub const DIRECT_CALL: &str = "DirectCall";

/// A validated action.
#[derive(Clone)]
pub enum Action {
    /// Resolve `target` from the registry and call its `method`.
    NamedDispatch { target: String, method: String },
    /// Call a stored closure.
    DirectCall(Callable),
}

impl Action {
    /// Named dispatch action. Both names must be non-empty.
    pub fn dispatch(target: impl Into<String>, method: impl Into<String>) -> KernelResult<Self> {
        let target = target.into();
        let method = method.into();
        if target.trim().is_empty() {
            return Err(KernelError::InvalidAction(format!("{} requires a target_name", NAMED_DISPATCH)));
        }
        if method.trim().is_empty() {
            return Err(KernelError::InvalidAction(format!("{} requires a method_name", NAMED_DISPATCH)));
        }
        Ok(Action::NamedDispatch { target, method })
    }

    /// Direct call action.
    pub fn call<E, F>(callable: F) -> Self
    where
        E: Into<BoxError>,
        F: Fn(&Kernel, &Resolver<'_>) -> Result<(), E> + Send + Sync + 'static,
    {
        Action::DirectCall(Arc::new(
            move |kernel: &Kernel, resolver: &Resolver<'_>| -> Result<(), BoxError> {
                callable(kernel, resolver).map_err(Into::into)
            },
        ))
    }

    /// Short label for logs and errors.
    pub fn describe(&self) -> String {
        match self {
            Action::NamedDispatch { target, method } => format!("{}.{}", target, method),
            Action::DirectCall(_) => "<callable>".to_string(),
        }
    }

    fn execute(&self, kernel: &Kernel) -> Result<(), BoxError> {
        kernel.registry().call(Params::new(), |resolver| match self {
            Action::NamedDispatch { target, method } => {
                let instance = kernel.registry().get_instance(target)?;
                kernel.methods().invoke(target, &instance, method, kernel, resolver)
            }
            Action::DirectCall(callable) => callable(kernel, resolver),
        })
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::NamedDispatch { target, method } => f
                .debug_struct("NamedDispatch")
                .field("target", target)
                .field("method", method)
                .finish(),
            Action::DirectCall(_) => f.write_str("DirectCall(<callable>)"),
        }
    }
}

/// External shape of an action, as accepted by `add_run`/`add_terminate`
/// and declared in config files.
///
/// Shape problems are reported when the descriptor is turned into an
/// [`Action`], never at deserialization time.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct ActionDescriptor {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(alias = "targetName")]
    pub target_name: Option<String>,
    #[serde(alias = "methodName")]
    pub method_name: Option<String>,
    #[serde(skip)]
    pub callable: Option<Callable>,
}

impl ActionDescriptor {
    /// Descriptor with only the type tag set.
    pub fn of_type(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    pub fn named_dispatch(target: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            kind: Some(NAMED_DISPATCH.to_string()),
            target_name: Some(target.into()),
            method_name: Some(method.into()),
            callable: None,
        }
    }

    pub fn direct_call(callable: Callable) -> Self {
        Self {
            kind: Some(DIRECT_CALL.to_string()),
            callable: Some(callable),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("type", &self.kind)
            .field("target_name", &self.target_name)
            .field("method_name", &self.method_name)
            .field("callable", &self.callable.as_ref().map(|_| "<callable>"))
            .finish()
    }
}

impl TryFrom<ActionDescriptor> for Action {
    type Error = KernelError;

    fn try_from(descriptor: ActionDescriptor) -> Result<Self, Self::Error> {
        match descriptor.kind.as_deref() {
            Some(NAMED_DISPATCH) => Action::dispatch(
                descriptor.target_name.unwrap_or_default(),
                descriptor.method_name.unwrap_or_default(),
            ),
            Some(DIRECT_CALL) => descriptor
                .callable
                .map(Action::DirectCall)
                .ok_or_else(|| KernelError::InvalidAction(format!("{} requires a callable", DIRECT_CALL))),
            Some(other) => Err(KernelError::InvalidAction(format!("unknown action type `{}`", other))),
            None => Err(KernelError::InvalidAction("missing action type".to_string())),
        }
    }
}

impl From<Action> for ActionDescriptor {
    fn from(action: Action) -> Self {
        match action {
            Action::NamedDispatch { target, method } => ActionDescriptor::named_dispatch(target, method),
            Action::DirectCall(callable) => ActionDescriptor::direct_call(callable),
        }
    }
}

/// Ordered, append-only list of actions.
#[derive(Debug, Clone, Default)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Run every action in order, stopping at the first failure.
    pub fn execute(&self, kernel: &Kernel, phase: Phase) -> KernelResult<()> {
        for (position, action) in self.actions.iter().enumerate() {
            tracing::debug!(phase = %phase, position, action = %action.describe(), "Executing action");
            match action.execute(kernel) {
                Ok(()) => metrics::record_action(phase, true),
                Err(source) => {
                    metrics::record_action(phase, false);
                    return Err(KernelError::ActionFailed {
                        phase,
                        position,
                        action: action.describe(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_requires_names() {
        assert!(Action::dispatch("greeter", "hello").is_ok());
        assert!(matches!(Action::dispatch("", "hello"), Err(KernelError::InvalidAction(_))));
        assert!(matches!(Action::dispatch("greeter", " "), Err(KernelError::InvalidAction(_))));
    }

    #[test]
    fn test_descriptor_shapes() {
        let ok = Action::try_from(ActionDescriptor::named_dispatch("db", "close")).unwrap();
        assert_eq!(ok.describe(), "db.close");

        let missing_callable = Action::try_from(ActionDescriptor::of_type(DIRECT_CALL)).unwrap_err();
        assert_eq!(missing_callable.to_string(), "invalid action: DirectCall requires a callable");

        let unknown = Action::try_from(ActionDescriptor::of_type("Broadcast")).unwrap_err();
        assert_eq!(unknown.to_string(), "invalid action: unknown action type `Broadcast`");

        let untyped = Action::try_from(ActionDescriptor::default()).unwrap_err();
        assert!(matches!(untyped, KernelError::InvalidAction(_)));
    }

    #[test]
    fn test_direct_call_round_trips_through_descriptor() {
        let action = Action::call(|_kernel, _resolver| Ok::<(), BoxError>(()));
        let back = Action::try_from(ActionDescriptor::from(action)).unwrap();
        assert_eq!(back.describe(), "<callable>");
    }

    #[test]
    fn test_descriptor_from_toml_uses_type_key() {
        let descriptor: ActionDescriptor =
            toml::from_str("type = \"NamedDispatch\"\ntarget_name = \"cache\"\nmethod_name = \"flush\"").unwrap();
        let action = Action::try_from(descriptor).unwrap();
        assert_eq!(action.describe(), "cache.flush");
    }

    #[test]
    fn test_descriptor_accepts_camel_case_fields() {
        let descriptor: ActionDescriptor =
            serde_json::from_str(r#"{"type": "NamedDispatch", "targetName": "queue", "methodName": "drain"}"#)
                .unwrap();
        let action = Action::try_from(descriptor).unwrap();
        assert_eq!(action.describe(), "queue.drain");
    }
}
