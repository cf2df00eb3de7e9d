//! The lifecycle kernel.
//!
//! # Responsibilities
//! - Own the registry, the method tables and both action lists
//! - Enforce a single live instance per process
//! - Run startup actions on request and shutdown actions exactly once
//! - Own the failure interceptor and route the host's exit through it
//! - Run the exit check on drop when the host never called [`Kernel::exit`]
//!
//! # Construction Order
//! ```text
//! resolve config (builder > <base>/config/kernel.toml > defaults)
//!     → check-and-set the process-wide slot
//!     → bind "kernel" / "app", then [parameters], then host bindings
//!     → register the failure interceptor
//!     → append [[run]] / [[terminate]] from config
//! ```
//!
//! # Design Decisions
//! - The kernel is handed around as `Arc<Kernel>`; the process-wide slot
//!   only holds a `Weak` so the panic hook can find it
//! - The registry binds the kernel through a `Weak` upgrade, never a strong
//!   reference, so dropping the host's handle really drops the kernel

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread::JoinHandle;

use tokio::sync::broadcast;

use crate::config::{self, ConfigError, KernelConfig, CONFIG_FILE_NAME};
use crate::container::{BoxError, ContainerResult, Params, Registry, Resolver, Strategy};
use crate::failure::{FailureHandler, FailureInterceptor, NormalizedError};
use crate::lifecycle::action::{Action, ActionDescriptor, ActionList};
use crate::lifecycle::error::{KernelError, KernelResult, Phase};
use crate::lifecycle::methods::MethodTable;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::observability::{logging, metrics};
use crate::paths::Paths;

/// Canonical binding name of the kernel itself.
pub const KERNEL_BINDING: &str = "kernel";
/// Short alias of [`KERNEL_BINDING`].
pub const KERNEL_ALIAS: &str = "app";

static LIVE: Mutex<Option<Weak<Kernel>>> = Mutex::new(None);

/// Construction inputs.
#[derive(Default)]
pub struct KernelBuilder {
    base_path: Option<PathBuf>,
    config: Option<KernelConfig>,
    bindings: Vec<(String, Strategy)>,
    init_logging: bool,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Application root; enables the path helpers and config file lookup.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Use `config` instead of looking for a config file.
    pub fn config(mut self, config: KernelConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Binding registered during construction, after config parameters.
    pub fn bind(mut self, name: impl Into<String>, strategy: Strategy) -> Self {
        self.bindings.push((name.into(), strategy));
        self
    }

    /// Install the tracing subscriber from the resolved config.
    pub fn init_logging(mut self, enabled: bool) -> Self {
        self.init_logging = enabled;
        self
    }

    /// Construct the kernel.
    ///
    /// Fails with [`KernelError::AlreadyInitialized`] while another kernel is live.
    pub fn build(self) -> KernelResult<Arc<Kernel>> {
        let paths = Paths::new(self.base_path);
        let config = match self.config {
            Some(config) => {
                config::validate_config(&config).map_err(ConfigError::Validation)?;
                config
            }
            None => config::load_optional(&paths.config(CONFIG_FILE_NAME))?.unwrap_or_default(),
        };
        if self.init_logging {
            logging::init_logging(&config.observability);
        }

        let kernel = {
            let mut live = LIVE.lock().unwrap_or_else(PoisonError::into_inner);
            if live.as_ref().and_then(Weak::upgrade).is_some() {
                tracing::warn!("Rejected construction of a second kernel");
                return Err(KernelError::AlreadyInitialized);
            }
            let kernel = Arc::new_cyclic(|weak| Kernel::assemble(weak, paths, config, self.bindings));
            *live = Some(Arc::downgrade(&kernel));
            kernel
        };

        kernel.interceptor.register();

        for descriptor in kernel.config.run.clone() {
            kernel.add_run(descriptor)?;
        }
        for descriptor in kernel.config.terminate.clone() {
            kernel.add_terminate(descriptor)?;
        }

        tracing::info!(
            name = %kernel.config.name,
            base_path = ?kernel.paths.base(),
            bindings = kernel.registry.len(),
            "Kernel constructed"
        );
        Ok(kernel)
    }
}

/// Process bootstrap and lifecycle kernel.
pub struct Kernel {
    registry: Registry,
    methods: MethodTable,
    run_actions: Mutex<ActionList>,
    terminate_actions: Mutex<ActionList>,
    shutdown: Shutdown,
    paths: Paths,
    config: KernelConfig,
    interceptor: Arc<FailureInterceptor>,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    /// Construct a kernel with defaults.
    pub fn new() -> KernelResult<Arc<Kernel>> {
        KernelBuilder::new().build()
    }

    /// The live kernel.
    pub fn instance() -> KernelResult<Arc<Kernel>> {
        LIVE.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(KernelError::Uninitialized)
    }

    fn assemble(
        weak: &Weak<Kernel>,
        paths: Paths,
        config: KernelConfig,
        bindings: Vec<(String, Strategy)>,
    ) -> Kernel {
        let registry = Registry::new();

        let this = weak.clone();
        registry.set(
            KERNEL_BINDING,
            Strategy::transient(move |_| this.upgrade().ok_or(KernelError::Uninitialized)),
        );
        registry.set(KERNEL_ALIAS, Strategy::alias(KERNEL_BINDING));

        for (name, value) in &config.parameters {
            registry.set(name.clone(), Strategy::value(value.clone()));
        }
        for (name, strategy) in bindings {
            registry.set(name, strategy);
        }

        let interceptor = Arc::new(FailureInterceptor::new(weak.clone(), config.failure.clone()));

        Kernel {
            registry,
            methods: MethodTable::new(),
            run_actions: Mutex::new(ActionList::new()),
            terminate_actions: Mutex::new(ActionList::new()),
            shutdown: Shutdown::new(),
            paths,
            config,
            interceptor,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn interceptor(&self) -> &Arc<FailureInterceptor> {
        &self.interceptor
    }

    /// Shared resolution; see [`Registry::get`].
    pub fn get<T: std::any::Any + Send + Sync>(&self, name: &str) -> ContainerResult<Arc<T>> {
        self.registry.get(name)
    }

    /// Fresh resolution; see [`Registry::make`].
    pub fn make<T: std::any::Any + Send + Sync>(&self, name: &str, params: Params) -> ContainerResult<Arc<T>> {
        self.registry.make(name, params)
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn set(&self, name: impl Into<String>, strategy: Strategy) {
        self.registry.set(name, strategy)
    }

    /// Invoke `callable` with a resolver; its own error is returned unchanged.
    pub fn call<R, E, F>(&self, params: Params, callable: F) -> Result<R, E>
    where
        F: FnOnce(&Resolver<'_>) -> Result<R, E>,
    {
        self.registry.call(params, callable)
    }

    /// Register a method callable through `NamedDispatch` on values of type `T`.
    pub fn add_method<T, E, F>(&self, name: impl Into<String>, method: F)
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(&T, &Kernel, &Resolver<'_>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.methods.add(name, method)
    }

    /// Append a startup action. Malformed descriptors are rejected and not appended.
    pub fn add_run(&self, action: impl Into<ActionDescriptor>) -> KernelResult<()> {
        self.append(&self.run_actions, Phase::Run, action.into())
    }

    /// Append a shutdown action. Malformed descriptors are rejected and not appended.
    pub fn add_terminate(&self, action: impl Into<ActionDescriptor>) -> KernelResult<()> {
        self.append(&self.terminate_actions, Phase::Terminate, action.into())
    }

    fn append(&self, list: &Mutex<ActionList>, phase: Phase, descriptor: ActionDescriptor) -> KernelResult<()> {
        let action = Action::try_from(descriptor)?;
        tracing::debug!(phase = %phase, action = %action.describe(), "Appended action");
        list.lock().unwrap_or_else(PoisonError::into_inner).push(action);
        Ok(())
    }

    pub fn run_len(&self) -> usize {
        self.run_actions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn terminate_len(&self) -> usize {
        self.terminate_actions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Execute the startup actions in order; the first failure is returned.
    pub fn run(&self) -> KernelResult<()> {
        let actions = self.snapshot(&self.run_actions);
        tracing::info!(name = %self.config.name, actions = actions.len(), "Running startup actions");
        actions.execute(self, Phase::Run)
    }

    /// Execute the shutdown actions, once.
    ///
    /// The guard flips before the first action runs and stays flipped even
    /// when an action fails, so later calls are no-ops either way.
    pub fn terminate(&self) -> KernelResult<()> {
        if !self.shutdown.begin() {
            tracing::debug!("Terminate already ran, skipping");
            return Ok(());
        }
        metrics::record_termination();
        let actions = self.snapshot(&self.terminate_actions);
        tracing::info!(name = %self.config.name, actions = actions.len(), "Running shutdown actions");
        let result = actions.execute(self, Phase::Terminate);
        self.shutdown.finish();
        result
    }

    pub fn is_terminated(&self) -> bool {
        self.shutdown.is_terminated()
    }

    /// Block until a `terminate()` in progress on another thread has run all
    /// its actions. Returns immediately when termination has not begun.
    pub fn wait_for_termination(&self) {
        self.shutdown.wait()
    }

    /// Receiver notified when termination begins.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Replace the failure render/report strategy.
    pub fn set_failure_handler(&self, handler: Box<dyn FailureHandler>) {
        self.interceptor.unregister();
        self.interceptor.set_handler(handler);
        self.interceptor.register();
    }

    /// Terminate the host program through the interceptor.
    ///
    /// `Ok` runs the exit check (shutdown actions, unless a fatal condition
    /// was recorded) and returns the success code. `Err` is handled as an
    /// uncaught error: rendered, reported, and the process exits with the
    /// configured failure status without running shutdown actions.
    #[track_caller]
    pub fn exit<E: Into<BoxError>>(&self, result: Result<(), E>) -> ExitCode {
        match result {
            Ok(()) => {
                self.interceptor.handle_exit();
                ExitCode::SUCCESS
            }
            Err(e) => self.interceptor.handle_uncaught(NormalizedError::uncaught(e)),
        }
    }

    /// Run the host body and exit through the interceptor.
    ///
    /// A returned `Err` or a panic unwinding out of `body` is handled as an
    /// uncaught error; `Ok` runs the exit check like [`exit`](Self::exit).
    /// Panics caught inside `body` never reach the interceptor.
    #[track_caller]
    pub fn supervise<E, F>(&self, body: F) -> ExitCode
    where
        E: Into<BoxError>,
        F: FnOnce() -> Result<(), E>,
    {
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(result) => self.exit(result),
            Err(payload) => {
                let error = self
                    .interceptor
                    .take_panic()
                    .unwrap_or_else(|| NormalizedError::from_payload(payload.as_ref()));
                self.interceptor.handle_uncaught(error)
            }
        }
    }

    /// Run the exit check when SIGINT or SIGTERM arrives.
    pub fn listen_for_signals(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        signals::spawn_listener(self)
    }

    // Actions may append to the lists, so none run under the lock.
    fn snapshot(&self, list: &Mutex<ActionList>) -> ActionList {
        list.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Drop for Kernel {
    fn drop(&mut self) {
        self.interceptor.handle_drop(self);
        self.interceptor.unregister();
        tracing::debug!(name = %self.config.name, "Kernel dropped");
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.config.name)
            .field("paths", &self.paths)
            .field("bindings", &self.registry.names())
            .field("run_actions", &self.run_len())
            .field("terminate_actions", &self.terminate_len())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}
