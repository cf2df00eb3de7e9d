//! Process-wide failure interception.
//!
//! # States
//! - Unregistered: hooks not installed
//! - Registered: panic hook installed, memory reserve held
//! - Handling: a failure is being rendered/reported; hooks pass through
//! - Exited: the render/report sequence finished, process exit pending
//!
//! # State Transitions
//! ```text
//! Unregistered → Registered: register()
//! Registered → Unregistered: unregister()
//! Registered → Handling: escaped panic or error, severe condition, fatal exit check
//! Handling → Exited: diagnostic rendered and reported
//! ```
//!
//! # Hooks
//! 1. Uncaught error (`Err` or panic escaping the host body) → render, report, exit.
//!    The panic hook only captures the panic; panics the host catches never
//!    reach the render/report path
//! 2. Severe condition → raised to the caller as a `NormalizedError`, or handled
//!    directly when it happens while an error is being described
//! 3. Exit check → fatal last condition: render, report, exit; otherwise `terminate()`.
//!    Runs on an explicit exit, on a shutdown signal, or when the kernel is
//!    dropped without either
//!
//! Shutdown actions never run once a failure has been intercepted.

use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use arc_swap::ArcSwap;

use crate::config::FailureConfig;
use crate::failure::error::{Condition, DescribeScope, NormalizedError};
use crate::failure::handler::{ErrorReporter, FailureHandler};
use crate::failure::reserve::MemoryReserve;
use crate::lifecycle::Kernel;
use crate::observability::metrics;

type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

/// Interceptor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorState {
    Unregistered,
    Registered,
    Handling,
    Exited,
}

impl InterceptorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => InterceptorState::Unregistered,
            1 => InterceptorState::Registered,
            2 => InterceptorState::Handling,
            _ => InterceptorState::Exited,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            InterceptorState::Unregistered => 0,
            InterceptorState::Registered => 1,
            InterceptorState::Handling => 2,
            InterceptorState::Exited => 3,
        }
    }
}

/// What the process should do after an interception path ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Shutdown actions ran; exit normally.
    Clean,
    /// A failure was rendered and reported; exit with `code`.
    Abort { code: i32 },
}

impl Disposition {
    pub fn exit_code(&self) -> i32 {
        match self {
            Disposition::Clean => 0,
            Disposition::Abort { code } => *code,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Disposition::Clean)
    }
}

/// Where a reported condition goes.
#[derive(Debug)]
pub enum ConditionRoute {
    /// Not severe; the caller's default handling applies.
    NotHandled,
    /// Severe; the caller propagates it as an uncaught error.
    Raise(NormalizedError),
    /// Severe and raised while describing an error; handled on the spot.
    Direct(NormalizedError),
}

/// Signal returned for conditions the interceptor leaves alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotHandled;

/// Process-wide failure interceptor owned by the kernel.
pub struct FailureInterceptor {
    kernel: Weak<Kernel>,
    config: FailureConfig,
    state: AtomicU8,
    handler: ArcSwap<Box<dyn FailureHandler>>,
    output: Mutex<Box<dyn Write + Send>>,
    reserve: MemoryReserve,
    last_condition: Mutex<Option<Condition>>,
    last_panic: Mutex<Option<NormalizedError>>,
    previous_hook: Mutex<Option<Arc<PanicHook>>>,
    hook_installed: AtomicBool,
}

impl FailureInterceptor {
    /// Create an unregistered interceptor rendering to stderr.
    pub fn new(kernel: Weak<Kernel>, config: FailureConfig) -> Self {
        let handler = config.render_format.handler();
        Self {
            kernel,
            config,
            state: AtomicU8::new(InterceptorState::Unregistered.as_u8()),
            handler: ArcSwap::from_pointee(handler),
            output: Mutex::new(Box::new(io::stderr())),
            reserve: MemoryReserve::new(),
            last_condition: Mutex::new(None),
            last_panic: Mutex::new(None),
            previous_hook: Mutex::new(None),
            hook_installed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> InterceptorState {
        InterceptorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn config(&self) -> &FailureConfig {
        &self.config
    }

    /// Bytes currently held by the memory reserve.
    pub fn reserved_bytes(&self) -> usize {
        self.reserve.held()
    }

    /// Install the hooks. No-op unless currently unregistered.
    pub fn register(self: &Arc<Self>) {
        if !self.transition(InterceptorState::Unregistered, InterceptorState::Registered) {
            return;
        }
        self.reserve.acquire(self.config.memory_reserve_bytes);
        if self.config.install_panic_hook {
            self.install_panic_hook();
        }
        tracing::debug!(
            reserve_bytes = self.config.memory_reserve_bytes,
            panic_hook = self.config.install_panic_hook,
            "Failure interceptor registered"
        );
    }

    /// Remove the hooks. No-op unless currently registered.
    pub fn unregister(&self) {
        if !self.transition(InterceptorState::Registered, InterceptorState::Unregistered) {
            return;
        }
        self.restore_panic_hook();
        self.reserve.release();
        tracing::debug!("Failure interceptor unregistered");
    }

    /// Replace the render/report strategy.
    pub fn set_handler(&self, handler: Box<dyn FailureHandler>) {
        self.handler.store(Arc::new(handler));
    }

    /// Redirect the operational output (stderr by default).
    pub fn set_output(&self, output: Box<dyn Write + Send>) {
        *self.output.lock().unwrap_or_else(PoisonError::into_inner) = output;
    }

    /// Record a condition as the last error seen, without handling it.
    ///
    /// Fatal conditions recorded here are acted on by [`inspect_exit`](Self::inspect_exit).
    pub fn record(&self, condition: Condition) {
        tracing::warn!(
            severity = ?condition.severity,
            file = %condition.file,
            line = condition.line,
            "{}",
            condition.message
        );
        *self.last_condition.lock().unwrap_or_else(PoisonError::into_inner) = Some(condition);
    }

    /// Last recorded condition.
    pub fn last_condition(&self) -> Option<Condition> {
        self.last_condition
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Take the panic captured by the hook, if any.
    pub fn take_panic(&self) -> Option<NormalizedError> {
        self.last_panic.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Record `condition` and decide where it goes.
    pub fn classify(&self, condition: Condition) -> ConditionRoute {
        let severity = condition.severity;
        let error = severity.is_severe().then(|| NormalizedError::from_condition(&condition));
        self.record(condition);
        match error {
            None => ConditionRoute::NotHandled,
            Some(error) if DescribeScope::active() => ConditionRoute::Direct(error),
            Some(error) => ConditionRoute::Raise(error),
        }
    }

    /// Hook for runtime conditions.
    ///
    /// Notices, deprecations and warnings return `Ok(NotHandled)`. Severe
    /// conditions come back as `Err` for the caller to propagate, except when
    /// raised while an error is being described: those exit immediately.
    pub fn handle_condition(&self, condition: Condition) -> Result<NotHandled, NormalizedError> {
        match self.classify(condition) {
            ConditionRoute::NotHandled => Ok(NotHandled),
            ConditionRoute::Raise(error) => Err(error),
            ConditionRoute::Direct(error) => self.handle_uncaught(error),
        }
    }

    /// Render and report `error` without exiting.
    ///
    /// The first call moves the interceptor to `Handling`, which makes the
    /// panic hook pass through; later calls only write a short notice.
    pub fn intercept(&self, error: &NormalizedError) -> Disposition {
        let kernel = self.kernel.upgrade();
        self.intercept_in(error, kernel.as_deref())
    }

    fn intercept_in(&self, error: &NormalizedError, kernel: Option<&Kernel>) -> Disposition {
        let code = self.config.exit_code;
        let previous = InterceptorState::from_u8(
            self.state.swap(InterceptorState::Handling.as_u8(), Ordering::SeqCst),
        );
        if matches!(previous, InterceptorState::Handling | InterceptorState::Exited) {
            self.state.store(previous.as_u8(), Ordering::SeqCst);
            let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
            let _ = writeln!(out, "***System error while handling a previous error***\n{}", error.message);
            return Disposition::Abort { code };
        }

        tracing::error!(
            kind = %error.kind,
            file = %error.source_file,
            line = error.line,
            "{}",
            error.message
        );
        metrics::record_failure(error.kind);

        let handler = self.handler.load_full();
        {
            let _scope = DescribeScope::enter();
            let mut out = self.output.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = handler.render(error, &mut **out) {
                tracing::warn!(error = %e, "Failed to render failure diagnostic");
            }
        }

        let reporter = kernel.and_then(|kernel| self.reporter(kernel));
        handler.report(error, reporter.as_deref());

        self.state.store(InterceptorState::Exited.as_u8(), Ordering::SeqCst);
        Disposition::Abort { code }
    }

    /// Hook for uncaught errors: render, report, exit.
    pub fn handle_uncaught(&self, error: NormalizedError) -> ! {
        let disposition = self.intercept(&error);
        exit(disposition.exit_code())
    }

    /// Exit-time check, without exiting.
    ///
    /// Releases the memory reserve, then either handles a fatal last
    /// condition or runs the kernel's shutdown actions.
    pub fn inspect_exit(&self) -> Disposition {
        let kernel = self.kernel.upgrade();
        self.check_exit(kernel.as_deref())
    }

    fn check_exit(&self, kernel: Option<&Kernel>) -> Disposition {
        let released = self.reserve.release();
        tracing::debug!(released_bytes = released, "Exit check started");

        if matches!(self.state(), InterceptorState::Handling | InterceptorState::Exited) {
            return Disposition::Abort {
                code: self.config.exit_code,
            };
        }

        if let Some(condition) = self.last_condition().filter(|c| c.severity.is_fatal()) {
            return self.intercept_in(&NormalizedError::from_condition(&condition), kernel);
        }

        let Some(kernel) = kernel else {
            return Disposition::Clean;
        };
        match kernel.terminate() {
            Ok(()) => Disposition::Clean,
            Err(e) => self.intercept_in(&NormalizedError::uncaught(e), Some(kernel)),
        }
    }

    /// Exit-time hook: [`inspect_exit`](Self::inspect_exit), then exit on failure.
    pub fn handle_exit(&self) -> Disposition {
        match self.inspect_exit() {
            Disposition::Clean => Disposition::Clean,
            Disposition::Abort { code } => exit(code),
        }
    }

    /// Exit hook for a kernel dropped without an explicit exit.
    ///
    /// While unwinding from a captured panic the panic is handled as
    /// uncaught. Otherwise a registered interceptor runs the exit check,
    /// unless the kernel already terminated.
    pub(crate) fn handle_drop(&self, kernel: &Kernel) {
        if self.state() != InterceptorState::Registered {
            return;
        }
        if std::thread::panicking() {
            if let Some(error) = self.take_panic() {
                let disposition = self.intercept_in(&error, Some(kernel));
                exit(disposition.exit_code());
            }
            return;
        }
        if kernel.is_terminated() {
            return;
        }
        tracing::debug!("Kernel dropped without an exit check, running it now");
        if let Disposition::Abort { code } = self.check_exit(Some(kernel)) {
            exit(code);
        }
    }

    fn reporter(&self, kernel: &Kernel) -> Option<Arc<dyn ErrorReporter>> {
        let name = self.config.logger_binding.as_str();
        if !kernel.registry().has(name) {
            return None;
        }
        match kernel.registry().get::<Arc<dyn ErrorReporter>>(name) {
            Ok(reporter) => Some(Arc::clone(&*reporter)),
            Err(e) => {
                tracing::debug!(binding = %name, error = %e, "Logger binding is not an error reporter");
                None
            }
        }
    }

    fn transition(&self, from: InterceptorState, to: InterceptorState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn install_panic_hook(self: &Arc<Self>) {
        if self.hook_installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let previous: Arc<PanicHook> = Arc::from(panic::take_hook());
        *self.previous_hook.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&previous));

        let interceptor = Arc::downgrade(self);
        panic::set_hook(Box::new(move |info| match interceptor.upgrade() {
            Some(interceptor) if interceptor.state() == InterceptorState::Registered => {
                interceptor.capture_panic(NormalizedError::from_panic(info))
            }
            _ => previous(info),
        }));
    }

    // Whether the panic escapes is only known once it unwinds past the host
    // body, so the hook keeps the normalized error and returns.
    fn capture_panic(&self, error: NormalizedError) {
        tracing::warn!(file = %error.source_file, line = error.line, "Panic captured: {}", error.message);
        *self.last_panic.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn restore_panic_hook(&self) {
        if !self.hook_installed.swap(false, Ordering::SeqCst) {
            return;
        }
        // The hook cannot be swapped from a panicking thread; the installed
        // one passes through once the state is no longer Registered.
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous_hook.lock().unwrap_or_else(PoisonError::into_inner).take() {
            panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
}

fn exit(code: i32) -> ! {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
    std::process::exit(code)
}
