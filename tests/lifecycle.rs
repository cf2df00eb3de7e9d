//! End-to-end lifecycle tests through the public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serial_test::serial;

use app_kernel::container::ContainerError;
use app_kernel::failure::{reporter_binding, Disposition, ErrorReporter};
use app_kernel::{
    Action, ActionDescriptor, BoxError, Kernel, KernelError, NormalizedError, Params, Registry, Resolver,
    Strategy,
};

mod common;

#[derive(Debug)]
struct Connection {
    dsn: String,
}

#[derive(Default)]
struct Alerts(Mutex<Vec<String>>);

struct SharedAlerts(Arc<Alerts>);

impl ErrorReporter for SharedAlerts {
    fn error(&self, message: &str) {
        self.0 .0.lock().unwrap().push(message.to_string());
    }
}

fn connection_factory(
    built: &Arc<AtomicUsize>,
) -> impl Fn(&Resolver<'_>) -> Result<Connection, BoxError> + Send + Sync + 'static {
    let built = Arc::clone(built);
    move |resolver| {
        built.fetch_add(1, Ordering::SeqCst);
        let dsn = resolver.param_or("dsn", 0, String::from("postgres://localhost/app"));
        Ok(Connection { dsn: dsn.to_string() })
    }
}

#[test]
fn test_get_make_identity_law() {
    let registry = Registry::new();
    let built = Arc::new(AtomicUsize::new(0));
    registry.set("db", Strategy::singleton(connection_factory(&built)));

    let first = registry.get::<Connection>("db").unwrap();
    let second = registry.get::<Connection>("db").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let fresh_a = registry.make::<Connection>("db", Params::new()).unwrap();
    let fresh_b = registry
        .make::<Connection>("db", Params::new().with("dsn", String::from("postgres://replica/app")))
        .unwrap();
    assert!(!Arc::ptr_eq(&fresh_a, &fresh_b));
    assert!(!Arc::ptr_eq(&fresh_a, &first));
    assert_eq!(fresh_b.dsn, "postgres://replica/app");

    let after = registry.get::<Connection>("db").unwrap();
    assert!(Arc::ptr_eq(&after, &first));
    assert_eq!(after.dsn, "postgres://localhost/app");
    assert_eq!(built.load(Ordering::SeqCst), 3);
}

#[test]
fn test_transient_law() {
    let registry = Registry::new();
    let built = Arc::new(AtomicUsize::new(0));
    registry.set("db", Strategy::transient(connection_factory(&built)));

    let a = registry.get::<Connection>("db").unwrap();
    let b = registry.get::<Connection>("db").unwrap();
    let c = registry.make::<Connection>("db", Params::new()).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&b, &c));
    assert_eq!(built.load(Ordering::SeqCst), 3);
}

#[test]
fn test_missing_binding() {
    let registry = Registry::new();
    assert!(!registry.has("nonexistent"));
    let err = registry.get::<Connection>("nonexistent").unwrap_err();
    assert!(matches!(err, ContainerError::NotFound(ref name) if name == "nonexistent"));
}

#[test]
#[serial]
fn test_full_lifecycle() {
    let kernel = Kernel::builder().config(common::quiet_config()).build().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));

    kernel.set("db", Strategy::value(Connection { dsn: "sqlite::memory:".into() }));
    let log = Arc::clone(&events);
    kernel.add_method::<Connection, BoxError, _>("open", move |conn, _kernel, _resolver| {
        log.lock().unwrap().push(format!("open {}", conn.dsn));
        Ok(())
    });
    let log = Arc::clone(&events);
    kernel.add_method::<Connection, BoxError, _>("close", move |conn, _kernel, _resolver| {
        log.lock().unwrap().push(format!("close {}", conn.dsn));
        Ok(())
    });

    kernel.add_run(ActionDescriptor::named_dispatch("db", "open")).unwrap();
    kernel.add_terminate(ActionDescriptor::named_dispatch("db", "close")).unwrap();

    kernel.run().unwrap();
    assert_eq!(kernel.interceptor().inspect_exit(), Disposition::Clean);
    kernel.terminate().unwrap();

    assert_eq!(
        *events.lock().unwrap(),
        vec!["open sqlite::memory:".to_string(), "close sqlite::memory:".to_string()]
    );
}

#[test]
#[serial]
fn test_second_kernel_is_rejected() {
    let kernel = Kernel::builder().config(common::quiet_config()).build().unwrap();
    let err = Kernel::builder().config(common::quiet_config()).build().unwrap_err();
    assert!(matches!(err, KernelError::AlreadyInitialized));

    let via_alias = kernel.get::<Arc<Kernel>>("app").unwrap();
    assert!(Arc::ptr_eq(&*via_alias, &kernel));
}

#[test]
#[serial]
fn test_crash_path_reports_and_skips_terminate() {
    let alerts = Arc::new(Alerts::default());
    let kernel = Kernel::builder()
        .config(common::quiet_config())
        .bind("logger", reporter_binding(SharedAlerts(Arc::clone(&alerts))))
        .build()
        .unwrap();
    let output = common::Capture::default();
    kernel.interceptor().set_output(Box::new(output.clone()));

    let flag = Arc::new(AtomicBool::new(false));
    let set = Arc::clone(&flag);
    kernel
        .add_terminate(Action::call(move |_kernel, _resolver| {
            set.store(true, Ordering::SeqCst);
            Ok::<(), BoxError>(())
        }))
        .unwrap();

    let failure: Result<(), KernelError> = kernel.run().and_then(|()| {
        Err(KernelError::InvalidAction("simulated host failure".to_string()))
    });
    let disposition = kernel
        .interceptor()
        .intercept(&NormalizedError::uncaught(failure.unwrap_err()));

    assert_eq!(disposition.exit_code(), 1);
    assert!(!flag.load(Ordering::SeqCst));
    assert!(output.contents().contains("invalid action: simulated host failure"));
    assert_eq!(
        *alerts.0.lock().unwrap(),
        vec!["message: invalid action: simulated host failure".to_string()]
    );

    // A later explicit terminate is still possible for the host.
    kernel.terminate().unwrap();
    assert!(flag.load(Ordering::SeqCst));
}
