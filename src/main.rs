//! Demo host for the application kernel.
//!
//! Binds a greeter, says hello as a startup action, prints
//! `shutdown complete` as a shutdown action, and exits through the kernel.
//! `--crash` triggers one of the failure paths instead of a clean exit.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use app_kernel::config::load_config;
use app_kernel::failure::{reporter_binding, TracingReporter};
use app_kernel::{Action, ActionDescriptor, BoxError, Condition, Kernel, Severity, Strategy};

#[derive(Parser)]
#[command(name = "app-kernel")]
#[command(about = "Run the application kernel demo", long_about = None)]
struct Cli {
    /// Application root (config is read from <base>/config/kernel.toml)
    #[arg(short, long)]
    base_path: Option<PathBuf>,

    /// Explicit config file, overrides the base path lookup
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fail after the startup actions ran
    #[arg(long, value_enum)]
    crash: Option<Crash>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Crash {
    /// Panic on the main thread
    Panic,
    /// Return an error from the host
    Error,
    /// Report a severe runtime condition
    Condition,
    /// Record a fatal condition, detected at exit
    Fatal,
    /// Panic inside `catch_unwind` and carry on
    Recovered,
}

struct Greeter {
    greeting: String,
}

impl Greeter {
    fn hello(&self) -> &str {
        &self.greeting
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder = Kernel::builder()
        .init_logging(true)
        .bind(
            "greeter",
            Strategy::singleton(|resolver| {
                let greeting = resolver.param_or("greeting", 0, String::from("hi"));
                Ok::<_, BoxError>(Greeter {
                    greeting: greeting.to_string(),
                })
            }),
        )
        .bind("logger", reporter_binding(TracingReporter));
    if let Some(base_path) = cli.base_path {
        builder = builder.base_path(base_path);
    }
    if let Some(path) = cli.config {
        match load_config(&path) {
            Ok(config) => builder = builder.config(config),
            Err(e) => {
                eprintln!("failed to load {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        }
    }

    let kernel = match builder.build() {
        Ok(kernel) => kernel,
        Err(e) => {
            eprintln!("failed to start kernel: {}", e);
            return ExitCode::from(2);
        }
    };

    kernel.supervise(|| bootstrap(&kernel, cli.crash))
}

fn bootstrap(kernel: &Arc<Kernel>, crash: Option<Crash>) -> Result<(), BoxError> {
    kernel.add_method::<Greeter, BoxError, _>("hello", |greeter, _kernel, _resolver| {
        println!("{}", greeter.hello());
        Ok(())
    });
    kernel.add_run(ActionDescriptor::named_dispatch("greeter", "hello"))?;
    kernel.add_terminate(Action::call(|_kernel, _resolver| {
        println!("shutdown complete");
        Ok::<(), BoxError>(())
    }))?;
    kernel.listen_for_signals()?;

    kernel.run()?;

    match crash {
        Some(Crash::Panic) => panic!("demo panic requested"),
        Some(Crash::Error) => return Err("demo error requested".into()),
        Some(Crash::Condition) => {
            kernel
                .interceptor()
                .handle_condition(Condition::new(Severity::Error, "demo runtime error"))?;
        }
        Some(Crash::Fatal) => kernel
            .interceptor()
            .record(Condition::new(Severity::Fatal, "demo fatal condition")),
        Some(Crash::Recovered) => {
            let caught = std::panic::catch_unwind(|| panic!("demo panic recovered"));
            println!("recovered: {}", caught.is_err());
        }
        None => {}
    }
    Ok(())
}
