//! Shared utilities for integration tests.

use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

use app_kernel::KernelConfig;

/// In-memory sink for the interceptor's operational output.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Kernel config that leaves the test harness's panic reporting alone.
#[allow(dead_code)]
pub fn quiet_config() -> KernelConfig {
    let mut config = KernelConfig::default();
    config.failure.install_panic_hook = false;
    config
}

/// Run the demo binary with `args`, rooted at `base`.
#[allow(dead_code)]
pub fn run_demo(base: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_app-kernel"))
        .arg("--base-path")
        .arg(base)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to spawn app-kernel")
}
