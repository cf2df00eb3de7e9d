//! Memory margin held for out-of-memory handling.

use std::sync::Mutex;
use std::sync::PoisonError;

/// Pre-allocated scratch buffer released when the exit check starts,
/// so rendering and reporting an out-of-memory failure has room to run.
#[derive(Debug, Default)]
pub struct MemoryReserve {
    buffer: Mutex<Option<Vec<u8>>>,
}

impl MemoryReserve {
    /// Create an empty reserve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and touch `bytes` of memory. Zero leaves the reserve empty.
    pub fn acquire(&self, bytes: usize) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        // Filled rather than zeroed so the pages are actually committed.
        *buffer = (bytes > 0).then(|| vec![b'x'; bytes]);
    }

    /// Drop the buffer. Returns the number of bytes released.
    pub fn release(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map_or(0, |buffer| buffer.len())
    }

    /// Bytes currently held.
    pub fn held(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Vec::len)
    }
}
