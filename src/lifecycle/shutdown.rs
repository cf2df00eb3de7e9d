//! Shutdown coordination for the kernel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use tokio::sync::broadcast;

/// Exactly-once termination guard.
///
/// Flips once, before any shutdown action runs, and notifies subscribers.
/// The flip is never rolled back, even when a shutdown action fails.
/// Callers that lost the race can wait for the winner with [`wait`](Self::wait).
pub struct Shutdown {
    /// Whether termination has begun.
    terminated: AtomicBool,

    /// Whether the winner finished its shutdown actions.
    finished: Mutex<bool>,
    done: Condvar,

    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            terminated: AtomicBool::new(false),
            finished: Mutex::new(false),
            done: Condvar::new(),
            tx,
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Claim the termination. Only the first caller gets `true`.
    pub fn begin(&self) -> bool {
        let first = self
            .terminated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            let _ = self.tx.send(());
        }
        first
    }

    /// Mark the shutdown actions as done and wake waiters.
    pub fn finish(&self) {
        *self.finished.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.done.notify_all();
    }

    /// Block until [`finish`](Self::finish) was called. Returns immediately
    /// when termination has not begun.
    pub fn wait(&self) {
        if !self.is_terminated() {
            return;
        }
        let finished = self.finished.lock().unwrap_or_else(PoisonError::into_inner);
        let _finished = self
            .done
            .wait_while(finished, |finished| !*finished)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Whether termination has begun.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Get the number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_begin_once() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        assert!(shutdown.begin());
        assert!(!shutdown.begin());
        assert!(shutdown.is_terminated());

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_concurrent_begin_has_one_winner() {
        let shutdown = Arc::new(Shutdown::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shutdown = Arc::clone(&shutdown);
                std::thread::spawn(move || shutdown.begin())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_wait_blocks_until_finished() {
        let shutdown = Arc::new(Shutdown::new());
        shutdown.wait();

        assert!(shutdown.begin());
        let finished = Arc::new(AtomicBool::new(false));
        let waiter = {
            let shutdown = Arc::clone(&shutdown);
            let finished = Arc::clone(&finished);
            std::thread::spawn(move || {
                shutdown.wait();
                finished.load(Ordering::SeqCst)
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(50));
        finished.store(true, Ordering::SeqCst);
        shutdown.finish();
        assert!(waiter.join().unwrap());
    }
}
