//! Executor handoff: the contract a [`crate::Promise`] listener uses to hop
//! onto a specific thread instead of running inline under the cell's mutex.
//!
//! The cell itself never depends on `Drive`. It publishes its value under a
//! lock before invoking listeners, so any listener invoked directly already
//! observes a consistent `value`. `Drive` exists for consumers who need their
//! callback to run on a *particular* thread (an event-loop thread, typically)
//! rather than on whichever thread happened to call `set`/`cancel`/`if_done`.

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

/// Implemented by executors that can accept a type-erased unit of work and
/// guarantee it runs serialized with respect to everything else submitted to
/// the same driver.
///
/// A `Drive` implementation that drops a submitted task without running it
/// is incorrectly implemented: callers may be relying on that task to wake a
/// waiter or release resources captured by the closure.
pub trait Drive {
    /// Submit `task` for serialized execution. Must not block the caller
    /// indefinitely; drivers backed by a bounded queue should still accept
    /// the task (e.g. by growing the queue) rather than deadlock the
    /// submitter, since the submitter may itself be the only thread that
    /// would otherwise drive the executor forward.
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// A driver that runs every submitted task synchronously on the submitter's
/// thread. Useful for tests and for single-threaded consumers that have no
/// real event loop to hop onto.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDrive;

impl Drive for InlineDrive {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        task();
    }
}

/// The default driver used by consumers who have no event loop of their own
/// and just want `if_done`-like semantics without repeating `InlineDrive`
/// everywhere. Lazily constructed on first use.
pub static INLINE: Lazy<InlineDrive> = Lazy::new(InlineDrive::default);

/// Any `Arc`-shared driver is itself a driver, so consumers can hold onto
/// `Arc<SomeDriver>` and pass cheap clones to [`crate::Promise::on`] without
/// an extra adapter type.
impl<D: Drive + ?Sized> Drive for Arc<D> {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        (**self).execute(task);
    }
}

/// A driver that queues tasks instead of running them, for tests that want
/// to assert on ordering or deferred execution. Call [`QueueDrive::run_all`]
/// to drain and execute everything submitted so far, in submission order.
#[derive(Default)]
pub struct QueueDrive {
    queue: Mutex<Vec<Box<dyn FnOnce() + Send + 'static>>>,
}

impl QueueDrive {
    pub fn new() -> QueueDrive {
        QueueDrive::default()
    }

    /// Drain and run every task queued so far, in submission order. Tasks
    /// submitted by a task while it runs are not picked up by this call.
    pub fn run_all(&self) {
        let tasks = std::mem::take(&mut *self.queue.lock().unwrap());
        for task in tasks {
            task();
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

impl Drive for QueueDrive {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        self.queue.lock().unwrap().push(task);
    }
}
