//! The single-assignment result cell: [`Promise`].

mod broker;

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use broker::Listeners;
use crate::drive::Drive;
use crate::error::{PromiseError, SettledState};

const IDLE: u8 = 0;
const DONE: u8 = 1;
const CANCELLED: u8 = 2;

struct Inner<V> {
    value: Option<V>,
    listeners: Listeners<V>,
}

/// A single-assignment result cell with blocking waiters, completion
/// listeners, and cancellation.
///
/// `Promise<V>` is created `Idle`, reaches `Done` via [`set`](Promise::set)
/// or `Cancelled` via [`cancel`](Promise::cancel) at most once, and is meant
/// to be shared between a producer and any number of consumers via the
/// `Arc` returned from [`Promise::new`]. Consumers either block with
/// [`get`](Promise::get)/[`wait`](Promise::wait)/
/// [`wait_timeout`](Promise::wait_timeout), or register a completion
/// listener with [`if_done`](Promise::if_done).
pub struct Promise<V> {
    state: AtomicU8,
    inner: Mutex<Inner<V>>,
    cond: Condvar,
    waiters: AtomicUsize,
}

impl<V> Promise<V>
where
    V: Clone + Default + Send + 'static,
{
    /// Create a new `Idle` cell, shared-ownership wrapped the way every
    /// producer/consumer pair in this toolkit expects to hand a promise
    /// around.
    pub fn new() -> Arc<Promise<V>> {
        Arc::new(Promise {
            state: AtomicU8::new(IDLE),
            inner: Mutex::new(Inner {
                value: Some(V::default()),
                listeners: Listeners::new(),
            }),
            cond: Condvar::new(),
            waiters: AtomicUsize::new(0),
        })
    }

    /// Transition `Idle -> Done`, storing `v`, waking waiters, and invoking
    /// every registered listener in order.
    ///
    /// # Panics
    ///
    /// Panics if this cell has already settled (via `set` or `cancel`).
    /// Calling `set` twice is a programmer error, not a recoverable
    /// condition; racing producers that need to tolerate losing a race
    /// should use [`try_set`](Promise::try_set) instead.
    pub fn set(&self, v: V) {
        if let Err(err) = self.try_set(v) {
            tracing::error!(error = %err, "set called twice on the same promise");
            panic!("{err}");
        }
    }

    /// Copying counterpart to [`set`](Promise::set), for call sites that
    /// still need `v` afterward. Equivalent to `self.set(v.clone())`.
    ///
    /// # Panics
    ///
    /// Same condition as [`set`](Promise::set).
    pub fn set_cloned(&self, v: &V) {
        self.set(v.clone());
    }

    /// Fallible version of [`set`](Promise::set): returns
    /// `Err(PromiseError::AlreadySettled)` instead of panicking if the cell
    /// had already reached a terminal state (including having lost a race
    /// against a concurrent [`cancel`](Promise::cancel)).
    pub fn try_set(&self, v: V) -> Result<(), PromiseError> {
        let mut inner = self.inner.lock();
        let current = self.state.load(Ordering::Acquire);
        if current != IDLE {
            return Err(PromiseError::AlreadySettled { state: settled_state(current) });
        }

        // Write the value while the cell is still logically `Idle`; the
        // `Release` store below is what publishes this write to any thread
        // that later observes `Done` via `Acquire` without taking the lock.
        inner.value = Some(v);
        self.state.store(DONE, Ordering::Release);

        let value = inner.value.clone().expect("done cell must hold a value");
        inner.listeners.drain_invoke(value);
        drop(inner);

        if self.waiters.load(Ordering::Relaxed) > 0 {
            self.cond.notify_all();
        }
        tracing::debug!("promise settled");
        Ok(())
    }

    /// Transition `Idle -> Cancelled`, invoking listeners with
    /// `V::default()` and waking waiters. Returns `true` iff this call
    /// performed the transition; returns `false` without side effects if
    /// the cell had already settled.
    pub fn cancel(&self) -> bool {
        let mut inner = self.inner.lock();
        if self.state.load(Ordering::Acquire) != IDLE {
            return false;
        }

        inner.value = Some(V::default());
        self.state.store(CANCELLED, Ordering::Release);

        let value = inner.value.clone().expect("cancelled cell must hold a value");
        inner.listeners.drain_invoke(value);
        drop(inner);

        if self.waiters.load(Ordering::Relaxed) > 0 {
            self.cond.notify_all();
        }
        tracing::debug!("promise cancelled");
        true
    }

    /// Block until the cell is terminal, then return a clone of the value
    /// (the default value if cancelled).
    pub fn get(&self) -> V {
        self.wait();
        self.snapshot()
    }

    /// Block until the cell is terminal or `timeout` elapses, whichever
    /// comes first. The returned value is always valid: check
    /// [`is_done`](Promise::is_done)/[`is_cancelled`](Promise::is_cancelled)
    /// to tell a real result apart from a timeout snapshot of the default.
    pub fn get_timeout(&self, timeout: Duration) -> V {
        self.wait_timeout(timeout);
        self.snapshot()
    }

    fn snapshot(&self) -> V {
        self.inner.lock().value.clone().expect("promise value slot is always populated")
    }

    /// Block until the cell becomes terminal.
    pub fn wait(&self) {
        if self.state.load(Ordering::Acquire) != IDLE {
            return;
        }
        let span = tracing::trace_span!("promise_wait");
        let _entered = span.enter();

        let mut inner = self.inner.lock();
        while self.state.load(Ordering::Acquire) == IDLE {
            self.waiters.fetch_add(1, Ordering::Relaxed);
            self.cond.wait(&mut inner);
            self.waiters.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Block until the cell becomes terminal or `timeout` elapses. The
    /// deadline is computed once on entry and is not restarted by spurious
    /// wakes. Returns `true` if the cell reached a terminal state before
    /// the deadline, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.state.load(Ordering::Acquire) != IDLE {
            return true;
        }

        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if self.state.load(Ordering::Acquire) != IDLE {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.waiters.fetch_add(1, Ordering::Relaxed);
            let timed_out = self.cond.wait_for(&mut inner, deadline - now).timed_out();
            self.waiters.fetch_sub(1, Ordering::Relaxed);
            if timed_out && self.state.load(Ordering::Acquire) == IDLE {
                return false;
            }
        }
    }

    /// Register a completion listener.
    ///
    /// If the cell is already terminal, `callback` is invoked synchronously,
    /// on the caller's thread, before this method returns. Otherwise it is
    /// appended to the listener list and fires later, on whichever thread
    /// calls `set`/`cancel`, in registration order alongside every other
    /// listener bound before completion.
    pub fn if_done(&self, callback: impl FnOnce(V) + Send + 'static) {
        let mut inner = self.inner.lock();
        inner.listeners.bind(Box::new(callback));
        if self.state.load(Ordering::Acquire) != IDLE {
            let value = inner.value.clone().expect("terminal cell must hold a value");
            inner.listeners.drain_invoke(value);
        }
    }

    /// Like [`if_done`](Promise::if_done), but hands the callback to `drive`
    /// for execution instead of running it wherever `if_done` happens to
    /// fire. Use this when the callback must run on a specific executor
    /// thread rather than on the setter's thread.
    pub fn on<D>(&self, drive: D, callback: impl FnOnce(V) + Send + 'static)
    where
        D: Drive + Send + 'static,
    {
        self.if_done(move |v| {
            drive.execute(Box::new(move || callback(v)));
        });
    }

    /// `true` if the cell has not yet settled.
    pub fn is_idle(&self) -> bool {
        self.state.load(Ordering::Acquire) == IDLE
    }

    /// `true` if the cell settled via [`set`](Promise::set).
    pub fn is_done(&self) -> bool {
        self.state.load(Ordering::Acquire) == DONE
    }

    /// `true` if the cell settled via [`cancel`](Promise::cancel).
    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == CANCELLED
    }
}

fn settled_state(tag: u8) -> SettledState {
    match tag {
        DONE => SettledState::Done,
        CANCELLED => SettledState::Cancelled,
        _ => unreachable!("settled_state called on a non-terminal tag"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering as AOrdering};
    use std::sync::Mutex as StdMutex;
    use std::thread;

    #[test]
    fn basic_complete_then_wait() {
        let promise = Promise::<i32>::new();
        let consumer = promise.clone();
        let handle = thread::spawn(move || {
            consumer.wait();
            consumer.get()
        });
        thread::sleep(Duration::from_millis(20));
        promise.set(42);
        assert_eq!(handle.join().unwrap(), 42);
        assert!(promise.is_done());
    }

    #[test]
    fn listeners_fire_with_correct_value_in_order() {
        let promise = Promise::<i32>::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        for _ in 0..3 {
            let seen = seen.clone();
            promise.if_done(move |v| seen.lock().unwrap().push(v));
        }
        promise.set(7);
        assert_eq!(*seen.lock().unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn late_listener_fires_synchronously() {
        let promise = Promise::<&'static str>::new();
        promise.set("done");
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        promise.if_done(move |v| {
            assert_eq!(v, "done");
            fired2.store(true, AOrdering::SeqCst);
        });
        assert!(fired.load(AOrdering::SeqCst));
    }

    #[test]
    #[should_panic(expected = "already settled")]
    fn double_set_panics() {
        let promise = Promise::<i32>::new();
        promise.set(1);
        assert_eq!(promise.get(), 1);
        promise.set(2);
    }

    #[test]
    fn set_cloned_leaves_caller_a_usable_copy() {
        let promise = Promise::<String>::new();
        let v = String::from("resolved");
        promise.set_cloned(&v);
        assert_eq!(v, "resolved");
        assert_eq!(promise.get(), "resolved");
    }

    #[test]
    fn try_set_reports_already_settled_instead_of_panicking() {
        let promise = Promise::<i32>::new();
        promise.set(1);
        let err = promise.try_set(2).unwrap_err();
        assert!(matches!(err, PromiseError::AlreadySettled { state: SettledState::Done }));
    }

    #[test]
    fn timeout_then_complete() {
        let promise = Promise::<i32>::new();
        let before = Instant::now();
        let completed = promise.wait_timeout(Duration::from_millis(30));
        assert!(!completed);
        assert!(before.elapsed() >= Duration::from_millis(30));
        assert!(promise.is_idle());

        promise.set(9);
        assert_eq!(promise.get(), 9);
    }

    #[test]
    fn cancel_races_with_set() {
        for _ in 0..50 {
            let promise = Promise::<i32>::new();
            let a = promise.clone();
            let b = promise.clone();
            let t1 = thread::spawn(move || a.cancel());
            let t2 = thread::spawn(move || b.try_set(5));

            let cancelled = t1.join().unwrap();
            let set_result = t2.join().unwrap();

            assert_ne!(cancelled, set_result.is_ok());
            if cancelled {
                assert!(promise.is_cancelled());
                assert_eq!(promise.get(), 0);
            } else {
                assert!(promise.is_done());
                assert_eq!(promise.get(), 5);
            }
        }
    }

    #[test]
    fn wait_for_zero_on_idle_cell_returns_promptly() {
        let promise = Promise::<i32>::new();
        let before = Instant::now();
        let completed = promise.wait_timeout(Duration::from_millis(0));
        assert!(!completed);
        assert!(before.elapsed() < Duration::from_millis(50));
        assert!(promise.is_idle());
    }

    #[test]
    fn zero_listeners_zero_waiters_set_completes() {
        let promise = Promise::<i32>::new();
        promise.set(1);
        assert!(promise.is_done());
    }

    #[test]
    fn on_hands_callback_to_driver_instead_of_running_inline() {
        use crate::drive::QueueDrive;

        let promise = Promise::<i32>::new();
        let driver = Arc::new(QueueDrive::new());
        let seen = Arc::new(StdMutex::new(None));
        let seen2 = seen.clone();
        promise.on(driver.clone(), move |v| *seen2.lock().unwrap() = Some(v));
        promise.set(11);

        // The listener ran under if_done's lock, but the user callback was
        // handed to the driver instead of running immediately.
        assert!(seen.lock().unwrap().is_none());
        assert_eq!(driver.pending(), 1);

        driver.run_all();
        assert_eq!(*seen.lock().unwrap(), Some(11));
    }
}
