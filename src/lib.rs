//! `troth` is the single-assignment result cell that every async path in a
//! networking toolkit shares: a dial, a write, a close, an HTTP request, a
//! timer — each creates a [`Promise`], hands it to its caller, and
//! terminates it exactly once.
//!
//! The cell couples three concerns under one lock: thread-safe one-shot
//! state transitions, blocking waiters with timeout, and ordered listener
//! dispatch. It does not know about sockets, TLS, or HTTP — those are
//! consumers, illustrated (not shipped) under `demos/` in this repository.
//!
//! ```
//! use std::thread;
//! use troth::Promise;
//!
//! let promise = Promise::<i32>::new();
//! let consumer = promise.clone();
//! let handle = thread::spawn(move || consumer.get());
//!
//! promise.set(42);
//! assert_eq!(handle.join().unwrap(), 42);
//! ```

mod drive;
mod error;
mod promise;

pub use drive::{Drive, InlineDrive, QueueDrive, INLINE};
pub use error::{PromiseError, SettledState};
pub use promise::Promise;
