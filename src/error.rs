//! Error types for the promise primitive.

use std::fmt;

/// Errors produced by [`crate::Promise`] operations.
///
/// `AlreadySettled` is the only error a well-behaved producer should ever
/// see; it exists so racing producers can use [`crate::Promise::try_set`]
/// instead of triggering the panic that `set` raises on the same condition.
#[derive(Debug, thiserror::Error)]
pub enum PromiseError {
    /// `set`/`try_set` was called on a cell that had already left `Idle`.
    #[error("promise set called twice: already settled as {state}")]
    AlreadySettled { state: SettledState },

    /// A registered listener panicked while being invoked. The panic is
    /// caught and reported through this variant rather than propagated,
    /// since `if_done` has no caller-side `Result` to hand it back through.
    #[error("listener panicked: {detail}")]
    ListenerPanicked { detail: String },
}

/// The terminal state a cell had already reached when a second `set` arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettledState {
    Done,
    Cancelled,
}

impl fmt::Display for SettledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettledState::Done => f.write_str("done"),
            SettledState::Cancelled => f.write_str("cancelled"),
        }
    }
}
