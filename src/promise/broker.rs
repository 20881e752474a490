//! The listener broker nested inside every [`super::Promise`].
//!
//! An ordered bag of one-shot, type-erased completion callbacks. Neither
//! `bind` nor `drain_invoke` is thread-safe on its own; the enclosing cell's
//! mutex serializes both, which is also what makes "registered before
//! completion" and "registered after completion" resolve to the same
//! exactly-once guarantee (see [`super::Promise::if_done`]).

use std::any::Any;

type Callee<V> = Box<dyn FnOnce(V) + Send>;

pub(super) struct Listeners<V> {
    callees: Vec<Callee<V>>,
}

impl<V> Listeners<V> {
    pub(super) fn new() -> Listeners<V> {
        Listeners { callees: Vec::new() }
    }

    pub(super) fn bind(&mut self, callee: Callee<V>) {
        self.callees.push(callee);
    }
}

impl<V: Clone> Listeners<V> {
    /// Swap the callee list out for an empty one, then invoke each captured
    /// callback in registration order with its own clone of `v`. Swapping
    /// out first means a listener that registers another listener (e.g.
    /// chaining `if_done` calls) doesn't observe or disturb the batch
    /// currently firing.
    ///
    /// A listener that panics is caught and reported rather than allowed to
    /// poison the remaining listeners in the batch.
    pub(super) fn drain_invoke(&mut self, v: V) -> usize {
        let callees = std::mem::take(&mut self.callees);
        let fired = callees.len();
        for (index, callee) in callees.into_iter().enumerate() {
            let value = v.clone();
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callee(value)));
            if let Err(payload) = outcome {
                tracing::error!(
                    listener_index = index,
                    detail = %panic_detail(&payload),
                    "listener panicked during promise dispatch",
                );
            }
        }
        fired
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
