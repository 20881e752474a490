//! A toy stand-in for `client::close()` in the networking toolkit this
//! primitive was pulled out of: a producer (here, a background thread
//! standing in for an event-loop executor) creates a promise, does some
//! work, and settles it exactly once. The consumer can block on it or hang
//! a listener off it — it never needs to know which.

use std::fmt;
use std::thread;
use std::time::Duration;

use troth::{Promise, INLINE};

/// Outcome of a dial attempt. `Pending` is the `Default` value, so a
/// cancelled or not-yet-settled promise still has something sensible to
/// hand back from `get_timeout`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum DialOutcome {
    #[default]
    Pending,
    Connected(String),
    Refused(String),
}

impl fmt::Display for DialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialOutcome::Pending => f.write_str("pending"),
            DialOutcome::Connected(host) => write!(f, "connected to {host}"),
            DialOutcome::Refused(host) => write!(f, "refused by {host}"),
        }
    }
}

/// Simulates dialing a remote host: hands back a promise immediately and
/// settles it from a worker thread once the "connection" resolves.
fn dial(host: &'static str, should_fail: bool) -> std::sync::Arc<Promise<DialOutcome>> {
    let promise = Promise::new();
    let producer = promise.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        if should_fail {
            producer.set(DialOutcome::Refused(host.to_string()));
        } else {
            producer.set(DialOutcome::Connected(host.to_string()));
        }
    });
    promise
}

fn main() {
    tracing_subscriber::fmt::init();

    let ok = dial("example.invalid", false);
    ok.on(*INLINE, |outcome| println!("listener saw: {outcome}"));
    println!("blocking wait: {}", ok.get());

    let failed = dial("unreachable.invalid", true);
    println!("blocking wait: {}", failed.get());
}
