//! A toy timer consumer: demonstrates `wait_timeout` racing a producer, and
//! cancellation of a promise nobody will ever settle ("no producer will
//! ever set this", per the primitive's escape-hatch use case).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use troth::Promise;

fn main() {
    tracing_subscriber::fmt::init();

    let fires_late = Promise::<&'static str>::new();
    let producer = fires_late.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(80));
        producer.set("tick");
    });

    if !fires_late.wait_timeout(Duration::from_millis(20)) {
        println!("timer hadn't fired yet, waiting the rest of the way");
    }
    println!("timer result: {}", fires_late.get());

    // A promise that will never be set by any producer gets cancelled
    // instead, which releases every waiter with the default value.
    let abandoned: Arc<Promise<i32>> = Promise::new();
    let waiter_saw_cancellation = Arc::new(AtomicBool::new(false));
    let flag = waiter_saw_cancellation.clone();
    let consumer = abandoned.clone();
    let handle = thread::spawn(move || {
        consumer.wait();
        flag.store(consumer.is_cancelled(), Ordering::SeqCst);
    });

    assert!(abandoned.cancel());
    handle.join().unwrap();
    println!(
        "abandoned promise observed as cancelled: {}",
        waiter_saw_cancellation.load(Ordering::SeqCst)
    );
}
