use std::sync::Arc;
use std::sync::Mutex;

use troth::{InlineDrive, Promise, QueueDrive};

#[test]
fn inline_drive_runs_the_callback_synchronously_with_if_done() {
    let promise = Promise::<i32>::new();
    let seen = Arc::new(Mutex::new(None));
    let seen2 = seen.clone();
    promise.on(InlineDrive, move |v| *seen2.lock().unwrap() = Some(v));
    promise.set(6);
    assert_eq!(*seen.lock().unwrap(), Some(6));
}

#[test]
fn queue_drive_defers_the_callback_until_run_all() {
    let promise = Promise::<i32>::new();
    let driver = Arc::new(QueueDrive::new());
    let seen = Arc::new(Mutex::new(None));
    let seen2 = seen.clone();

    promise.on(driver.clone(), move |v| *seen2.lock().unwrap() = Some(v));
    promise.set(6);

    // set() completed, but the handoff means the user callback has not run yet.
    assert!(seen.lock().unwrap().is_none());
    assert_eq!(driver.pending(), 1);

    driver.run_all();
    assert_eq!(*seen.lock().unwrap(), Some(6));
}

#[test]
fn on_registered_after_completion_still_hands_off_through_the_driver() {
    let promise = Promise::<i32>::new();
    promise.set(6);

    let driver = Arc::new(QueueDrive::new());
    let seen = Arc::new(Mutex::new(None));
    let seen2 = seen.clone();
    promise.on(driver.clone(), move |v| *seen2.lock().unwrap() = Some(v));

    assert!(seen.lock().unwrap().is_none());
    driver.run_all();
    assert_eq!(*seen.lock().unwrap(), Some(6));
}
