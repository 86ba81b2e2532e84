use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use rover_hardware::error::HwError;
use rover_hardware::util::wait_while_with_timeout;

#[test]
fn wait_while_returns_when_level_changes() {
    let high = Arc::new(AtomicBool::new(true));
    let high_bg = high.clone();
    // Flip low after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        high_bg.store(false, Ordering::Relaxed);
    });

    let started = Instant::now();
    let res = wait_while_with_timeout(
        || high.load(Ordering::Relaxed),
        Duration::from_millis(200),
        Duration::from_micros(200),
    );
    let at = res.expect("expected level change");
    assert!(at >= started);
}

#[test]
fn wait_while_times_out() {
    let high = Arc::new(AtomicBool::new(true));

    let err = wait_while_with_timeout(
        || high.load(Ordering::Relaxed),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::LevelTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn spinning_wait_is_bounded() {
    let started = Instant::now();
    let err = wait_while_with_timeout(|| true, Duration::from_millis(5), Duration::ZERO);
    assert!(err.is_err());
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn condition_already_false_returns_immediately() {
    let res = wait_while_with_timeout(|| false, Duration::ZERO, Duration::ZERO);
    assert!(res.is_ok());
}
