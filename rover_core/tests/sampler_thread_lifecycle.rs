//! Sampler thread lifecycle: the loop ends on shutdown or release, and
//! sensor errors never end it.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rover_core::mocks::{NoopRangeSensor, ScriptedRangeSensor};
use rover_core::{HazardQueue, RangeSampler, SamplerCfg, SensorHandle, SharedState, ShutdownSignal};
use rover_traits::clock::MonotonicClock;
use rover_traits::clock::manual::ManualClock;

fn fast_cfg() -> SamplerCfg {
    SamplerCfg {
        period: Duration::from_millis(2),
        sensor_timeout: Duration::from_millis(5),
        error_backoff: Duration::from_millis(2),
        ..SamplerCfg::default()
    }
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn sampler_thread_exits_on_shutdown() {
    let shutdown = ShutdownSignal::new();
    let sampler = RangeSampler::new(fast_cfg(), SharedState::new(), HazardQueue::new(1));
    let sensor = SensorHandle::new(Box::new(NoopRangeSensor));
    let sd = shutdown.clone();
    let handle = thread::spawn(move || sampler.run(&sensor, &MonotonicClock::new(), &sd));

    thread::sleep(Duration::from_millis(20));
    let started = Instant::now();
    shutdown.trigger();
    handle.join().expect("no panic").expect("clean exit");
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[test]
fn sampler_exits_when_sensor_is_released() {
    let shutdown = ShutdownSignal::new();
    let sampler = RangeSampler::new(fast_cfg(), SharedState::new(), HazardQueue::new(1));
    let sensor = SensorHandle::new(Box::new(NoopRangeSensor));
    let in_thread = sensor.clone();
    let sd = shutdown.clone();
    let handle = thread::spawn(move || sampler.run(&in_thread, &MonotonicClock::new(), &sd));

    assert!(sensor.try_release_within(Duration::from_millis(500)));
    assert!(sensor.is_released());
    handle.join().expect("no panic").expect("clean exit");
    assert!(!shutdown.is_triggered());
}

#[test]
fn sensor_errors_back_off_and_continue() {
    let shutdown = ShutdownSignal::new();
    let state = SharedState::new();
    let cfg = SamplerCfg {
        error_backoff: Duration::from_millis(7),
        ..fast_cfg()
    };
    let sampler = RangeSampler::new(cfg, state.clone(), HazardQueue::new(1));
    let script = ScriptedRangeSensor::new([
        Err("gpio busy"),
        Err("echo timeout"),
        Ok(Some(80.0)),
    ])
    .then(90.0);
    let sensor = SensorHandle::new(Box::new(script));
    let clock = ManualClock::new();
    let sd = shutdown.clone();
    let c = clock.clone();
    let handle = thread::spawn(move || sampler.run(&sensor, &c, &sd));

    assert!(wait_for(|| state.snapshot().accepted >= 2));
    shutdown.trigger();
    handle.join().expect("no panic").expect("clean exit");

    // Two backoffs first, then regular periods.
    let sleeps = clock.sleeps();
    assert_eq!(
        sleeps[..3],
        [
            Duration::from_millis(7),
            Duration::from_millis(7),
            Duration::from_millis(2)
        ]
    );
    assert!((state.read().cm() - 90.0).abs() < 1e-9);
}

#[test]
fn repeated_samplers_do_not_leak_threads() {
    for _ in 0..10 {
        let shutdown = ShutdownSignal::new();
        let queue = HazardQueue::new(1);
        let sampler = RangeSampler::new(fast_cfg(), SharedState::new(), queue.clone());
        let sensor = SensorHandle::new(Box::new(ScriptedRangeSensor::readings([5.0]).then(5.0)));
        let sd = shutdown.clone();
        let clock = Arc::new(MonotonicClock::new());
        let handle = thread::spawn(move || sampler.run(&sensor, &*clock, &sd));
        assert!(wait_for(|| !queue.is_empty()));
        shutdown.trigger();
        handle.join().expect("no panic").expect("clean exit");
        assert_eq!(queue.len(), 1);
    }
}
