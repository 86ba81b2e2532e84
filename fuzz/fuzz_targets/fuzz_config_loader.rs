#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    let Ok(cfg) = rover_config::load_toml(data) else {
        return;
    };
    let file_ok = cfg.validate().is_ok();
    let runtime = rover_core::RoverCfg::from(&cfg);
    let runtime_ok = runtime.validate().is_ok();
    // A file that passed validation must yield a runtime config the
    // supervisor accepts.
    if file_ok {
        assert!(runtime_ok, "validated file rejected at runtime: {cfg:?}");
    }
    let _ = rover_core::max_step_duration(&runtime.control);
});
