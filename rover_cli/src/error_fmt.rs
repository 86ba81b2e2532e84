//! Human-readable error descriptions and structured JSON error formatting.

use rover_core::error::{BuildError, RoverError};
use serde_json::json;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRangeSensor => {
                "What happened: No range sensor was provided to the supervisor.\nLikely causes: The HC-SR04 failed to initialize or was not wired into the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_range_sensor(...).".to_string()
            }
            BuildError::MissingDriveTrain => {
                "What happened: No drive train was provided to the supervisor.\nLikely causes: The motor controller failed to initialize or was not wired into the builder.\nHow to fix: Ensure the drive train is created successfully and passed via with_drive_train(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/rover.toml for a sample."
            ),
            BuildError::Spawn(name) => format!(
                "What happened: Could not start worker thread {name}.\nLikely causes: The system is out of threads or memory.\nHow to fix: Free resources and rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RoverError>() {
        return match re {
            RoverError::ActuatorFault(msg) => format!(
                "What happened: The drive train rejected a command ({msg}).\nLikely causes: Motor controller unpowered, I2C wiring fault, or wrong i2c_address.\nHow to fix: Check the battery and the PCA9685 wiring, verify [motion] i2c_address, then rerun. The rover was disarmed."
            ),
            RoverError::SensorTimeout => {
                "What happened: The range sensor did not answer in time.\nLikely causes: HC-SR04 not wired correctly, no power, or sensor_timeout_ms too low.\nHow to fix: Verify trig/echo pins and power, and consider raising sampler.sensor_timeout_ms.".to_string()
            }
            RoverError::Sensor(msg) => format!(
                "What happened: Range sensor fault ({msg}).\nLikely causes: Wrong trig/echo pins or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access GPIO."
            ),
            RoverError::Config(msg) => format!(
                "What happened: Configuration could not be used ({msg}).\nLikely causes: Missing file, TOML syntax error, unknown key, or out-of-range value.\nHow to fix: Edit the config file, then rerun."
            ),
            RoverError::WorkerPanic(name) => format!(
                "What happened: Worker thread {name} panicked.\nLikely causes: A bug or a misbehaving device driver.\nHow to fix: Re-run with --log-level=debug and report the log. The rover was disarmed."
            ),
            RoverError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from backend init
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hc-sr04") || lower.contains("open pca9685") || lower.contains("pin") {
        return format!(
            "What happened: Failed to initialize hardware ({msg}).\nLikely causes: Incorrect pin numbers, I2C disabled, or insufficient GPIO permissions.\nHow to fix: Fix [pins] and [motion] in the config; enable I2C; run with GPIO access. Use --sim to test without hardware."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable reason name for JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRangeSensor | BuildError::MissingDriveTrain => "MissingCapability",
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::Spawn(_) => "Spawn",
        };
    }
    match err.downcast_ref::<RoverError>() {
        Some(RoverError::ActuatorFault(_)) => "ActuatorFault",
        Some(RoverError::Sensor(_)) => "Sensor",
        Some(RoverError::SensorTimeout) => "SensorTimeout",
        Some(RoverError::Config(_)) => "InvalidConfig",
        Some(RoverError::WorkerPanic(_)) => "WorkerPanic",
        Some(RoverError::State(_)) => "State",
        None => "Error",
    }
}

/// Exit codes: 3 actuator fault, 4 bad config, 5 worker panic, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "ActuatorFault" => 3,
        "InvalidConfig" => 4,
        "WorkerPanic" => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(eyre::Report::new(RoverError::ActuatorFault("i2c nack".into())), 3, "ActuatorFault")]
    #[case(eyre::Report::new(RoverError::Config("bad".into())), 4, "InvalidConfig")]
    #[case(eyre::Report::new(BuildError::InvalidConfig("queue")), 4, "InvalidConfig")]
    #[case(eyre::Report::new(RoverError::WorkerPanic("rover-sampler".into())), 5, "WorkerPanic")]
    #[case(eyre::Report::new(BuildError::MissingDriveTrain), 1, "MissingCapability")]
    #[case(eyre::eyre!("something odd"), 1, "Error")]
    fn codes_and_reasons(#[case] err: eyre::Report, #[case] code: i32, #[case] reason: &str) {
        assert_eq!(exit_code_for_error(&err), code);
        assert_eq!(reason_name(&err), reason);
    }

    #[test]
    fn json_error_is_parseable() {
        let err = eyre::Report::new(RoverError::ActuatorFault("stall".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "ActuatorFault");
        assert!(v["message"].as_str().is_some_and(|m| m.contains("stall")));
    }

    #[test]
    fn humanized_messages_follow_the_three_part_layout() {
        let err = eyre::Report::new(RoverError::SensorTimeout);
        let text = humanize(&err);
        assert!(text.starts_with("What happened:"));
        assert!(text.contains("How to fix:"));
    }
}
