use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Short timings so a whole evasion fits in a sub-second run
fn write_fast_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused by the sim backend
buzzer = 17

[sampler]
sample_period_ms = 5
sensor_timeout_ms = 10
error_backoff_ms = 20

[control]
poll_ms = 5
cooldown_s = 0.1
turn_duration_s = 0.05
reverse_ms = 20
settle_ms = 0
alert_pulses = 1
alert_on_ms = 10
alert_off_ms = 10

[supervisor]
join_timeout_ms = 500
status_period_ms = 100
"#;
    let path = dir.path().join("rover.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn rover() -> Command {
    Command::cargo_bin("rover").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--sim", "--duration-ms", "150"], 0, "shutdown complete", "stdout")]
#[case(&["self-check", "--sim", "--samples", "3"], 0, "self-check ok", "stdout")]
#[case(&["health"], 0, "\"status\":\"ok\"", "stdout")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let mut cmd = rover();
    // Always include a valid config to avoid relying on the default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn obstacle_run_reports_maneuvers_as_json() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let out = rover()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .args(["run", "--sim", "--duration-ms", "600"])
        .env("ROVER_TEST_SIM_OBSTACLE_EVERY", "4")
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let line = stdout.lines().last().expect("one result line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["status"], "ok");
    assert_eq!(v["disarmed"], true);
    assert!(v["maneuvers"].as_u64().unwrap() >= 1);
}

#[rstest]
#[case("[sampler]\nqueue_capacity = 0\n", "queue_capacity")]
#[case("[control]\nturn_duration_s = 0.0\n", "turn_duration_s")]
#[case("[unknown]\nx = 1\n", "unknown field")]
#[case("[supervisor]\njoin_timeout_ms = 100\n", "join_timeout_ms")]
fn invalid_config_exits_with_4(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, toml).unwrap();

    rover()
        .arg("--config")
        .arg(&path)
        .args(["run", "--sim", "--duration-ms", "50"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    rover()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("health")
        .assert()
        .code(4)
        .stderr(predicate::str::contains("read config"));
}

#[test]
fn actuator_fault_exits_with_3() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    rover()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--sim", "--duration-ms", "1000"])
        .env("ROVER_TEST_SIM_OBSTACLE_EVERY", "3")
        .env("ROVER_TEST_SIM_ACTUATOR_FAULT", "1")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("drive train rejected a command"));
}

#[test]
fn json_mode_errors_are_structured() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[sampler]\nsample_period_ms = 0\n").unwrap();

    let out = rover()
        .arg("--config")
        .arg(&path)
        .arg("--json")
        .arg("health")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));

    let stderr = String::from_utf8(out.stderr).unwrap();
    let line = stderr
        .lines()
        .find(|l| l.contains("\"reason\""))
        .expect("json error line");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["reason"], "InvalidConfig");
    assert!(v["message"].as_str().unwrap().contains("sample_period_ms"));
}

#[test]
fn file_logging_writes_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("logs").join("rover.log");
    let cfg = write_fast_config(&dir);
    let mut text = fs::read_to_string(&cfg).unwrap();
    text.push_str(&format!(
        "\n[logging]\nfile = {:?}\nlevel = \"info\"\n",
        log.display().to_string()
    ));
    fs::write(&cfg, text).unwrap();

    rover()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--sim", "--duration-ms", "100"])
        .assert()
        .success();

    let content = fs::read_to_string(&log).unwrap();
    let first = content.lines().next().expect("at least one log line");
    let v: serde_json::Value = serde_json::from_str(first).unwrap();
    assert!(v.get("level").is_some());
}
