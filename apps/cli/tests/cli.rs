//! 命令行端到端测试（调试模式，不需要串口）

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn servoarm(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("servoarm").unwrap();
    cmd.arg("--config")
        .arg(dir.join("config.toml"))
        .arg("--path-dir")
        .arg(dir.join("paths"))
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn config_path_and_set() {
    let dir = TempDir::new().unwrap();

    servoarm(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    servoarm(dir.path())
        .args(["config", "set", "link.baud_rate", "9600"])
        .assert()
        .success();

    servoarm(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("baud_rate = 9600"));

    servoarm(dir.path())
        .args(["config", "set", "link.parity", "odd"])
        .assert()
        .failure();
}

#[test]
fn paths_create_list_and_rename() {
    let dir = TempDir::new().unwrap();

    servoarm(dir.path()).args(["paths", "create", "P1"]).assert().success();
    servoarm(dir.path()).args(["paths", "create", "P2"]).assert().success();
    servoarm(dir.path())
        .args(["paths", "rename", "P1", "P2"])
        .assert()
        .failure();
    servoarm(dir.path())
        .args(["paths", "rename", "P1", "P3"])
        .assert()
        .success();

    servoarm(dir.path())
        .args(["paths", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("P2").and(predicate::str::contains("P3")))
        .stdout(predicate::str::contains("P1").not());
}

#[test]
fn send_in_debug_mode() {
    let dir = TempDir::new().unwrap();
    servoarm(dir.path())
        .args(["--debug", "send", "move", "60", "120", "45", "150", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("move 60 120 45 150 30"));

    servoarm(dir.path())
        .args(["--debug", "send", "spin", "3"])
        .assert()
        .failure();
}

#[test]
fn run_rejects_empty_path_and_plays_recorded_one() {
    let dir = TempDir::new().unwrap();
    for (key, value) in [
        ("execution.start_settle_ms", "0"),
        ("execution.point_settle_ms", "0"),
        ("execution.end_settle_ms", "0"),
    ] {
        servoarm(dir.path())
            .args(["config", "set", key, value])
            .assert()
            .success();
    }

    servoarm(dir.path()).args(["paths", "create", "empty"]).assert().success();
    servoarm(dir.path())
        .args(["--debug", "run", "empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no points"));

    fs::write(
        dir.path().join("paths").join("demo.csv"),
        "Servo1_Wrist,Servo2_Base,Servo3_Shoulder,Servo4_Elbow,Servo5_Gripper\n90,90,90,90,90\n",
    )
    .unwrap();
    servoarm(dir.path())
        .args(["--debug", "run", "demo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo"));
}

#[test]
fn live_mode_without_port_is_rejected() {
    let dir = TempDir::new().unwrap();
    servoarm(dir.path())
        .args(["--live", "send", "reset"])
        .assert()
        .failure();
}
