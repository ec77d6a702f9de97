// Drives the compiled binary through a PTY: start a synthetic workout, stop
// it, quit, and check the workout landed in the log.
//
// - Requires a TTY; expectrl allocates a pseudo terminal.
// - Unix-only and ignored by default.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use assert_cmd::Command;
use expectrl::{spawn, Eof};

#[test]
fn help_lists_source_flags() {
    let output = Command::cargo_bin("tread")
        .unwrap()
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("--source"));
    assert!(text.contains("--device"));
}

#[test]
fn device_source_without_path_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("tread")
        .unwrap()
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .args(["--source", "device"])
        .assert()
        .failure();
}

#[test]
#[ignore]
fn minimal_workout_is_saved_on_exit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let log = dir.path().join("workouts.json");

    let bin = assert_cmd::cargo::cargo_bin("tread");
    let cmd = format!(
        "{} --no-network --sample-interval-ms 50 -o {}",
        bin.display(),
        log.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(300));

    p.send("s")?;
    std::thread::sleep(Duration::from_millis(500));
    p.send("x")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("q")?;

    p.expect(Eof)?;

    let saved: serde_json::Value = serde_json::from_slice(&std::fs::read(&log)?)?;
    assert_eq!(saved.as_array().map(Vec::len), Some(1));
    Ok(())
}
