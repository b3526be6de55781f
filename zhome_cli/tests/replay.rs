use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// No drift compensation: the window spread is the raw position range.
fn write_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[stable_z_home]
retries = 20
retry_tolerance = 0.0025
window = 4

[drift]
base_offset = 0.0
scale_factor = 0.0
spread_multiplier = 0.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[(f64, f64)]) -> PathBuf {
    let path = dir.join(name);
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "{header}").unwrap();
    for (p, c) in rows {
        writeln!(f, "{p},{c}").unwrap();
    }
    path
}

fn replay_cmd(cfg: &Path, samples: &Path) -> Command {
    let mut cmd = Command::cargo_bin("zhome").unwrap();
    cmd.arg("--config")
        .arg(cfg)
        .arg("replay")
        .arg("--samples")
        .arg(samples);
    cmd
}

#[test]
fn settled_recording_converges() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let csv = write_csv(
        dir.path(),
        "settled.csv",
        "position,calibration_input",
        &[
            (5.2, 0.0),
            (5.0, 0.0),
            (5.001, 0.0),
            (5.0005, 0.0),
            (5.001, 0.0),
        ],
    );

    replay_cmd(&cfg, &csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Retry 5: stepper_z position 5.0010"))
        .stdout(predicate::str::contains("Succeeded"));
}

#[test]
fn short_recording_runs_out() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let csv = write_csv(
        dir.path(),
        "short.csv",
        "position,calibration_input",
        &[(5.0, 0.0), (5.3, 0.0)],
    );

    replay_cmd(&cfg, &csv)
        .assert()
        .code(5)
        .stderr(predicate::str::contains("recording exhausted after 2 samples"));
}

#[test]
fn window_override_applies_to_replay() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let csv = write_csv(
        dir.path(),
        "three.csv",
        "position,calibration_input",
        &[(5.0, 0.0), (5.001, 0.0), (5.002, 0.0)],
    );

    replay_cmd(&cfg, &csv)
        .arg("--window")
        .arg("3")
        .assert()
        .success()
        .stdout(predicate::str::contains("window range 0.0020"));
}

#[test]
fn bad_header_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let csv = write_csv(dir.path(), "bad.csv", "z,origin", &[(5.0, 0.0)]);

    replay_cmd(&cfg, &csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn fit_drift_recovers_constants() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    // offset = 18 + 5 * input
    let csv = write_csv(
        dir.path(),
        "drift.csv",
        "position,calibration_input",
        &[
            (0.0, 0.0),
            (18.0, 0.0),
            (36.5, 0.1),
            (55.5, 0.2),
            (75.5, 0.4),
            (95.0, 0.3),
        ],
    );

    replay_cmd(&cfg, &csv)
        .arg("--fit-drift")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_offset = 18.0000"))
        .stdout(predicate::str::contains("scale_factor = 5.0000"));
}

#[test]
fn fit_drift_with_constant_input_reports_offset_only() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let csv = write_csv(
        dir.path(),
        "flat.csv",
        "position,calibration_input",
        &[(0.0, 0.0), (18.0, 0.0), (36.0, 0.0), (54.0, 0.0)],
    );

    replay_cmd(&cfg, &csv)
        .arg("--fit-drift")
        .assert()
        .success()
        .stdout(predicate::str::contains("expected_offset(0.0000) = 18.0000"))
        .stdout(predicate::str::contains("scale_factor is not observable"));
}
