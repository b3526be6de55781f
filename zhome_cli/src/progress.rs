//! Console and JSON-lines progress sinks.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use serde_json::json;
use zhome_core::{HomeCfg, IterationReport, Outcome, ProgressReporter};

/// Operator-facing lines on stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn banner(cfg: &HomeCfg) -> String {
        format!(
            "Stable Z home: {:.4} tolerance, window {}, {} max retries",
            cfg.retry_tolerance, cfg.window_size, cfg.max_retries
        )
    }

    pub fn retry_line(r: &IterationReport) -> String {
        let range = r
            .spread
            .map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
        format!(
            "Retry {}: {} position {:.4}, window range {}",
            r.retry, r.actuator, r.position, range
        )
    }
}

impl ProgressReporter for ConsoleReporter {
    fn started(&mut self, cfg: &HomeCfg) {
        println!("{}", Self::banner(cfg));
    }

    fn report(&mut self, r: &IterationReport) {
        if let Some(d) = r.deviation {
            println!("{} diff: {d:.4}", r.actuator);
        }
        println!("{}", Self::retry_line(r));
    }

    fn finished(&mut self, outcome: &Outcome) {
        if outcome.is_success() {
            println!("Succeeded");
        }
    }
}

/// Appends one JSON object per attempt to a file.
pub struct JsonlReporter {
    path: PathBuf,
}

impl JsonlReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, value: &serde_json::Value) {
        let res = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{value}"));
        if let Err(e) = res {
            tracing::warn!(error = %e, path = ?self.path, "progress file write failed");
        }
    }
}

impl ProgressReporter for JsonlReporter {
    fn report(&mut self, r: &IterationReport) {
        self.append(&json!({
            "retry": r.retry,
            "actuator": r.actuator,
            "position": r.position,
            "calibration_input": r.calibration_input,
            "deviation": r.deviation,
            "spread": r.spread,
        }));
    }

    fn finished(&mut self, outcome: &Outcome) {
        self.append(&json!({
            "outcome": crate::home::outcome_name(outcome),
            "retries_used": outcome.retries_used(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(spread: Option<f64>) -> IterationReport {
        IterationReport {
            retry: 4,
            actuator: "stepper_z".into(),
            position: 54.00625,
            calibration_input: 0.0,
            deviation: Some(0.0125),
            spread,
        }
    }

    #[test]
    fn console_lines_match_command_output() {
        assert_eq!(
            ConsoleReporter::banner(&HomeCfg::default()),
            "Stable Z home: 0.0025 tolerance, window 4, 20 max retries"
        );
        assert_eq!(
            ConsoleReporter::retry_line(&report(None)),
            "Retry 4: stepper_z position 54.0063, window range -"
        );
        assert_eq!(
            ConsoleReporter::retry_line(&report(Some(0.05625))),
            "Retry 4: stepper_z position 54.0063, window range 0.0563"
        );
    }

    #[test]
    fn jsonl_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.jsonl");
        let mut r = JsonlReporter::new(&path);
        r.report(&report(None));
        r.report(&report(Some(0.001)));
        r.finished(&Outcome::Converged {
            retries_used: 2,
            final_range: 0.001,
        });
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0]["spread"].is_null());
        assert_eq!(lines[1]["spread"].as_f64(), Some(0.001));
        assert_eq!(lines[2]["outcome"], "converged");
    }
}
