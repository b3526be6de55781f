//! Per-attempt progress reporting.
//!
//! Reporters observe the run; they cannot fail it and never influence when it
//! stops.

use std::sync::{Arc, Mutex};

use crate::config::HomeCfg;
use crate::status::Outcome;

/// Snapshot of one homing attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationReport {
    /// 1-based attempt number.
    pub retry: u32,
    pub actuator: String,
    pub position: f64,
    pub calibration_input: f64,
    /// `position - previous - expected_offset`, once a previous sample exists.
    pub deviation: Option<f64>,
    /// Drift-compensated window spread, once the window is full.
    pub spread: Option<f64>,
}

pub trait ProgressReporter {
    /// Called once from `begin()` after the preconditions passed.
    fn started(&mut self, _cfg: &HomeCfg) {}
    fn report(&mut self, r: &IterationReport);
    /// Called once with the terminal outcome. Not called when the run ends
    /// with an error.
    fn finished(&mut self, _outcome: &Outcome) {}
}

/// Emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn started(&mut self, cfg: &HomeCfg) {
        tracing::info!(
            retry_tolerance = cfg.retry_tolerance,
            window = cfg.window_size,
            max_retries = cfg.max_retries,
            "stable home start"
        );
    }

    fn report(&mut self, r: &IterationReport) {
        tracing::debug!(
            retry = r.retry,
            actuator = %r.actuator,
            position = r.position,
            calibration_input = r.calibration_input,
            deviation = r.deviation,
            spread = r.spread,
            "homing attempt"
        );
    }

    fn finished(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Converged {
                retries_used,
                final_range,
            } => tracing::info!(retries_used, final_range, "stable home converged"),
            Outcome::ExhaustedRetries { retries_used } => {
                tracing::warn!(retries_used, "stable home exhausted retries");
            }
            Outcome::ActionFailed { cause } => {
                tracing::error!(cause = %cause, "stable home aborted");
            }
        }
    }
}

/// Keeps every report in memory. Clones share the same buffer, so a test can
/// hand one clone to the controller and inspect the other.
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<IterationReport>>>,
    outcome: Arc<Mutex<Option<Outcome>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<IterationReport> {
        self.reports
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.lock().ok().and_then(|g| g.clone())
    }
}

impl ProgressReporter for RecordingReporter {
    fn report(&mut self, r: &IterationReport) {
        if let Ok(mut g) = self.reports.lock() {
            g.push(r.clone());
        }
    }

    fn finished(&mut self, outcome: &Outcome) {
        if let Ok(mut g) = self.outcome.lock() {
            *g = Some(outcome.clone());
        }
    }
}

/// Forwards every event to each inner reporter in order.
#[derive(Default)]
pub struct Fanout(Vec<Box<dyn ProgressReporter>>);

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, r: impl ProgressReporter + 'static) -> Self {
        self.0.push(Box::new(r));
        self
    }

    pub fn push(&mut self, r: Box<dyn ProgressReporter>) {
        self.0.push(r);
    }
}

impl ProgressReporter for Fanout {
    fn started(&mut self, cfg: &HomeCfg) {
        for r in &mut self.0 {
            r.started(cfg);
        }
    }

    fn report(&mut self, report: &IterationReport) {
        for r in &mut self.0 {
            r.report(report);
        }
    }

    fn finished(&mut self, outcome: &Outcome) {
        for r in &mut self.0 {
            r.finished(outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(retry: u32) -> IterationReport {
        IterationReport {
            retry,
            actuator: "stepper_z".into(),
            position: 1.0,
            calibration_input: 0.0,
            deviation: None,
            spread: None,
        }
    }

    #[test]
    fn fanout_forwards_to_all() {
        let a = RecordingReporter::new();
        let b = RecordingReporter::new();
        let mut fan = Fanout::new().with(a.clone()).with(b.clone());
        fan.report(&sample(1));
        fan.report(&sample(2));
        fan.finished(&Outcome::ExhaustedRetries { retries_used: 2 });
        assert_eq!(a.reports().len(), 2);
        assert_eq!(b.reports()[1].retry, 2);
        assert_eq!(
            b.outcome(),
            Some(Outcome::ExhaustedRetries { retries_used: 2 })
        );
    }
}
