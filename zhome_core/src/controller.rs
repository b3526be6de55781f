//! The stable-home retry loop (`ConvergenceController`).
//!
//! Each attempt runs the pre-home script, homes the target axis, samples the
//! actuator position and feeds it through the drift-compensated window test.
//! The loop ends on convergence, on a script failure, or when the retry
//! budget is spent. Homing and position-read failures end it with an error.

use std::sync::Arc;
use std::time::Instant;

use zhome_traits::clock::Clock;
use zhome_traits::{Machine, PreHomeScript};

use crate::config::{AxisCfg, HomeCfg};
use crate::drift::DriftModel;
use crate::error::{HomeError, Report, Result};
use crate::hw_error::{HwStage, map_hw_error};
use crate::report::{IterationReport, ProgressReporter};
use crate::status::{ControllerState, Outcome, StepStatus};
use crate::window::WindowBuffer;

/// One position reading, taken right after a homing move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// 1-based attempt that produced it.
    pub index: u32,
    pub raw_position: f64,
    /// Equal to `raw_position`: the host already reports positions relative to
    /// the zero the homing move established.
    pub adjusted_position: f64,
    pub calibration_input: f64,
}

pub struct ConvergenceController<M: Machine> {
    pub(crate) machine: M,
    pub(crate) script: Box<dyn PreHomeScript>,
    pub(crate) cfg: HomeCfg,
    pub(crate) axis: AxisCfg,
    pub(crate) drift: DriftModel,
    pub(crate) window: WindowBuffer,
    pub(crate) reporter: Box<dyn ProgressReporter>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,

    pub(crate) state: ControllerState,
    pub(crate) actuator: Option<String>,
    pub(crate) retry: u32,
    pub(crate) last_sample: Option<Sample>,
    pub(crate) outcome: Option<Outcome>,
}

impl<M: Machine> core::fmt::Debug for ConvergenceController<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConvergenceController")
            .field("cfg", &self.cfg)
            .field("axis", &self.axis.target)
            .field("state", &self.state)
            .field("window", &self.window.len())
            .finish_non_exhaustive()
    }
}

impl<M: Machine> ConvergenceController<M> {
    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn cfg(&self) -> &HomeCfg {
        &self.cfg
    }

    pub fn drift(&self) -> &DriftModel {
        &self.drift
    }

    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.last_sample.as_ref()
    }

    /// Actuator resolved by the last successful `begin()`.
    pub fn actuator(&self) -> Option<&str> {
        self.actuator.as_deref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Milliseconds since the last `begin()`.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Check host preconditions and reset per-run state.
    pub fn begin(&mut self) -> Result<()> {
        self.state = ControllerState::Init;
        self.cfg.validate().map_err(Report::new)?;

        let homed: Vec<char> = self
            .machine
            .homed_axes()
            .iter()
            .map(char::to_ascii_lowercase)
            .collect();
        let missing = self
            .axis
            .require_homed
            .iter()
            .any(|a| !homed.contains(&a.to_ascii_lowercase()));
        if missing {
            let names: Vec<String> = self
                .axis
                .require_homed
                .iter()
                .map(|a| a.to_ascii_uppercase().to_string())
                .collect();
            return Err(Report::new(HomeError::Precondition(format!(
                "must home {} axes first",
                names.join(" and ")
            ))));
        }

        let prefix = self.axis.actuator_prefix.as_str();
        let Some(actuator) = self
            .machine
            .actuator_names()
            .into_iter()
            .find(|n| n.starts_with(prefix))
        else {
            return Err(Report::new(HomeError::Precondition(format!(
                "no actuator matching '{prefix}' found"
            ))));
        };

        self.epoch = self.clock.now();
        self.window.clear();
        self.retry = 0;
        self.last_sample = None;
        self.outcome = None;
        self.actuator = Some(actuator);
        self.state = ControllerState::Iterating { retry: 0 };
        self.reporter.started(&self.cfg);
        Ok(())
    }

    /// Run one homing attempt, or finish the run when the budget is spent.
    pub fn step(&mut self) -> Result<StepStatus> {
        match self.state {
            ControllerState::Iterating { .. } => {}
            ControllerState::Init => {
                return Err(Report::new(HomeError::State(
                    "begin() has not succeeded".into(),
                )));
            }
            _ => {
                return Err(Report::new(HomeError::State(
                    "run already finished; call begin() to start over".into(),
                )));
            }
        }
        if self.retry >= self.cfg.max_retries {
            return Ok(self.finish(Outcome::ExhaustedRetries {
                retries_used: self.cfg.max_retries,
            }));
        }
        let Some(actuator) = self.actuator.clone() else {
            return Err(Report::new(HomeError::State("no actuator resolved".into())));
        };

        self.retry += 1;
        let retry = self.retry;
        let target = self.axis.target;

        if let Err(e) = self.script.run() {
            tracing::error!(retry, error = %e, source = ?e.source(), "pre-home script failed");
            return Ok(self.finish(Outcome::ActionFailed {
                cause: format!("pre-action script failed: {e}"),
            }));
        }

        if let Err(e) = self.machine.home(target) {
            let err = map_hw_error(HwStage::Homing, &*e);
            return Err(self.fail(err, format!("homing axis {target} on attempt {retry}")));
        }

        let raw = match self.machine.actuator_position(&actuator) {
            Ok(v) if v.is_finite() => v,
            Ok(v) => {
                let err = HomeError::Sensor(format!("{actuator} reported non-finite position {v}"));
                return Err(self.fail(err, format!("reading {actuator} on attempt {retry}")));
            }
            Err(e) => {
                let err = map_hw_error(HwStage::Position, &*e);
                return Err(self.fail(err, format!("reading {actuator} on attempt {retry}")));
            }
        };
        let input = self.machine.calibration_input(target);

        let adjusted = raw;
        self.window.push(adjusted);
        let deviation = self
            .window
            .previous_adjusted()
            .map(|prev| adjusted - prev - self.drift.expected_offset(input));
        let spread = self
            .window
            .range()
            .ok()
            .map(|range| (range - self.drift.expected_window_spread(input)).abs());

        self.last_sample = Some(Sample {
            index: retry,
            raw_position: raw,
            adjusted_position: adjusted,
            calibration_input: input,
        });
        self.state = ControllerState::Iterating { retry };
        self.reporter.report(&IterationReport {
            retry,
            actuator,
            position: adjusted,
            calibration_input: input,
            deviation,
            spread,
        });

        if let Some(s) = spread
            && s <= self.cfg.effective_tolerance()
        {
            return Ok(self.finish(Outcome::Converged {
                retries_used: retry,
                final_range: s,
            }));
        }
        if retry >= self.cfg.max_retries {
            return Ok(self.finish(Outcome::ExhaustedRetries {
                retries_used: self.cfg.max_retries,
            }));
        }
        Ok(StepStatus::Running)
    }

    /// `begin()` then `step()` until the run finishes.
    pub fn run(&mut self) -> Result<Outcome> {
        self.begin()?;
        loop {
            if let StepStatus::Finished(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> StepStatus {
        self.state = match outcome {
            Outcome::Converged { .. } => ControllerState::Converged,
            Outcome::ExhaustedRetries { .. } => ControllerState::Exhausted,
            Outcome::ActionFailed { .. } => ControllerState::Failed,
        };
        self.reporter.finished(&outcome);
        self.outcome = Some(outcome.clone());
        StepStatus::Finished(outcome)
    }

    fn fail(&mut self, err: HomeError, context: String) -> Report {
        self.state = ControllerState::Failed;
        tracing::error!(retry = self.retry, error = %err, "{context}");
        Report::new(err).wrap_err(context)
    }
}
