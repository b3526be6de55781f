use zhome_traits::clock::Clock;
use zhome_traits::{Machine, PreHomeScript};

use crate::builder::build_controller;
use crate::config::{AxisCfg, HomeCfg, Overrides};
use crate::drift::DriftModel;
use crate::error::{Report, Result as CoreResult};
use crate::report::ProgressReporter;
use crate::status::{Outcome, StepStatus};

/// Everything `run` needs besides the host and the pre-home script.
#[derive(Default)]
pub struct RunParams {
    pub cfg: HomeCfg,
    /// Per-invocation values merged over `cfg` before the run starts.
    pub overrides: Overrides,
    pub axis: AxisCfg,
    pub drift: DriftModel,
    /// `None` selects `TracingReporter`.
    pub reporter: Option<Box<dyn ProgressReporter>>,
    pub clock: Option<Box<dyn Clock + Send + Sync>>,
}

/// Run one stable-home sequence to its terminal outcome.
///
/// Override bounds are checked before any host call. Non-converged outcomes
/// are returned as `Ok`; only precondition, homing and sensor failures are
/// errors.
pub fn run<M, S>(machine: M, script: S, params: RunParams) -> CoreResult<Outcome>
where
    M: Machine,
    S: PreHomeScript + 'static,
{
    let cfg = params
        .cfg
        .with_overrides(&params.overrides)
        .map_err(Report::new)?;

    let mut home = build_controller(
        machine,
        cfg,
        params.axis,
        params.drift,
        Some(Box::new(script)),
        params.reporter,
        params.clock,
    )?;
    home.begin()?;
    tracing::info!(
        retry_tolerance = home.cfg().retry_tolerance,
        window = home.cfg().window_size,
        max_retries = home.cfg().max_retries,
        actuator = home.actuator().unwrap_or_default(),
        "stable home run start"
    );

    loop {
        match home.step()? {
            StepStatus::Running => continue,
            StepStatus::Finished(outcome) => {
                tracing::info!(
                    elapsed_ms = home.elapsed_ms(),
                    success = outcome.is_success(),
                    "stable home run finished"
                );
                return Ok(outcome);
            }
        }
    }
}
