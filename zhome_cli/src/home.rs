//! Command execution: host assembly, the homing run and its summary output.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use serde_json::json;
use zhome_config::{Config, DriftFit};
use zhome_core::error::{HomeError, Report, Result as CoreResult};
use zhome_core::runner::{self, RunParams};
use zhome_core::{
    AxisCfg, DriftModel, Fanout, HomeCfg, NoopScript, Outcome, Overrides, TracingReporter,
    build_controller,
};
use zhome_hardware::{ReplayMachine, SimParams, SimulatedMachine};
use zhome_traits::{BoxError, Machine, PreHomeScript};

use crate::cli::{CliRun, LAST_RUN};
use crate::progress::{ConsoleReporter, JsonlReporter};

pub fn outcome_name(o: &Outcome) -> &'static str {
    match o {
        Outcome::Converged { .. } => "converged",
        Outcome::ExhaustedRetries { .. } => "exhausted",
        Outcome::ActionFailed { .. } => "action_failed",
    }
}

pub fn error_reason_name(e: &HomeError) -> &'static str {
    match e {
        HomeError::Config(_) => "Config",
        HomeError::Precondition(_) => "Precondition",
        HomeError::ActionFailed { .. } => "ActionFailed",
        HomeError::ExhaustedRetries { .. } => "ExhaustedRetries",
        HomeError::Homing(_) => "Homing",
        HomeError::Sensor(_) => "Sensor",
        HomeError::Timeout(_) => "Timeout",
        HomeError::State(_) => "State",
    }
}

/// How the command reports progress and results.
#[derive(Debug, Clone, Copy)]
pub struct OutputOpts {
    pub json: bool,
    pub print_runtime: bool,
}

/// Simulator parameters from `[sim]`, with the test environment knobs applied.
fn sim_params(cfg: &Config) -> SimParams {
    let s = &cfg.sim;
    let mut p = SimParams {
        start_position: s.start_position,
        drift_base: s.drift_base,
        drift_scale: s.drift_scale,
        jitter: s.jitter,
        decay: s.decay,
        homing_origin: s.homing_origin,
        settle_ms: s.settle_ms,
        endstop_timeout_ms: s.endstop_timeout_ms,
        homed_axes: AxisCfg::from(&cfg.axis).require_homed,
        fail_home_at: None,
    };
    if std::env::var("ZHOME_SIM_UNHOMED").is_ok_and(|v| v == "1") {
        p.homed_axes.clear();
    }
    if let Some(n) = std::env::var("ZHOME_SIM_FAIL_HOME")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
    {
        p.fail_home_at = Some(n);
    }
    if let Some(j) = std::env::var("ZHOME_SIM_JITTER")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|j| j.is_finite() && *j >= 0.0)
    {
        p.jitter = j;
    }
    p
}

/// Fails the attempt once Ctrl-C was pressed, otherwise runs `inner`.
fn interruptible(
    mut inner: impl PreHomeScript + 'static,
    shutdown: Arc<AtomicBool>,
) -> impl PreHomeScript + 'static {
    move || -> Result<(), BoxError> {
        if shutdown.load(Ordering::Relaxed) {
            return Err("interrupted".into());
        }
        inner.run()
    }
}

fn reporters(cfg: &Config, out: OutputOpts) -> Fanout {
    let mut fan = Fanout::new().with(TracingReporter);
    if !out.json {
        fan.push(Box::new(ConsoleReporter));
    }
    if let Some(path) = cfg.logging.progress_file.as_deref() {
        fan.push(Box::new(JsonlReporter::new(path)));
    }
    fan
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn print_summary(
    command: &str,
    cfg: &HomeCfg,
    result: &CoreResult<Outcome>,
    duration_ms: u64,
) {
    let (outcome, retries_used, final_range, reason) = match result {
        Ok(o) => {
            let final_range = match o {
                Outcome::Converged { final_range, .. } => Some(*final_range),
                _ => None,
            };
            let reason = match o {
                Outcome::ActionFailed { cause } => Some(cause.clone()),
                _ => None,
            };
            (outcome_name(o), o.retries_used(), final_range, reason)
        }
        Err(e) => {
            let reason = e
                .downcast_ref::<HomeError>()
                .map_or("Error", error_reason_name);
            ("error", None, None, Some(reason.to_string()))
        }
    };
    let v = json!({
        "timestamp": unix_ts(),
        "command": command,
        "outcome": outcome,
        "retries_used": retries_used,
        "final_range": final_range,
        "max_retries": cfg.max_retries,
        "retry_tolerance": cfg.retry_tolerance,
        "window": cfg.window_size,
        "duration_ms": duration_ms,
        "reason": reason,
    });
    println!("{v}");
}

/// Shared tail of `home` and `replay`: run to completion, print the summary,
/// and turn non-converged outcomes into typed errors for the exit code.
fn execute<M: Machine>(
    command: &str,
    cfg: &Config,
    machine: M,
    script: impl PreHomeScript + 'static,
    overrides: Overrides,
    out: OutputOpts,
) -> eyre::Result<()> {
    let base: HomeCfg = (&cfg.stable_z_home).into();
    // Bounds are re-checked by the runner; this only feeds the summary.
    let effective = base.with_overrides(&overrides).map_err(Report::new)?;
    let _ = LAST_RUN.set(CliRun {
        max_retries: effective.max_retries,
        retry_tolerance: effective.retry_tolerance,
        window: effective.window_size,
    });

    let start = Instant::now();
    let result = runner::run(
        machine,
        script,
        RunParams {
            cfg: base,
            overrides,
            axis: AxisCfg::from(&cfg.axis),
            drift: DriftModel::from(&cfg.drift),
            reporter: Some(Box::new(reporters(cfg, out))),
            clock: None,
        },
    );
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    if out.json {
        print_summary(command, &effective, &result, elapsed_ms);
    }
    if out.print_runtime && !out.json {
        println!("Completed in {elapsed_ms} ms");
    }

    result?
        .into_result()
        .map(|_| ())
        .map_err(Report::new)
}

pub fn run_home(
    cfg: &Config,
    overrides: Overrides,
    out: OutputOpts,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let machine = SimulatedMachine::new(sim_params(cfg));
    let script = interruptible(machine.script(cfg.pre_home.gcode.clone()), shutdown);
    execute("home", cfg, machine, script, overrides, out)
}

pub fn run_replay(
    cfg: &Config,
    samples: &Path,
    fit: bool,
    overrides: Overrides,
    out: OutputOpts,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let rows = zhome_config::load_samples_csv(samples)?;
    if fit {
        return print_fit(&zhome_config::fit_drift(&rows)?, rows.len(), out.json);
    }
    tracing::info!(samples = rows.len(), path = ?samples, "replaying recording");

    let axis = AxisCfg::from(&cfg.axis);
    let machine = ReplayMachine::new(
        axis.actuator_prefix.clone(),
        axis.target,
        rows.iter()
            .map(|r| (r.position, r.calibration_input))
            .collect(),
    );
    execute(
        "replay",
        cfg,
        machine,
        interruptible(NoopScript, shutdown),
        overrides,
        out,
    )
}

fn print_fit(fit: &DriftFit, samples: usize, json_out: bool) -> eyre::Result<()> {
    match *fit {
        DriftFit::Line {
            base_offset,
            scale_factor,
            rms,
        } => {
            if json_out {
                println!(
                    "{}",
                    json!({ "samples": samples, "base_offset": base_offset, "scale_factor": scale_factor, "rms": rms })
                );
            } else {
                println!("base_offset = {base_offset:.4}");
                println!("scale_factor = {scale_factor:.4}");
                println!("# rms residual {rms:.4} mm over {samples} samples");
            }
        }
        DriftFit::Constant {
            input,
            expected_offset,
            rms,
        } => {
            if json_out {
                println!(
                    "{}",
                    json!({ "samples": samples, "input": input, "expected_offset": expected_offset, "rms": rms })
                );
            } else {
                println!("expected_offset({input:.4}) = {expected_offset:.4}");
                println!("# calibration input never changed; scale_factor is not observable");
                println!("# rms residual {rms:.4} mm over {samples} samples");
            }
        }
    }
    Ok(())
}

/// Validate config and host preconditions with a zero-attempt run.
pub fn self_check(cfg: &Config, json_out: bool) -> eyre::Result<()> {
    let machine = SimulatedMachine::new(sim_params(cfg));
    let home_cfg = HomeCfg {
        max_retries: 0,
        ..HomeCfg::from(&cfg.stable_z_home)
    };
    let mut home = build_controller(
        machine,
        home_cfg,
        AxisCfg::from(&cfg.axis),
        DriftModel::from(&cfg.drift),
        None,
        Some(Box::new(TracingReporter)),
        None,
    )?;
    home.begin().wrap_err("self-check")?;
    let actuator = home.actuator().unwrap_or_default();
    if json_out {
        println!("{}", json!({ "self_check": "ok", "actuator": actuator }));
    } else {
        println!("OK: {actuator} ready");
    }
    Ok(())
}
