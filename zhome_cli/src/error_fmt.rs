//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_RUN;
use crate::home::error_reason_name;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use zhome_core::error::{BuildError, HomeError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMachine => {
                "What happened: No motion host was provided to the controller.\nLikely causes: The host failed to initialize or was not wired into the builder.\nHow to fix: Ensure the host is created successfully and passed via with_machine(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/zhome.toml for a sample."
            ),
        };
    }

    if let Some(he) = err.downcast_ref::<HomeError>() {
        return match he {
            HomeError::ExhaustedRetries { retries } => format!(
                "What happened: Max retries exceeded; the Z position did not settle within {retries} attempts.\nLikely causes: Mechanical play, a noisy endstop, or a tolerance tighter than the rig can repeat.\nHow to fix: Raise --retries or --retry-tolerance, or check the [drift] constants against a recording (`zhome replay --fit-drift`)."
            ),
            HomeError::ActionFailed { cause } => format!(
                "What happened: Pre-home Gcode failed ({cause}).\nLikely causes: A bad line in [pre_home].gcode, or the run was interrupted.\nHow to fix: Fix the script in the config and rerun."
            ),
            HomeError::Precondition(msg) => format!(
                "What happened: The printer is not ready ({msg}).\nLikely causes: X/Y not homed yet, or [axis].actuator_prefix does not match any stepper.\nHow to fix: Home X and Y first and check the [axis] section."
            ),
            HomeError::Timeout(msg) => format!(
                "What happened: The Z endstop did not trigger in time ({msg}).\nLikely causes: Endstop wiring, a probe that is not deployed, or a timeout set too low.\nHow to fix: Check the endstop and raise sim.endstop_timeout_ms if needed."
            ),
            HomeError::Homing(msg) | HomeError::Sensor(msg) => format!(
                "What happened: {he}.\nLikely causes: The host lost the axis ({msg}).\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
            HomeError::Config(msg) => format!(
                "What happened: Invalid parameter ({msg}).\nLikely causes: An override outside its bounds.\nHow to fix: Use --retry-tolerance >= 0.001 and --window >= 3."
            ),
            HomeError::State(_) => format!(
                "What happened: {he}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("recording csv must have headers") {
        return "Invalid headers in recording CSV. Expected 'position,calibration_input'.".to_string();
    }

    if lower.contains("read config") || lower.contains("parse config") {
        return format!(
            "What happened: Could not load the configuration ({msg}).\nLikely causes: Wrong --config path or a TOML syntax error.\nHow to fix: Check the path and the file contents."
        );
    }

    if lower.starts_with("stable_z_home.")
        || lower.starts_with("axis.")
        || lower.starts_with("drift.")
        || lower.starts_with("logging.")
        || lower.starts_with("sim.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure class; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use zhome_core::error::HomeError;
    match err.downcast_ref::<HomeError>() {
        Some(HomeError::ExhaustedRetries { .. }) => 3,
        Some(HomeError::ActionFailed { .. }) => 4,
        Some(HomeError::Homing(_) | HomeError::Sensor(_) | HomeError::Timeout(_)) => 5,
        Some(HomeError::Precondition(_)) => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    use zhome_core::error::HomeError;

    if let Some(he) = err.downcast_ref::<HomeError>() {
        let msg = humanize(err);
        let details = match he {
            HomeError::ExhaustedRetries { .. } => LAST_RUN.get().map(|r| {
                json!({ "max_retries": r.max_retries, "retry_tolerance": r.retry_tolerance, "window": r.window })
            }),
            _ => None,
        };
        let obj = if let Some(d) = details {
            json!({ "reason": error_reason_name(he), "details": d, "message": msg })
        } else {
            json!({ "reason": error_reason_name(he), "message": msg })
        };
        return obj.to_string();
    }

    // Generic error JSON
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}
