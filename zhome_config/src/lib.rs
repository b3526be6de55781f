#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and recorded-session parsing for the stable-home controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The recording CSV loader enforces headers; `fit_drift` estimates the
//!   per-move drift constants from a recording with a robust refit.
use serde::Deserialize;
use serde::de::Deserializer;

pub mod recording;

pub use recording::{DriftFit, SampleRow, fit_drift, load_samples_csv};

/// Lower bound on the retry tolerance accepted from the config file (exclusive)
/// and from command overrides (inclusive).
pub const MIN_RETRY_TOLERANCE: f64 = 0.001;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StableZHome {
    /// Default maximum homing attempts per run.
    pub retries: u32,
    /// Default tolerance on the drift-compensated window spread.
    pub retry_tolerance: f64,
    /// Default number of samples in the convergence window.
    pub window: usize,
}

impl Default for StableZHome {
    fn default() -> Self {
        Self {
            retries: 20,
            retry_tolerance: 1.0 / 400.0,
            window: 4,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AxisSection {
    /// Axis that is homed repeatedly.
    pub target: char,
    /// Name prefix of the actuator whose position is sampled.
    pub actuator_prefix: String,
    /// Axes that must be homed before a run starts.
    pub require_homed: Vec<char>,
}

impl Default for AxisSection {
    fn default() -> Self {
        Self {
            target: 'z',
            actuator_prefix: "stepper_z".to_string(),
            require_homed: vec!['x', 'y'],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DriftCfg {
    pub base_offset: f64,
    pub scale_factor: f64,
    pub spread_multiplier: f64,
}

impl Default for DriftCfg {
    fn default() -> Self {
        Self {
            base_offset: 18.0,
            scale_factor: 5.0,
            spread_multiplier: 3.0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PreHome {
    /// Script run before every homing attempt. Accepts either:
    /// - a multi-line string: gcode = """ ... """
    /// - an array of lines: gcode = ["G4 P50", ...]
    #[serde(deserialize_with = "de_script")]
    pub gcode: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Optional JSON-lines file receiving one record per homing attempt.
    pub progress_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    pub start_position: f64,
    /// Systematic shift per move at zero homing origin.
    pub drift_base: f64,
    /// Additional shift per unit of homing origin.
    pub drift_scale: f64,
    pub jitter: f64,
    pub decay: f64,
    pub homing_origin: f64,
    pub settle_ms: u64,
    pub endstop_timeout_ms: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            start_position: 0.0,
            drift_base: 18.0,
            drift_scale: 5.0,
            jitter: 0.05,
            decay: 0.5,
            homing_origin: 0.0,
            settle_ms: 0,
            endstop_timeout_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub stable_z_home: StableZHome,
    pub axis: AxisSection,
    pub drift: DriftCfg,
    pub pre_home: PreHome,
    pub logging: Logging,
    /// Simulated host parameters (used when no hardware backend is wired in).
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptToml {
    Text(String),
    Lines(Vec<String>),
}

fn de_script<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<ScriptToml> = Option::deserialize(deserializer)?;
    let lines = match opt {
        None => Vec::new(),
        Some(ScriptToml::Text(text)) => text.lines().map(str::to_string).collect(),
        Some(ScriptToml::Lines(lines)) => lines,
    };
    Ok(lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Stable home defaults
        let home = &self.stable_z_home;
        if !home.retry_tolerance.is_finite() || home.retry_tolerance <= MIN_RETRY_TOLERANCE {
            eyre::bail!("stable_z_home.retry_tolerance must be > {MIN_RETRY_TOLERANCE}");
        }
        if home.window < 3 {
            eyre::bail!("stable_z_home.window must be >= 3");
        }

        // Axis
        if !self.axis.target.is_ascii_alphabetic() {
            eyre::bail!("axis.target must be an axis letter");
        }
        if self.axis.actuator_prefix.trim().is_empty() {
            eyre::bail!("axis.actuator_prefix must not be empty");
        }
        let target = self.axis.target.to_ascii_lowercase();
        if self
            .axis
            .require_homed
            .iter()
            .any(|a| a.to_ascii_lowercase() == target)
        {
            eyre::bail!("axis.require_homed must not contain the target axis");
        }

        // Drift
        let d = &self.drift;
        if !(d.base_offset.is_finite() && d.scale_factor.is_finite()) {
            eyre::bail!("drift.base_offset and drift.scale_factor must be finite");
        }
        if !d.spread_multiplier.is_finite() || d.spread_multiplier < 0.0 {
            eyre::bail!("drift.spread_multiplier must be finite and >= 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sim
        let s = &self.sim;
        if !s.jitter.is_finite() || s.jitter < 0.0 {
            eyre::bail!("sim.jitter must be finite and >= 0");
        }
        if !(0.0..=1.0).contains(&s.decay) {
            eyre::bail!("sim.decay must be in [0.0, 1.0]");
        }
        if !(s.start_position.is_finite()
            && s.drift_base.is_finite()
            && s.drift_scale.is_finite()
            && s.homing_origin.is_finite())
        {
            eyre::bail!("sim positions and offsets must be finite");
        }
        if s.endstop_timeout_ms == 0 {
            eyre::bail!("sim.endstop_timeout_ms must be >= 1");
        }

        Ok(())
    }
}
