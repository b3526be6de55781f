//! Configuration types for the stable-home controller.
//!
//! These are the runtime configuration structs used by the controller.
//! They are separate from the TOML-deserialized config in `zhome_config`.

use crate::error::HomeError;

/// Rounding margin always added to the retry tolerance.
pub const TOLERANCE_EPSILON: f64 = 1e-4;
/// Smallest window that can tell oscillation from drift.
pub const MIN_WINDOW: usize = 3;
/// Smallest retry tolerance a per-invocation override may request.
pub const MIN_OVERRIDE_TOLERANCE: f64 = 0.001;

/// Retry loop configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeCfg {
    /// Homing attempts before giving up. 0 ends the run without homing.
    pub max_retries: u32,
    /// Accepted drift-compensated window spread, before `TOLERANCE_EPSILON`.
    pub retry_tolerance: f64,
    /// Number of most recent samples the convergence test looks at.
    pub window_size: usize,
}

impl Default for HomeCfg {
    fn default() -> Self {
        Self {
            max_retries: 20,
            retry_tolerance: 0.0025,
            window_size: 4,
        }
    }
}

impl HomeCfg {
    pub fn validate(&self) -> Result<(), HomeError> {
        if !self.retry_tolerance.is_finite() || self.retry_tolerance <= 0.0 {
            return Err(HomeError::Config(
                "retry_tolerance must be > 0".to_string(),
            ));
        }
        if self.window_size < MIN_WINDOW {
            return Err(HomeError::Config(format!(
                "window_size must be >= {MIN_WINDOW}"
            )));
        }
        Ok(())
    }

    /// Tolerance the spread is compared against.
    #[inline]
    pub fn effective_tolerance(&self) -> f64 {
        self.retry_tolerance + TOLERANCE_EPSILON
    }

    /// Merge per-invocation overrides and re-validate.
    pub fn with_overrides(&self, o: &Overrides) -> Result<Self, HomeError> {
        if let Some(t) = o.retry_tolerance
            && !(t.is_finite() && t >= MIN_OVERRIDE_TOLERANCE)
        {
            return Err(HomeError::Config(format!(
                "RETRY_TOLERANCE must be >= {MIN_OVERRIDE_TOLERANCE}"
            )));
        }
        if let Some(w) = o.window
            && w < MIN_WINDOW
        {
            return Err(HomeError::Config(format!("WINDOW must be >= {MIN_WINDOW}")));
        }
        let merged = Self {
            max_retries: o.retries.unwrap_or(self.max_retries),
            retry_tolerance: o.retry_tolerance.unwrap_or(self.retry_tolerance),
            window_size: o.window.unwrap_or(self.window_size),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Caller-supplied values that replace the configured defaults for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub retries: Option<u32>,
    pub retry_tolerance: Option<f64>,
    pub window: Option<usize>,
}

/// Which axis is homed and which actuator reports its position.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCfg {
    pub target: char,
    /// The first actuator whose name starts with this prefix is sampled.
    pub actuator_prefix: String,
    /// Axes that must already be homed.
    pub require_homed: Vec<char>,
}

impl Default for AxisCfg {
    fn default() -> Self {
        Self {
            target: 'z',
            actuator_prefix: "stepper_z".to_string(),
            require_homed: vec!['x', 'y'],
        }
    }
}
