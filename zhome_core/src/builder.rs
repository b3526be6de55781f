//! Type-state builder for `StableHome` and generic `build_controller` constructor.
//!
//! The builder enforces at compile time that a Machine is provided before
//! `build()` is available. `try_build()` is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use zhome_traits::clock::{Clock, MonotonicClock};
use zhome_traits::{Machine, PreHomeScript};

use crate::config::{AxisCfg, HomeCfg};
use crate::controller::{ConvergenceController, Sample};
use crate::drift::DriftModel;
use crate::error::{BuildError, Result};
use crate::mocks::NoopScript;
use crate::report::{ProgressReporter, TracingReporter};
use crate::status::{ControllerState, Outcome, StepStatus};
use crate::window::WindowBuffer;

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

/// Boxed controller; the host is chosen at runtime.
pub struct StableHome {
    pub(crate) inner: ConvergenceController<Box<dyn Machine>>,
}

impl core::fmt::Debug for StableHome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StableHome")
            .field("cfg", &self.inner.cfg)
            .field("state", &self.inner.state)
            .finish_non_exhaustive()
    }
}

impl StableHome {
    /// Start building a StableHome.
    pub fn builder() -> HomeBuilder<Missing> {
        HomeBuilder::default()
    }

    pub fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    /// One homing attempt.
    pub fn step(&mut self) -> Result<StepStatus> {
        self.inner.step()
    }

    pub fn run(&mut self) -> Result<Outcome> {
        self.inner.run()
    }

    pub fn state(&self) -> ControllerState {
        self.inner.state()
    }

    pub fn cfg(&self) -> &HomeCfg {
        self.inner.cfg()
    }

    pub fn window(&self) -> &WindowBuffer {
        self.inner.window()
    }

    pub fn last_sample(&self) -> Option<&Sample> {
        self.inner.last_sample()
    }

    pub fn actuator(&self) -> Option<&str> {
        self.inner.actuator()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.inner.elapsed_ms()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `StableHome`. All fields are validated on `build()`.
pub struct HomeBuilder<Mach> {
    machine: Option<Box<dyn Machine>>,
    script: Option<Box<dyn PreHomeScript>>,
    cfg: Option<HomeCfg>,
    axis: Option<AxisCfg>,
    drift: Option<DriftModel>,
    reporter: Option<Box<dyn ProgressReporter>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    _m: PhantomData<Mach>,
}

impl Default for HomeBuilder<Missing> {
    fn default() -> Self {
        Self {
            machine: None,
            script: None,
            cfg: None,
            axis: None,
            drift: None,
            reporter: None,
            clock: None,
            _m: PhantomData,
        }
    }
}

/// Validate configuration and construct a `ConvergenceController`.
///
/// Shared by `HomeBuilder::try_build()` and `build_controller()`.
fn validate_and_build<M: Machine>(
    machine: M,
    script: Box<dyn PreHomeScript>,
    cfg: HomeCfg,
    axis: AxisCfg,
    drift: DriftModel,
    reporter: Box<dyn ProgressReporter>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<ConvergenceController<M>> {
    cfg.validate().map_err(eyre::Report::new)?;
    if !axis.target.is_ascii_alphabetic() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "axis target must be an axis letter",
        )));
    }
    if axis.actuator_prefix.is_empty() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "actuator_prefix must not be empty",
        )));
    }
    if !(drift.base_offset.is_finite()
        && drift.scale_factor.is_finite()
        && drift.spread_multiplier.is_finite())
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "drift constants must be finite",
        )));
    }

    let window = WindowBuffer::new(cfg.window_size).map_err(eyre::Report::new)?;
    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    Ok(ConvergenceController {
        machine,
        script,
        cfg,
        axis,
        drift,
        window,
        reporter,
        clock,
        epoch,
        state: ControllerState::Init,
        actuator: None,
        retry: 0,
        last_sample: None,
        outcome: None,
    })
}

impl<Mach> HomeBuilder<Mach> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<StableHome> {
        let machine = self
            .machine
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMachine))?;

        let inner = validate_and_build(
            machine,
            self.script.unwrap_or_else(|| Box::new(NoopScript)),
            self.cfg.unwrap_or_default(),
            self.axis.unwrap_or_default(),
            self.drift.unwrap_or_default(),
            self.reporter.unwrap_or_else(|| Box::new(TracingReporter)),
            self.clock,
        )?;

        Ok(StableHome { inner })
    }

    // Chainable setters that do not affect type-state.

    pub fn with_cfg(mut self, cfg: HomeCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }
    pub fn with_axis(mut self, axis: AxisCfg) -> Self {
        self.axis = Some(axis);
        self
    }
    pub fn with_drift(mut self, drift: DriftModel) -> Self {
        self.drift = Some(drift);
        self
    }
    /// Script run before every homing attempt; defaults to `NoopScript`.
    pub fn with_script(mut self, script: impl PreHomeScript + 'static) -> Self {
        self.script = Some(Box::new(script));
        self
    }
    /// Progress sink; defaults to `TracingReporter`.
    pub fn with_reporter(mut self, reporter: impl ProgressReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setter that advances type-state
impl HomeBuilder<Missing> {
    pub fn with_machine(self, machine: impl Machine + 'static) -> HomeBuilder<Set> {
        HomeBuilder {
            machine: Some(Box::new(machine)),
            script: self.script,
            cfg: self.cfg,
            axis: self.axis,
            drift: self.drift,
            reporter: self.reporter,
            clock: self.clock,
            _m: PhantomData,
        }
    }
}

impl HomeBuilder<Set> {
    /// Validate and build. Only available once a Machine is set.
    pub fn build(self) -> Result<StableHome> {
        self.try_build()
    }
}

/// Generic, statically-dispatched alias.
pub type StableHomeG<M> = ConvergenceController<M>;

/// Build a statically-dispatched controller around a concrete host.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_controller<M>(
    machine: M,
    cfg: HomeCfg,
    axis: AxisCfg,
    drift: DriftModel,
    script: Option<Box<dyn PreHomeScript>>,
    reporter: Option<Box<dyn ProgressReporter>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<StableHomeG<M>>
where
    M: Machine,
{
    validate_and_build(
        machine,
        script.unwrap_or_else(|| Box::new(NoopScript)),
        cfg,
        axis,
        drift,
        reporter.unwrap_or_else(|| Box::new(TracingReporter)),
        clock,
    )
}
