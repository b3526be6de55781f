#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::suboptimal_flops
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Stable homing logic (host-agnostic).
//!
//! Homes an axis over and over until the positions it settles at stop moving,
//! after subtracting the shift each homing move is known to introduce. All
//! host interactions go through the `zhome_traits::Machine` and
//! `zhome_traits::PreHomeScript` traits.
//!
//! ## Architecture
//!
//! - **Drift**: linear expected-offset model (`drift` module)
//! - **Window**: bounded FIFO of recent positions (`window` module)
//! - **Control**: bounded retry loop with a `begin`/`step` state machine
//!   (`controller` module)
//! - **Reporting**: per-attempt progress sinks (`report` module)
//! - **Construction**: type-state builder and a generic constructor
//!   (`builder` module), one-shot `runner::run`
//!
//! ## Convergence test
//!
//! Once `window_size` samples are held, the run converges when
//! `|range - spread_multiplier * (base_offset + scale_factor * input)|` is at
//! most `retry_tolerance + 1e-4`, where `input` is the homing origin read on
//! the same attempt.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod drift;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod report;
pub mod runner;
pub mod status;
pub mod window;

pub use builder::{HomeBuilder, Missing, Set, StableHome, StableHomeG, build_controller};
pub use config::{AxisCfg, HomeCfg, MIN_OVERRIDE_TOLERANCE, MIN_WINDOW, Overrides, TOLERANCE_EPSILON};
pub use controller::{ConvergenceController, Sample};
pub use drift::DriftModel;
pub use error::{BuildError, HomeError, Report, Result};
pub use hw_error::{HwStage, map_hw_error};
pub use mocks::NoopScript;
pub use report::{Fanout, IterationReport, ProgressReporter, RecordingReporter, TracingReporter};
pub use runner::RunParams;
pub use status::{ControllerState, Outcome, StepStatus};
pub use window::WindowBuffer;
