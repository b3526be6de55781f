//! Motion hosts for the stable-home controller.
//!
//! - `sim`: simulated X/Y/Z machine with a drifting, settling Z endstop
//! - `replay`: feeds a recorded session back through the `Machine` trait
pub mod error;
pub mod replay;
pub mod sim;
pub mod util;

pub use replay::ReplayMachine;
pub use sim::{SimParams, SimScript, SimulatedMachine};
