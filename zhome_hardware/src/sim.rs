//! Simulated motion host.
//!
//! The Z actuator lands at a position that shifts by a systematic amount on
//! every homing move (`drift_base + drift_scale * homing_origin`) plus an
//! alternating jitter that decays geometrically, which is roughly how a
//! probe-based Z endstop settles after a cold start.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use zhome_traits::{BoxError, Clock, Machine, MonotonicClock, PreHomeScript};

use crate::error::HwError;
use crate::util::wait_until_triggered;

const AXES: [char; 3] = ['x', 'y', 'z'];
const ENDSTOP_POLL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct SimParams {
    /// Z position reported after the first homing move.
    pub start_position: f64,
    /// Systematic Z shift per homing move at zero homing origin.
    pub drift_base: f64,
    /// Additional Z shift per unit of homing origin.
    pub drift_scale: f64,
    /// Initial jitter amplitude; the sign alternates every move.
    pub jitter: f64,
    /// Jitter decay factor applied per move, in [0, 1].
    pub decay: f64,
    /// Initial Z homing origin.
    pub homing_origin: f64,
    /// Dwell after the endstop triggers.
    pub settle_ms: u64,
    pub endstop_timeout_ms: u64,
    /// Axes already homed when the simulation starts.
    pub homed_axes: Vec<char>,
    /// 1-based Z homing move whose endstop never triggers.
    pub fail_home_at: Option<u32>,
}

impl Default for SimParams {
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
            homed_axes: vec!['x', 'y'],
            fail_home_at: None,
        }
    }
}

#[derive(Debug)]
struct SimState {
    params: SimParams,
    homed: Vec<char>,
    origins: [f64; 3],
    homes: [u32; 3],
    z_base: Option<f64>,
    positions: [Option<f64>; 3],
}

fn axis_index(axis: char) -> Option<usize> {
    AXES.iter().position(|a| *a == axis.to_ascii_lowercase())
}

fn actuator_axis(name: &str) -> Option<char> {
    let rest = name.strip_prefix("stepper_")?;
    let mut chars = rest.chars();
    let axis = chars.next()?;
    axis_index(axis)?;
    Some(axis)
}

/// Simulated host with X, Y and Z steppers.
pub struct SimulatedMachine<C: Clock = MonotonicClock> {
    state: Rc<RefCell<SimState>>,
    clock: C,
}

impl SimulatedMachine<MonotonicClock> {
    pub fn new(params: SimParams) -> Self {
        Self::with_clock(params, MonotonicClock::new())
    }
}

impl<C: Clock + Clone> SimulatedMachine<C> {
    pub fn with_clock(params: SimParams, clock: C) -> Self {
        let mut origins = [0.0; 3];
        origins[2] = params.homing_origin;
        let homed = params
            .homed_axes
            .iter()
            .map(char::to_ascii_lowercase)
            .collect();
        Self {
            state: Rc::new(RefCell::new(SimState {
                params,
                homed,
                origins,
                homes: [0; 3],
                z_base: None,
                positions: [None; 3],
            })),
            clock,
        }
    }

    /// Number of homing moves performed on `axis`.
    pub fn homes(&self, axis: char) -> u32 {
        axis_index(axis).map_or(0, |i| self.state.borrow().homes[i])
    }

    /// Pre-home script bound to this machine's state.
    pub fn script(&self, lines: Vec<String>) -> SimScript<C> {
        SimScript {
            state: Rc::clone(&self.state),
            clock: self.clock.clone(),
            lines,
        }
    }
}

impl<C: Clock> SimulatedMachine<C> {
    fn home_axis(&mut self, axis: char) -> crate::error::Result<()> {
        let idx = axis_index(axis).ok_or(HwError::UnknownAxis(axis))?;
        let (attempt, timeout_ms, settle_ms) = {
            let mut st = self.state.borrow_mut();
            st.homes[idx] = st.homes[idx].saturating_add(1);
            st.homed.retain(|a| *a != AXES[idx]);
            (
                st.homes[idx],
                st.params.endstop_timeout_ms,
                st.params.settle_ms,
            )
        };
        let stuck = idx == 2 && self.state.borrow().params.fail_home_at == Some(attempt);

        wait_until_triggered(
            || !stuck,
            Duration::from_millis(timeout_ms),
            ENDSTOP_POLL,
            &self.clock,
        )?;
        self.clock.sleep(Duration::from_millis(settle_ms));

        let mut st = self.state.borrow_mut();
        let position = if idx == 2 {
            let drift = st.params.drift_base + st.params.drift_scale * st.origins[2];
            let base = st
                .z_base
                .map_or(st.params.start_position, |prev| prev + drift);
            st.z_base = Some(base);
            let k = attempt.saturating_sub(1);
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            let exp = i32::try_from(k).unwrap_or(i32::MAX);
            base + sign * st.params.jitter * st.params.decay.powi(exp)
        } else {
            0.0
        };
        st.positions[idx] = Some(position);
        st.homed.push(AXES[idx]);
        tracing::debug!(axis = %AXES[idx], attempt, position, "sim homing complete");
        Ok(())
    }
}

impl<C: Clock> Machine for SimulatedMachine<C> {
    fn homed_axes(&self) -> Vec<char> {
        self.state.borrow().homed.clone()
    }

    fn actuator_names(&self) -> Vec<String> {
        AXES.iter().map(|a| format!("stepper_{a}")).collect()
    }

    fn home(&mut self, axis: char) -> Result<(), BoxError> {
        self.home_axis(axis).map_err(|e| {
            tracing::warn!(error = %e, axis = %axis, "sim homing failed");
            Box::new(e) as BoxError
        })
    }

    fn actuator_position(&mut self, name: &str) -> Result<f64, BoxError> {
        let axis = actuator_axis(name).ok_or_else(|| HwError::UnknownActuator(name.into()))?;
        let idx = axis_index(axis).ok_or(HwError::UnknownAxis(axis))?;
        let pos = self.state.borrow().positions[idx];
        Ok(pos.ok_or(HwError::NotHomed(axis))?)
    }

    fn calibration_input(&self, axis: char) -> f64 {
        axis_index(axis).map_or(0.0, |i| self.state.borrow().origins[i])
    }
}

/// Pre-home script understood by the simulator.
///
/// Supported lines: `SET_HOMING_ORIGIN Z=<mm>` (any of X/Y/Z), `G4 P<ms>`
/// dwell, blank lines and `;` comments. Anything else fails.
pub struct SimScript<C: Clock = MonotonicClock> {
    state: Rc<RefCell<SimState>>,
    clock: C,
    lines: Vec<String>,
}

impl<C: Clock> SimScript<C> {
    fn exec(&self, line: &str) -> crate::error::Result<()> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(());
        };
        match cmd.to_ascii_uppercase().as_str() {
            "SET_HOMING_ORIGIN" => {
                for arg in parts {
                    let (k, v) = arg
                        .split_once('=')
                        .ok_or_else(|| HwError::Script(format!("malformed argument '{arg}'")))?;
                    let axis = k
                        .chars()
                        .next()
                        .and_then(|c| axis_index(c).map(|i| (c, i)))
                        .filter(|_| k.len() == 1)
                        .ok_or_else(|| HwError::Script(format!("unknown axis '{k}'")))?;
                    let value: f64 = v
                        .parse()
                        .map_err(|_| HwError::Script(format!("invalid value '{v}'")))?;
                    self.state.borrow_mut().origins[axis.1] = value;
                }
                Ok(())
            }
            "G4" => {
                let ms = parts
                    .next()
                    .and_then(|p| p.strip_prefix(['P', 'p']))
                    .and_then(|p| p.parse::<u64>().ok())
                    .ok_or_else(|| HwError::Script(format!("G4 needs P<ms>: '{line}'")))?;
                self.clock.sleep(Duration::from_millis(ms));
                Ok(())
            }
            _ => Err(HwError::Script(format!("unknown command '{cmd}'"))),
        }
    }
}

impl<C: Clock> PreHomeScript for SimScript<C> {
    fn run(&mut self) -> Result<(), BoxError> {
        for raw in &self.lines {
            let line = raw.split(';').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            tracing::debug!(line, "pre-home script");
            self.exec(line).map_err(|e| Box::new(e) as BoxError)?;
        }
        Ok(())
    }
}
