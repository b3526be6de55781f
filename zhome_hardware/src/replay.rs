//! Host that replays a recorded homing session.
//!
//! Each homing move consumes the next recorded `(position, calibration_input)`
//! pair, so the controller sees exactly the sequence captured on a real rig.

use zhome_traits::{BoxError, Machine};

use crate::error::HwError;

pub struct ReplayMachine {
    actuator: String,
    axis: char,
    rows: Vec<(f64, f64)>,
    consumed: usize,
}

impl ReplayMachine {
    /// `rows` are `(position, calibration_input)` in recording order.
    pub fn new(actuator: impl Into<String>, axis: char, rows: Vec<(f64, f64)>) -> Self {
        Self {
            actuator: actuator.into(),
            axis: axis.to_ascii_lowercase(),
            rows,
            consumed: 0,
        }
    }

    /// Number of recorded samples handed out so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    fn current(&self) -> Option<&(f64, f64)> {
        self.consumed.checked_sub(1).and_then(|i| self.rows.get(i))
    }
}

impl Machine for ReplayMachine {
    fn homed_axes(&self) -> Vec<char> {
        vec!['x', 'y']
    }

    fn actuator_names(&self) -> Vec<String> {
        vec![self.actuator.clone()]
    }

    fn home(&mut self, axis: char) -> Result<(), BoxError> {
        if axis.to_ascii_lowercase() != self.axis {
            return Err(Box::new(HwError::UnknownAxis(axis)));
        }
        if self.consumed >= self.rows.len() {
            return Err(Box::new(HwError::RecordingExhausted(self.rows.len())));
        }
        self.consumed += 1;
        Ok(())
    }

    fn actuator_position(&mut self, name: &str) -> Result<f64, BoxError> {
        if name != self.actuator {
            return Err(Box::new(HwError::UnknownActuator(name.to_string())));
        }
        self.current()
            .map(|(pos, _)| *pos)
            .ok_or_else(|| Box::new(HwError::NotHomed(self.axis)) as BoxError)
    }

    fn calibration_input(&self, _axis: char) -> f64 {
        // Before the first move the next row's input is what the rig will use.
        self.current()
            .or_else(|| self.rows.first())
            .map_or(0.0, |(_, input)| *input)
    }
}
