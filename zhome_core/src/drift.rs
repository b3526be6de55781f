//! Linear model of the systematic shift each homing move introduces.
//!
//! On the reference rig every homing move moves the Z stepper's commanded
//! position by `base_offset + scale_factor * homing_origin`, so a full window
//! of `window` samples spans roughly `spread_multiplier` such steps even when
//! the endstop itself is perfectly repeatable. The controller subtracts that
//! predictable span before testing for stability.

use crate::error::HomeError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftModel {
    pub base_offset: f64,
    pub scale_factor: f64,
    pub spread_multiplier: f64,
}

impl Default for DriftModel {
    fn default() -> Self {
        Self {
            base_offset: 18.0,
            scale_factor: 5.0,
            spread_multiplier: 3.0,
        }
    }
}

impl DriftModel {
    pub fn new(
        base_offset: f64,
        scale_factor: f64,
        spread_multiplier: f64,
    ) -> Result<Self, HomeError> {
        if !(base_offset.is_finite() && scale_factor.is_finite() && spread_multiplier.is_finite())
        {
            return Err(HomeError::Config(
                "drift constants must be finite".to_string(),
            ));
        }
        Ok(Self {
            base_offset,
            scale_factor,
            spread_multiplier,
        })
    }

    /// No compensation: the spread is the plain window range.
    pub const fn none() -> Self {
        Self {
            base_offset: 0.0,
            scale_factor: 0.0,
            spread_multiplier: 0.0,
        }
    }

    /// Systematic shift of one homing move at `calibration_input`.
    #[inline]
    pub fn expected_offset(&self, calibration_input: f64) -> f64 {
        self.base_offset + self.scale_factor * calibration_input
    }

    /// Span of a full window caused by drift alone.
    #[inline]
    pub fn expected_window_spread(&self, calibration_input: f64) -> f64 {
        self.spread_multiplier * self.expected_offset(calibration_input)
    }
}
