//! Maps `Box<dyn Error>` from the host boundary to typed `HomeError`.
//!
//! The traits in `zhome_traits` use `Box<dyn Error + Send + Sync>` so any host
//! can plug in; this module converts those to our typed error enum, with an
//! optional feature-gated path for `zhome_hardware::HwError` downcasting.

use crate::error::HomeError;

/// Which host call produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwStage {
    Homing,
    Position,
}

impl HwStage {
    fn wrap(self, msg: String) -> HomeError {
        match self {
            Self::Homing => HomeError::Homing(msg),
            Self::Position => HomeError::Sensor(msg),
        }
    }
}

/// Map a host-boundary error to a typed `HomeError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(stage: HwStage, e: &(dyn std::error::Error + 'static)) -> HomeError {
    #[cfg(feature = "hardware-errors")]
    {
        use zhome_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EndstopTimeout(_) => HomeError::Timeout(hw.to_string()),
                other => stage.wrap(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        HomeError::Timeout(s)
    } else {
        stage.wrap(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_errors_map_by_stage() {
        let e = std::io::Error::other("endstop wiring open");
        assert_eq!(
            map_hw_error(HwStage::Homing, &e),
            HomeError::Homing("endstop wiring open".into())
        );
        assert_eq!(
            map_hw_error(HwStage::Position, &e),
            HomeError::Sensor("endstop wiring open".into())
        );
    }

    #[test]
    fn timeouts_are_detected_from_text() {
        let e = std::io::Error::other("MCU Timed Out");
        assert_eq!(
            map_hw_error(HwStage::Homing, &e),
            HomeError::Timeout("MCU Timed Out".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        use zhome_hardware::error::HwError;
        assert_eq!(
            map_hw_error(HwStage::Homing, &HwError::EndstopTimeout(50)),
            HomeError::Timeout("endstop did not trigger within 50 ms".into())
        );
        assert_eq!(
            map_hw_error(HwStage::Position, &HwError::NotHomed('z')),
            HomeError::Sensor("axis 'z' is not homed".into())
        );
    }
}
