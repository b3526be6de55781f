//! `From` implementations bridging `zhome_config` types to `zhome_core` types.

use crate::config::{AxisCfg, HomeCfg};
use crate::drift::DriftModel;

// ── HomeCfg ──────────────────────────────────────────────────────────────────

impl From<&zhome_config::StableZHome> for HomeCfg {
    fn from(c: &zhome_config::StableZHome) -> Self {
        Self {
            max_retries: c.retries,
            retry_tolerance: c.retry_tolerance,
            window_size: c.window,
        }
    }
}

// ── AxisCfg ──────────────────────────────────────────────────────────────────

impl From<&zhome_config::AxisSection> for AxisCfg {
    fn from(c: &zhome_config::AxisSection) -> Self {
        Self {
            target: c.target.to_ascii_lowercase(),
            actuator_prefix: c.actuator_prefix.trim().to_string(),
            require_homed: c
                .require_homed
                .iter()
                .map(char::to_ascii_lowercase)
                .collect(),
        }
    }
}

// ── DriftModel ───────────────────────────────────────────────────────────────

impl From<&zhome_config::DriftCfg> for DriftModel {
    fn from(c: &zhome_config::DriftCfg) -> Self {
        Self {
            base_offset: c.base_offset,
            scale_factor: c.scale_factor,
            spread_multiplier: c.spread_multiplier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_core_defaults() {
        let cfg = zhome_config::Config::default();
        assert_eq!(HomeCfg::from(&cfg.stable_z_home), HomeCfg::default());
        assert_eq!(AxisCfg::from(&cfg.axis), AxisCfg::default());
        assert_eq!(DriftModel::from(&cfg.drift), DriftModel::default());
    }

    #[test]
    fn axis_letters_are_normalized() {
        let section = zhome_config::AxisSection {
            target: 'Z',
            actuator_prefix: " stepper_z ".into(),
            require_homed: vec!['X', 'y'],
        };
        let axis = AxisCfg::from(&section);
        assert_eq!(axis.target, 'z');
        assert_eq!(axis.actuator_prefix, "stepper_z");
        assert_eq!(axis.require_homed, vec!['x', 'y']);
    }
}
