#![allow(dead_code)]

use zhome_core::{AxisCfg, DriftModel, HomeCfg, RecordingReporter, StableHomeG, build_controller};
use zhome_hardware::ReplayMachine;
use zhome_traits::{BoxError, Machine, PreHomeScript};

/// Host double that counts every call and can be told to fail.
#[derive(Debug, Clone)]
pub struct CountingMachine {
    pub homed: Vec<char>,
    pub names: Vec<String>,
    pub position: f64,
    pub fail_home: Option<String>,
    pub fail_read: Option<String>,
    pub homes: u32,
    pub reads: u32,
}

impl Default for CountingMachine {
    fn default() -> Self {
        Self {
            homed: vec!['x', 'y'],
            names: vec!["stepper_x".into(), "stepper_y".into(), "stepper_z".into()],
            position: 0.0,
            fail_home: None,
            fail_read: None,
            homes: 0,
            reads: 0,
        }
    }
}

impl Machine for CountingMachine {
    fn homed_axes(&self) -> Vec<char> {
        self.homed.clone()
    }
    fn actuator_names(&self) -> Vec<String> {
        self.names.clone()
    }
    fn home(&mut self, _axis: char) -> Result<(), BoxError> {
        self.homes += 1;
        match &self.fail_home {
            Some(msg) => Err(Box::new(std::io::Error::other(msg.clone()))),
            None => Ok(()),
        }
    }
    fn actuator_position(&mut self, _name: &str) -> Result<f64, BoxError> {
        self.reads += 1;
        match &self.fail_read {
            Some(msg) => Err(Box::new(std::io::Error::other(msg.clone()))),
            None => Ok(self.position),
        }
    }
    fn calibration_input(&self, _axis: char) -> f64 {
        0.0
    }
}

pub fn cfg(max_retries: u32, retry_tolerance: f64, window_size: usize) -> HomeCfg {
    HomeCfg {
        max_retries,
        retry_tolerance,
        window_size,
    }
}

/// Controller over a replayed `(position, calibration_input)` sequence.
pub fn replay(
    rows: &[(f64, f64)],
    cfg: HomeCfg,
    drift: DriftModel,
) -> (StableHomeG<ReplayMachine>, RecordingReporter) {
    replay_with_script(rows, cfg, drift, None)
}

pub fn replay_with_script(
    rows: &[(f64, f64)],
    cfg: HomeCfg,
    drift: DriftModel,
    script: Option<Box<dyn PreHomeScript>>,
) -> (StableHomeG<ReplayMachine>, RecordingReporter) {
    let rec = RecordingReporter::new();
    let home = build_controller(
        ReplayMachine::new("stepper_z", 'z', rows.to_vec()),
        cfg,
        AxisCfg::default(),
        drift,
        script,
        Some(Box::new(rec.clone())),
        None,
    )
    .expect("valid controller");
    (home, rec)
}

/// Rows at a constant calibration input of zero.
pub fn at_zero(positions: &[f64]) -> Vec<(f64, f64)> {
    positions.iter().map(|&p| (p, 0.0)).collect()
}
