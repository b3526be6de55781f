mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{CountingMachine, at_zero, cfg, replay, replay_with_script};
use rstest::rstest;
use zhome_core::{
    AxisCfg, ControllerState, DriftModel, HomeCfg, HomeError, Outcome, RecordingReporter, Report,
    StableHomeG, build_controller,
};
use zhome_hardware::{SimParams, SimulatedMachine};
use zhome_traits::{BoxError, PreHomeScript};

fn counting(
    machine: CountingMachine,
    script: Option<Box<dyn PreHomeScript>>,
) -> StableHomeG<CountingMachine> {
    build_controller(
        machine,
        cfg(5, 0.0025, 3),
        AxisCfg::default(),
        DriftModel::default(),
        script,
        None,
        None,
    )
    .unwrap()
}

fn home_error(err: &Report) -> HomeError {
    err.downcast_ref::<HomeError>()
        .cloned()
        .unwrap_or_else(|| panic!("expected HomeError, got {err:?}"))
}

#[rstest]
#[case(vec![], "must home X and Y axes first")]
#[case(vec!['x'], "must home X and Y axes first")]
fn unhomed_axes_fail_before_any_attempt(#[case] homed: Vec<char>, #[case] msg: &str) {
    let mut home = counting(
        CountingMachine {
            homed,
            ..CountingMachine::default()
        },
        None,
    );
    let err = home.run().unwrap_err();
    assert_eq!(home_error(&err), HomeError::Precondition(msg.into()));
    assert_eq!(home.machine().homes, 0);
    assert_eq!(home.state(), ControllerState::Init);
}

#[rstest]
fn missing_actuator_is_a_precondition_failure() {
    let mut home = counting(
        CountingMachine {
            names: vec!["stepper_x".into(), "extruder".into()],
            ..CountingMachine::default()
        },
        None,
    );
    let err = home.begin().unwrap_err();
    assert_eq!(
        home_error(&err),
        HomeError::Precondition("no actuator matching 'stepper_z' found".into())
    );
}

#[rstest]
fn first_matching_actuator_is_sampled() {
    let mut home = counting(
        CountingMachine {
            names: vec!["stepper_z1".into(), "stepper_z".into()],
            ..CountingMachine::default()
        },
        None,
    );
    home.begin().unwrap();
    assert_eq!(home.actuator(), Some("stepper_z1"));
}

#[rstest]
fn script_failure_stops_without_homing() {
    let calls = Rc::new(Cell::new(0u32));
    let c = calls.clone();
    let script = move || -> Result<(), BoxError> {
        c.set(c.get() + 1);
        Err("macro aborted".into())
    };
    let mut home = counting(CountingMachine::default(), Some(Box::new(script)));
    let outcome = home.run().unwrap();
    assert_eq!(
        outcome,
        Outcome::ActionFailed {
            cause: "pre-action script failed: macro aborted".into()
        }
    );
    assert_eq!(calls.get(), 1);
    assert_eq!(home.machine().homes, 0);
    assert_eq!(home.state(), ControllerState::Failed);
    assert!(home.step().is_err());
}

#[rstest]
fn script_failure_mid_run_keeps_earlier_attempts() {
    let calls = Rc::new(Cell::new(0u32));
    let c = calls.clone();
    let script = move || -> Result<(), BoxError> {
        c.set(c.get() + 1);
        if c.get() == 3 {
            Err("heater fault".into())
        } else {
            Ok(())
        }
    };
    let (mut home, rec) = replay_with_script(
        &at_zero(&[0.0, 18.0, 36.0, 54.0]),
        cfg(4, 0.0025, 4),
        DriftModel::default(),
        Some(Box::new(script)),
    );
    let outcome = home.run().unwrap();
    assert!(matches!(outcome, Outcome::ActionFailed { .. }));
    assert_eq!(home.machine().consumed(), 2);
    assert_eq!(rec.reports().len(), 2);
    assert_eq!(rec.outcome(), Some(outcome));
}

#[rstest]
fn homing_failure_propagates_as_error() {
    let mut home = counting(
        CountingMachine {
            fail_home: Some("endstop wiring open".into()),
            ..CountingMachine::default()
        },
        None,
    );
    let err = home.run().unwrap_err();
    assert_eq!(
        home_error(&err),
        HomeError::Homing("endstop wiring open".into())
    );
    assert!(format!("{err:#}").contains("homing axis z on attempt 1"));
    assert_eq!(home.state(), ControllerState::Failed);
    assert_eq!(home.machine().reads, 0);
}

#[rstest]
fn host_timeout_text_survives_into_the_report() {
    let mut home = counting(
        CountingMachine {
            fail_home: Some("mcu 'z' serial timeout during G28".into()),
            ..CountingMachine::default()
        },
        None,
    );
    let err = home.run().unwrap_err();
    assert_eq!(
        home_error(&err),
        HomeError::Timeout("mcu 'z' serial timeout during G28".into())
    );
    let rendered = format!("{err:#}");
    assert!(rendered.contains("homing axis z on attempt 1"));
    assert!(rendered.contains("serial timeout during G28"), "{rendered}");
    assert_eq!(home.state(), ControllerState::Failed);
}

#[rstest]
fn position_read_failure_is_a_sensor_error() {
    let mut home = counting(
        CountingMachine {
            fail_read: Some("mcu disconnected".into()),
            ..CountingMachine::default()
        },
        None,
    );
    let err = home.run().unwrap_err();
    assert_eq!(
        home_error(&err),
        HomeError::Sensor("mcu disconnected".into())
    );
}

#[rstest]
fn non_finite_position_is_a_sensor_error() {
    let mut home = counting(
        CountingMachine {
            position: f64::NAN,
            ..CountingMachine::default()
        },
        None,
    );
    let err = home.run().unwrap_err();
    assert!(matches!(home_error(&err), HomeError::Sensor(_)));
}

#[rstest]
fn running_past_a_recording_is_a_homing_failure() {
    let (mut home, _) = replay(&at_zero(&[0.0, 1.0]), cfg(5, 0.0025, 3), DriftModel::default());
    let err = home.run().unwrap_err();
    assert_eq!(
        home_error(&err),
        HomeError::Homing("recording exhausted after 2 samples".into())
    );
}

#[rstest]
fn endstop_timeout_maps_to_timeout() {
    let machine = SimulatedMachine::new(SimParams {
        fail_home_at: Some(2),
        endstop_timeout_ms: 5,
        ..SimParams::default()
    });
    let rec = RecordingReporter::new();
    let mut home = build_controller(
        machine,
        HomeCfg::default(),
        AxisCfg::default(),
        DriftModel::default(),
        None,
        Some(Box::new(rec.clone())),
        None,
    )
    .unwrap();
    let err = home.run().unwrap_err();
    match home_error(&err) {
        HomeError::Timeout(msg) => assert!(msg.starts_with("endstop did not trigger within")),
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(rec.reports().len(), 1);
    assert_eq!(rec.outcome(), None);
}
