pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing the host boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Motion-control host that owns the kinematic axes.
///
/// Axes are identified by their lowercase letter (`'x'`, `'y'`, `'z'`);
/// actuators by the host's name for them (e.g. `"stepper_z"`).
pub trait Machine {
    /// Axes that are currently in a homed state.
    fn homed_axes(&self) -> Vec<char>;

    /// Names of every position-reporting actuator the host knows about.
    fn actuator_names(&self) -> Vec<String>;

    /// Run the homing move for `axis`. Blocks until motion and settling complete.
    fn home(&mut self, axis: char) -> Result<(), BoxError>;

    /// Position of the named actuator, relative to the zero the last homing
    /// move established.
    fn actuator_position(&mut self, name: &str) -> Result<f64, BoxError>;

    /// Current homing-origin offset applied to `axis`.
    fn calibration_input(&self, axis: char) -> f64;
}

/// User-supplied side effect run before every homing attempt.
pub trait PreHomeScript {
    fn run(&mut self) -> Result<(), BoxError>;
}

impl<F> PreHomeScript for F
where
    F: FnMut() -> Result<(), BoxError>,
{
    fn run(&mut self) -> Result<(), BoxError> {
        self()
    }
}

impl<M: Machine + ?Sized> Machine for Box<M> {
    fn homed_axes(&self) -> Vec<char> {
        (**self).homed_axes()
    }
    fn actuator_names(&self) -> Vec<String> {
        (**self).actuator_names()
    }
    fn home(&mut self, axis: char) -> Result<(), BoxError> {
        (**self).home(axis)
    }
    fn actuator_position(&mut self, name: &str) -> Result<f64, BoxError> {
        (**self).actuator_position(name)
    }
    fn calibration_input(&self, axis: char) -> f64 {
        (**self).calibration_input(axis)
    }
}
