//! Controller state, terminal outcomes and per-step status.

use crate::error::HomeError;

/// Lifecycle of one stable-home run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Built, `begin()` not called (or last `begin()` failed).
    Init,
    /// `retry` attempts have completed so far.
    Iterating { retry: u32 },
    Converged,
    Exhausted,
    Failed,
}

impl ControllerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Failed)
    }
}

/// Terminal result of a run. Produced exactly once.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The drift-compensated window spread fell within tolerance.
    Converged { retries_used: u32, final_range: f64 },
    /// Every allowed attempt ran without converging.
    ExhaustedRetries { retries_used: u32 },
    /// The pre-home script failed; no further attempts were made.
    ActionFailed { cause: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    /// Attempts consumed, or `None` when the run stopped on a script failure.
    pub fn retries_used(&self) -> Option<u32> {
        match self {
            Self::Converged { retries_used, .. } | Self::ExhaustedRetries { retries_used } => {
                Some(*retries_used)
            }
            Self::ActionFailed { .. } => None,
        }
    }

    /// Turn the non-converged outcomes into errors for callers that treat
    /// them as command failures.
    pub fn into_result(self) -> Result<(u32, f64), HomeError> {
        match self {
            Self::Converged {
                retries_used,
                final_range,
            } => Ok((retries_used, final_range)),
            Self::ExhaustedRetries { retries_used } => Err(HomeError::ExhaustedRetries {
                retries: retries_used,
            }),
            Self::ActionFailed { cause } => Err(HomeError::ActionFailed { cause }),
        }
    }
}

/// Result of a single `step()`.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// One attempt ran; the window has not converged yet.
    Running,
    Finished(Outcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_result_maps_failures() {
        assert_eq!(
            Outcome::Converged {
                retries_used: 5,
                final_range: 0.001
            }
            .into_result(),
            Ok((5, 0.001))
        );
        assert_eq!(
            Outcome::ExhaustedRetries { retries_used: 20 }.into_result(),
            Err(HomeError::ExhaustedRetries { retries: 20 })
        );
        let err = Outcome::ActionFailed {
            cause: "pre-action script failed: boom".into(),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.to_string(), "pre-action script failed: boom");
    }

    #[test]
    fn retries_used_is_none_for_action_failure() {
        assert_eq!(
            Outcome::ActionFailed { cause: "x".into() }.retries_used(),
            None
        );
        assert_eq!(
            Outcome::ExhaustedRetries { retries_used: 0 }.retries_used(),
            Some(0)
        );
        assert!(!ControllerState::Iterating { retry: 3 }.is_terminal());
        assert!(ControllerState::Failed.is_terminal());
    }
}
