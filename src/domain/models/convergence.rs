//! State tracked by the iterative improvement loop.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Controller state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Init,
    Evaluating,
    Regenerating,
    Converged,
    Exhausted,
}

impl ControllerState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Evaluating => "evaluating",
            Self::Regenerating => "regenerating",
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

/// Snapshot of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceState {
    /// Zero-based; incremented each time the loop regenerates.
    pub iteration: u32,
    pub failure_count: usize,
    pub total_count: usize,
}

impl ConvergenceState {
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        (self.total_count - self.failure_count) as f64 / self.total_count as f64
    }

    /// Decide what follows this evaluation pass.
    ///
    /// Zero failures converges regardless of iteration; otherwise the loop
    /// is exhausted once `max_iterations` passes have run.
    pub const fn next_state(&self, max_iterations: u32) -> ControllerState {
        if self.failure_count == 0 {
            ControllerState::Converged
        } else if self.iteration + 1 >= max_iterations {
            ControllerState::Exhausted
        } else {
            ControllerState::Regenerating
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_failures_converges_on_any_iteration() {
        let state = ConvergenceState {
            iteration: 2,
            failure_count: 0,
            total_count: 5,
        };
        assert_eq!(state.next_state(3), ControllerState::Converged);
    }

    #[test]
    fn test_last_pass_exhausts() {
        let mut state = ConvergenceState {
            iteration: 0,
            failure_count: 1,
            total_count: 5,
        };
        assert_eq!(state.next_state(3), ControllerState::Regenerating);
        state.iteration = 2;
        assert_eq!(state.next_state(3), ControllerState::Exhausted);
        assert!(ControllerState::Exhausted.is_terminal());
    }

    #[test]
    fn test_success_rate() {
        let state = ConvergenceState {
            iteration: 0,
            failure_count: 1,
            total_count: 4,
        };
        assert!((state.success_rate() - 0.75).abs() < f64::EPSILON);
        assert!(ConvergenceState::default().success_rate().abs() < f64::EPSILON);
    }
}
