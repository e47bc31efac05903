//! Outcome of a batched execution run.

use serde::{Deserialize, Serialize};

/// A unit that failed or faulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Position of the unit in the submitted list.
    pub index: usize,
    pub label: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub total: usize,
    /// Successes in every batch that ran, including the aborting one.
    pub completed: usize,
    pub batches_run: usize,
    pub aborted: bool,
    pub failures: Vec<UnitFailure>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        !self.aborted && self.completed == self.total
    }
}
