//! Iterative improvement loop.
//!
//! Evaluates target responses, stops on zero failures or after
//! `max_iterations` passes, and otherwise regenerates the target system
//! prompt from the accumulated corrections before evaluating again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    aggregate_corrections, ControllerState, ConvergenceState, EvaluationTally,
};
use crate::domain::ports::ImprovementSteps;

/// Result of one controller run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementReport {
    /// `Converged` or `Exhausted`.
    pub outcome: ControllerState,
    pub evaluation_passes: u32,
    pub regeneration_passes: u32,
    /// One entry per evaluation pass.
    pub history: Vec<ConvergenceState>,
    /// Counts from the last pass, including unparsed artifacts.
    pub final_tally: EvaluationTally,
}

impl ImprovementReport {
    pub fn success_rate(&self) -> f64 {
        self.final_tally.success_rate()
    }

    pub fn converged(&self) -> bool {
        self.outcome == ControllerState::Converged
    }
}

pub struct ImprovementController {
    steps: Arc<dyn ImprovementSteps>,
    max_iterations: u32,
}

impl ImprovementController {
    /// `max_iterations` below 1 is treated as 1.
    pub fn new(steps: Arc<dyn ImprovementSteps>, max_iterations: u32) -> Self {
        Self {
            steps,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Run the loop to a terminal state.
    ///
    /// Any failed step is fatal; partial artifacts stay on disk.
    #[instrument(skip_all, fields(max_iterations = self.max_iterations))]
    pub async fn run(&self) -> DomainResult<ImprovementReport> {
        self.prepare().await?;

        let mut iteration = 0;
        let mut regeneration_passes = 0;
        let mut history = Vec::new();

        loop {
            info!(iteration, state = %ControllerState::Evaluating, "evaluation pass");
            self.steps.evaluate().await?;

            let records = self.steps.collect_corrections().await?;
            let tally = EvaluationTally::from_parsed(records.iter().map(Option::as_ref));
            if tally.unparsed > 0 {
                warn!(iteration, unparsed = tally.unparsed, "ignoring evaluations without a verdict");
            }
            if tally.total == 0 {
                warn!(iteration, "no parsable evaluations; treating as zero failures");
            }

            let snapshot = ConvergenceState {
                iteration,
                failure_count: tally.failures,
                total_count: tally.total,
            };
            history.push(snapshot);
            let next = snapshot.next_state(self.max_iterations);
            info!(
                iteration,
                failures = tally.failures,
                total = tally.total,
                success_rate = snapshot.success_rate(),
                next = %next,
                "evaluation pass complete"
            );

            if next.is_terminal() {
                return Ok(ImprovementReport {
                    outcome: next,
                    evaluation_passes: iteration + 1,
                    regeneration_passes,
                    history,
                    final_tally: tally,
                });
            }

            let corrections = aggregate_corrections(records.iter().flatten());
            iteration += 1;
            info!(
                iteration,
                state = %ControllerState::Regenerating,
                correction_chars = corrections.as_ref().map_or(0, String::len),
                "regenerating target system prompt"
            );
            self.steps
                .generate_system_prompt(corrections.as_deref(), iteration)
                .await?;
            self.steps.generate_responses().await?;
            regeneration_passes += 1;
        }
    }

    /// Verify upstream artifacts and fill in a missing system prompt or
    /// missing responses.
    async fn prepare(&self) -> DomainResult<()> {
        let status = self.steps.prerequisites().await?;
        if !status.aggregate_rules {
            return Err(DomainError::MissingPrerequisite {
                artifact: "aggregate rules document".to_string(),
                step: "permute".to_string(),
            });
        }
        if status.prompt_count == 0 {
            return Err(DomainError::MissingPrerequisite {
                artifact: "generated prompts".to_string(),
                step: "prompts".to_string(),
            });
        }

        let fresh_prompt = !status.system_prompt;
        if fresh_prompt {
            info!(state = %ControllerState::Init, "no target system prompt; generating initial prompt");
            self.steps.generate_system_prompt(None, 0).await?;
        }
        if fresh_prompt || status.response_count == 0 {
            info!(state = %ControllerState::Init, "generating responses");
            self.steps.generate_responses().await?;
        }
        Ok(())
    }
}
