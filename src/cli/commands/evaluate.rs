//! Implementation of the `permuter evaluate` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::Session;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{BatchOutcome, Config, EvaluationTally};
use crate::domain::ports::ImprovementSteps;

#[derive(Args, Debug, Default)]
pub struct EvaluateArgs {}

#[derive(Debug, Serialize)]
pub struct EvaluateOutput {
    pub success: bool,
    pub outcome: BatchOutcome,
    pub tally: EvaluationTally,
    pub success_rate: f64,
}

impl CommandOutput for EvaluateOutput {
    fn to_human(&self) -> String {
        format!(
            "Evaluated {} response(s)\n{}",
            self.outcome.completed,
            TableFormatter::new().format_tally(&self.tally)
        )
    }
}

pub async fn execute(_args: EvaluateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let session = Session::open(config, json_mode).await?;
    let pipeline = session.pipeline();
    let outcome = pipeline.evaluate().await.context("Evaluation failed")?;
    let records = pipeline
        .collect_corrections()
        .await
        .context("Failed to read correction artifacts")?;
    session.close().await;

    let tally = EvaluationTally::from_parsed(records.iter().map(Option::as_ref));
    output(
        &EvaluateOutput {
            success: true,
            outcome,
            tally,
            success_rate: tally.success_rate(),
        },
        json_mode,
    );
    Ok(())
}
