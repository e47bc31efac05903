//! Implementation of the `permuter status` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::Session;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::{Config, EvaluationTally};
use crate::domain::ports::{ImprovementSteps, PrerequisiteStatus};

#[derive(Args, Debug, Default)]
pub struct StatusArgs {}

#[derive(Debug, Serialize)]
pub struct StatusOutput {
    pub permutation_count: usize,
    #[serde(flatten)]
    pub artifacts: PrerequisiteStatus,
    pub correction_count: usize,
    pub system_prompt_versions: usize,
    /// Absent until an evaluation pass has written corrections.
    pub latest_evaluation: Option<EvaluationTally>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let yes_no = |b: bool| if b { "yes" } else { "no" }.to_string();
        let formatter = TableFormatter::new();
        let counts = formatter.format_counts(
            "Artifacts",
            &[
                ("permutations", self.permutation_count.to_string()),
                ("aggregate rules", yes_no(self.artifacts.aggregate_rules)),
                ("prompts", self.artifacts.prompt_count.to_string()),
                ("target system prompt", yes_no(self.artifacts.system_prompt)),
                ("system prompt versions", self.system_prompt_versions.to_string()),
                ("responses", self.artifacts.response_count.to_string()),
                ("corrections", self.correction_count.to_string()),
            ],
        );
        match &self.latest_evaluation {
            Some(tally) => format!("{counts}\n{}", formatter.format_tally(tally)),
            None => format!("{counts}\nNo evaluation results yet"),
        }
    }
}

pub async fn execute(_args: StatusArgs, config: &Config, json_mode: bool) -> Result<()> {
    let session = Session::offline(config);
    let pipeline = session.pipeline();
    let ctx = pipeline.context();
    let paths = ctx.paths();

    let artifacts = pipeline
        .prerequisites()
        .await
        .context("Failed to inspect artifacts")?;
    let permutation_count = ctx.store.list_or_empty(&paths.permutations_dir()).await?.len();
    let system_prompt_versions = ctx.store.list_or_empty(&paths.history_dir()).await?.len();
    let records = pipeline
        .collect_corrections()
        .await
        .context("Failed to read correction artifacts")?;
    let correction_count = records.len();
    let latest_evaluation = (!records.is_empty())
        .then(|| EvaluationTally::from_parsed(records.iter().map(Option::as_ref)));
    session.close().await;

    output(
        &StatusOutput {
            permutation_count,
            artifacts,
            correction_count,
            system_prompt_versions,
            latest_evaluation,
        },
        json_mode,
    );
    Ok(())
}
