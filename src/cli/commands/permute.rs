//! Implementation of the `permuter permute` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::Session;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::Config;
use crate::services::PermutationSummary;

#[derive(Args, Debug, Default)]
pub struct PermuteArgs {}

#[derive(Debug, Serialize)]
pub struct PermuteOutput {
    pub success: bool,
    #[serde(flatten)]
    pub summary: PermutationSummary,
}

impl CommandOutput for PermuteOutput {
    fn to_human(&self) -> String {
        let level_labels: Vec<(String, String)> = self
            .summary
            .level_sizes
            .iter()
            .map(|(level, size)| (format!("level {level} flavors"), size.to_string()))
            .collect();
        let mut rows = vec![("rule variants", self.summary.rule_count.to_string())];
        rows.extend(level_labels.iter().map(|(label, size)| (label.as_str(), size.clone())));
        format!(
            "Generated {} permutation(s) in {}\nAggregate rules: {}\n{}",
            self.summary.permutation_count,
            self.summary.permutations_dir.display(),
            self.summary.aggregate_file.display(),
            TableFormatter::new().format_counts("Source", &rows)
        )
    }
}

pub async fn execute(_args: PermuteArgs, config: &Config, json_mode: bool) -> Result<()> {
    let session = Session::offline(config);
    let summary = session
        .pipeline()
        .permute()
        .await
        .context("Permutation expansion failed")?;
    session.close().await;

    output(
        &PermuteOutput {
            success: true,
            summary,
        },
        json_mode,
    );
    Ok(())
}
