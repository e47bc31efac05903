//! Implementation of the `permuter improve` command.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::Session;
use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::models::Config;
use crate::domain::ports::ImprovementSteps;
use crate::services::{ImprovementController, ImprovementReport};

#[derive(Args, Debug, Default)]
pub struct ImproveArgs {
    /// Evaluation passes before giving up (overrides generation.max_iterations)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_iterations: Option<u32>,
}

impl ImproveArgs {
    pub fn resolve(&self, config: &Config) -> u32 {
        self.max_iterations
            .unwrap_or(config.generation.max_iterations)
    }
}

#[derive(Debug, Serialize)]
pub struct ImproveOutput {
    pub success: bool,
    #[serde(flatten)]
    pub report: ImprovementReport,
    pub success_rate: f64,
}

impl ImproveOutput {
    pub fn new(report: ImprovementReport) -> Self {
        Self {
            success: report.converged(),
            success_rate: report.success_rate(),
            report,
        }
    }
}

impl CommandOutput for ImproveOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let headline = if self.report.converged() {
            format!(
                "Converged after {} evaluation pass(es)",
                self.report.evaluation_passes
            )
        } else {
            format!(
                "Stopped after {} evaluation pass(es) without converging",
                self.report.evaluation_passes
            )
        };
        format!(
            "{headline}\n{}\n{}",
            formatter.format_history(&self.report.history),
            formatter.format_tally(&self.report.final_tally)
        )
    }
}

/// Run the improvement loop on an open session.
pub(crate) async fn improve(session: &Session, max_iterations: u32) -> Result<ImprovementReport> {
    let steps: Arc<dyn ImprovementSteps> = session.pipeline().clone();
    ImprovementController::new(steps, max_iterations)
        .run()
        .await
        .context("Improvement loop failed")
}

pub async fn execute(args: ImproveArgs, config: &Config, json_mode: bool) -> Result<()> {
    let max_iterations = args.resolve(config);
    let session = Session::open(config, json_mode).await?;
    let report = improve(&session, max_iterations).await?;
    session.close().await;

    output(&ImproveOutput::new(report), json_mode);
    Ok(())
}
