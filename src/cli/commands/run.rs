//! Implementation of the `permuter run` command: permute, generate prompts,
//! then improve until convergence.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::improve::{improve, ImproveOutput};
use super::Session;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{BatchOutcome, Config};
use crate::domain::ports::ImprovementSteps;
use crate::services::PermutationSummary;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Prompts per permutation (overrides generation.prompts_per_permutation)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub samples: Option<u64>,

    /// Evaluation passes before giving up (overrides generation.max_iterations)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub success: bool,
    pub permutations: PermutationSummary,
    pub prompts: BatchOutcome,
    pub improvement: ImproveOutput,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        format!(
            "Permutations: {}\nPrompts: {}/{}\n{}",
            self.permutations.permutation_count,
            self.prompts.completed,
            self.prompts.total,
            self.improvement.to_human()
        )
    }
}

pub async fn execute(args: RunArgs, config: &Config, json_mode: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(samples) = args.samples.and_then(|s| usize::try_from(s).ok()) {
        config.generation.prompts_per_permutation = samples;
    }
    let max_iterations = args
        .max_iterations
        .unwrap_or(config.generation.max_iterations);

    let session = Session::open(&config, json_mode).await?;
    let permutations = session
        .pipeline()
        .permute()
        .await
        .context("Permutation expansion failed")?;
    let prompts = session
        .pipeline()
        .generate_prompts()
        .await
        .context("Prompt generation failed")?;
    // Responses from an earlier run answer the old prompts.
    if session.pipeline().prerequisites().await?.system_prompt {
        session
            .pipeline()
            .generate_responses()
            .await
            .context("Response generation failed")?;
    }
    let report = improve(&session, max_iterations).await?;
    session.close().await;

    let improvement = ImproveOutput::new(report);
    output(
        &RunOutput {
            success: improvement.success,
            permutations,
            prompts,
            improvement,
        },
        json_mode,
    );
    Ok(())
}
