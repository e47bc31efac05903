//! Implementation of the `permuter prompts` command.

use anyhow::{Context, Result};
use clap::Args;

use super::{BatchStepOutput, Session};
use crate::cli::output::output;
use crate::domain::models::Config;

#[derive(Args, Debug, Default)]
pub struct PromptsArgs {
    /// Prompts per permutation (overrides generation.prompts_per_permutation)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub samples: Option<u64>,
}

impl PromptsArgs {
    /// Apply command-line overrides to a copy of the configuration.
    pub fn apply(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(samples) = self.samples.and_then(|s| usize::try_from(s).ok()) {
            config.generation.prompts_per_permutation = samples;
        }
        config
    }
}

pub async fn execute(args: PromptsArgs, config: &Config, json_mode: bool) -> Result<()> {
    let config = args.apply(config);
    let session = Session::open(&config, json_mode).await?;
    let outcome = session
        .pipeline()
        .generate_prompts()
        .await
        .context("Prompt generation failed")?;
    session.close().await;

    output(&BatchStepOutput::new("prompt generation", outcome), json_mode);
    Ok(())
}
