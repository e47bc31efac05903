//! Implementation of the `permuter responses` command.

use anyhow::{Context, Result};
use clap::Args;

use super::{BatchStepOutput, Session};
use crate::cli::output::output;
use crate::domain::models::Config;
use crate::domain::ports::ImprovementSteps;

#[derive(Args, Debug, Default)]
pub struct ResponsesArgs {}

pub async fn execute(_args: ResponsesArgs, config: &Config, json_mode: bool) -> Result<()> {
    let session = Session::open(config, json_mode).await?;
    let outcome = session
        .pipeline()
        .generate_responses()
        .await
        .context("Response generation failed")?;
    session.close().await;

    output(&BatchStepOutput::new("response generation", outcome), json_mode);
    Ok(())
}
