//! CLI command implementations.

pub mod evaluate;
pub mod improve;
pub mod init;
pub mod permute;
pub mod prompts;
pub mod responses;
pub mod run;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::adapters::clients::ClientRegistry;
use crate::adapters::fs::TextStore;
use crate::cli::output::{CommandOutput, ProgressReporter};
use crate::domain::models::{BatchOutcome, Config};
use crate::services::{Instructions, Pipeline, StepContext};

/// Pipeline plus progress rendering for one command invocation.
pub(crate) struct Session {
    pipeline: Arc<Pipeline>,
    progress: Option<ProgressReporter>,
}

impl Session {
    /// Build model clients and load instructions. Progress bars are shown
    /// only for human output on a terminal.
    pub(crate) async fn open(config: &Config, json_mode: bool) -> Result<Self> {
        let registry = ClientRegistry::from_config(&config.clients, &config.retry)
            .context("Failed to build model clients")?;
        let instructions = Instructions::load(&config.instructions, &TextStore::new())
            .await
            .context("Failed to load instruction overrides")?;

        let mut ctx = StepContext::new(Arc::new(registry), Arc::new(config.clone()), instructions);
        let progress = if !json_mode && console::Term::stderr().is_term() {
            let (tx, reporter) = ProgressReporter::spawn();
            ctx = ctx.with_events(tx);
            Some(reporter)
        } else {
            None
        };

        Ok(Self {
            pipeline: Arc::new(Pipeline::new(ctx)),
            progress,
        })
    }

    /// Read-only session without model clients.
    pub(crate) fn offline(config: &Config) -> Self {
        let ctx = StepContext::new(
            Arc::new(ClientRegistry::new()),
            Arc::new(config.clone()),
            Instructions::default(),
        );
        Self {
            pipeline: Arc::new(Pipeline::new(ctx)),
            progress: None,
        }
    }

    pub(crate) fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Drop the pipeline and let the progress bars drain.
    pub(crate) async fn close(self) {
        let Self { pipeline, progress } = self;
        drop(pipeline);
        if let Some(progress) = progress {
            progress.finish().await;
        }
    }
}

/// Result of a single batched step.
#[derive(Debug, Serialize)]
pub struct BatchStepOutput {
    pub success: bool,
    pub step: String,
    pub outcome: BatchOutcome,
}

impl BatchStepOutput {
    pub fn new(step: impl Into<String>, outcome: BatchOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            step: step.into(),
            outcome,
        }
    }
}

impl CommandOutput for BatchStepOutput {
    fn to_human(&self) -> String {
        format!(
            "{}: {}/{} units completed in {} batch(es)",
            self.step, self.outcome.completed, self.outcome.total, self.outcome.batches_run
        )
    }
}
