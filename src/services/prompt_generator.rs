//! Generates test prompts from permutation documents using the service model.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::batch_executor::WorkUnit;
use super::step_context::{ensure_completed, file_name, file_stem, timestamp, StepContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactHeader, ArtifactKind, BatchOutcome, ClientName};

const STEP: &str = "prompt generation";

/// One permutation sampled once.
#[derive(Debug, Clone)]
pub struct PromptJob {
    pub permutation: PathBuf,
    /// 1-based sample index.
    pub sample: usize,
}

impl PromptJob {
    pub fn output_name(&self) -> String {
        format!("{}_{}.md", file_stem(&self.permutation), self.sample)
    }
}

impl WorkUnit for PromptJob {
    fn label(&self) -> String {
        self.output_name()
    }
}

pub struct PromptGenerator {
    ctx: StepContext,
}

impl PromptGenerator {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }

    /// Produce `prompts_per_permutation` prompts for every permutation.
    ///
    /// Clears the prompts directory first.
    pub async fn generate_all(&self) -> DomainResult<BatchOutcome> {
        let permutations = self.ctx.store.list_or_empty(&self.ctx.paths().permutations_dir()).await?;
        if permutations.is_empty() {
            return Err(DomainError::MissingPrerequisite {
                artifact: "permutation documents".to_string(),
                step: "permute".to_string(),
            });
        }

        let samples = self.ctx.generation().prompts_per_permutation;
        let jobs: Vec<PromptJob> = permutations
            .iter()
            .flat_map(|permutation| {
                (1..=samples).map(move |sample| PromptJob {
                    permutation: permutation.clone(),
                    sample,
                })
            })
            .collect();

        let out_dir = self.ctx.paths().prompts_dir();
        self.ctx.store.reset_dir(&out_dir).await?;
        info!(permutations = permutations.len(), samples, jobs = jobs.len(), "generating prompts");
        let out_dir = out_dir.as_path();

        let outcome = self
            .ctx
            .executor(STEP, ClientName::Service)
            .run(jobs, |job| async move {
                self.generate_one(&job, out_dir).await.map(|()| true)
            })
            .await;
        ensure_completed(STEP, outcome)
    }

    async fn generate_one(&self, job: &PromptJob, out_dir: &Path) -> DomainResult<()> {
        let permutation = self
            .ctx
            .store
            .read(&job.permutation)
            .await?
            .ok_or_else(|| DomainError::SourceMissing(job.permutation.clone()))?;

        let temperature = self.ctx.generation().prompt_temperature;
        let text = self
            .ctx
            .registry
            .call(
                &self.ctx.instructions.prompt_generation,
                &permutation,
                ClientName::Service,
                Some(temperature),
            )
            .await?;

        let header = ArtifactHeader::new()
            .with("Source permutation", file_name(&job.permutation))
            .with("Sample", job.sample)
            .with("Temperature", temperature)
            .with("Generated", timestamp());
        let artifact = Artifact::new(ArtifactKind::Prompt, header, text);
        let path = out_dir.join(job.output_name());
        self.ctx.store.write(&path, &artifact.encode()).await?;
        debug!(prompt = %path.display(), "prompt written");
        Ok(())
    }
}
