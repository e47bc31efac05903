//! Runs every generated prompt through the target model under the current
//! target system prompt.

use std::path::Path;

use tracing::{debug, info};

use super::step_context::{ensure_completed, file_name, read_artifact, timestamp, StepContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactHeader, ArtifactKind, BatchOutcome, ClientName};

const STEP: &str = "response generation";

pub struct ResponseGenerator {
    ctx: StepContext,
}

impl ResponseGenerator {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }

    /// One response per prompt, written as `responses/<prompt-stem>.md`.
    ///
    /// Clears the responses directory first.
    pub async fn generate_all(&self) -> DomainResult<BatchOutcome> {
        let system_prompt = self.load_system_prompt().await?;

        let prompts = self.ctx.store.list_or_empty(&self.ctx.paths().prompts_dir()).await?;
        if prompts.is_empty() {
            return Err(DomainError::MissingPrerequisite {
                artifact: "generated prompts".to_string(),
                step: "prompts".to_string(),
            });
        }

        let out_dir = self.ctx.paths().responses_dir();
        self.ctx.store.reset_dir(&out_dir).await?;
        info!(prompts = prompts.len(), "generating responses");
        let out_dir = out_dir.as_path();
        let system_prompt = system_prompt.as_str();

        let outcome = self
            .ctx
            .executor(STEP, ClientName::Target)
            .run(prompts, |prompt| async move {
                self.generate_one(&prompt, system_prompt, out_dir)
                    .await
                    .map(|()| true)
            })
            .await;
        ensure_completed(STEP, outcome)
    }

    async fn load_system_prompt(&self) -> DomainResult<String> {
        let path = self.ctx.paths().system_prompt_file();
        let raw = self.ctx.store.read_raw(&path).await?.ok_or_else(|| {
            DomainError::MissingPrerequisite {
                artifact: "target system prompt".to_string(),
                step: "improve".to_string(),
            }
        })?;
        Artifact::decode(ArtifactKind::SystemPrompt, &raw)
            .map(|artifact| artifact.payload)
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| DomainError::MalformedArtifact {
                path,
                reason: format!("missing `{}` marker or empty payload", ArtifactKind::SystemPrompt.marker()),
            })
    }

    async fn generate_one(&self, prompt_path: &Path, system_prompt: &str, out_dir: &Path) -> DomainResult<()> {
        let prompt = read_artifact(&self.ctx, prompt_path, ArtifactKind::Prompt).await?;

        let temperature = self.ctx.generation().response_temperature;
        let text = self
            .ctx
            .registry
            .call(system_prompt, &prompt.payload, ClientName::Target, Some(temperature))
            .await?;

        let header = ArtifactHeader::new()
            .with("Source prompt", file_name(prompt_path))
            .with("Temperature", temperature)
            .with("Generated", timestamp());
        let path = out_dir.join(file_name(prompt_path));
        self.ctx
            .store
            .write(&path, &Artifact::new(ArtifactKind::Response, header, text).encode())
            .await?;
        debug!(response = %path.display(), "response written");
        Ok(())
    }
}
