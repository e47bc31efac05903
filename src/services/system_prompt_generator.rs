//! Writes the target system prompt from the aggregate rules, the previous
//! prompt and accumulated corrections. Every version is archived.

use tracing::info;

use super::step_context::{timestamp, StepContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Artifact, ArtifactHeader, ArtifactKind, ClientName};

pub struct SystemPromptGenerator {
    ctx: StepContext,
}

impl SystemPromptGenerator {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }

    /// Generate and persist a new target system prompt.
    ///
    /// `corrections` is `None` for the initial prompt; the previous prompt,
    /// when one exists, is always passed as context.
    pub async fn generate(&self, corrections: Option<&str>, iteration: u32) -> DomainResult<String> {
        let paths = self.ctx.paths();
        let rules = self.ctx.store.read(&paths.all_rules_file()).await?.ok_or_else(|| {
            DomainError::MissingPrerequisite {
                artifact: "aggregate rules document".to_string(),
                step: "permute".to_string(),
            }
        })?;

        let target = paths.system_prompt_file();
        let previous = self
            .ctx
            .store
            .read_raw(&target)
            .await?
            .and_then(|raw| Artifact::decode(ArtifactKind::SystemPrompt, &raw))
            .map(|artifact| artifact.payload)
            .filter(|payload| !payload.is_empty());

        let input = system_prompt_input(&rules, previous.as_deref(), corrections);
        let temperature = self.ctx.generation().system_prompt_temperature;
        let text = self
            .ctx
            .registry
            .call(
                &self.ctx.instructions.system_prompt,
                &input,
                ClientName::Service,
                Some(temperature),
            )
            .await?;

        let header = ArtifactHeader::new()
            .with("Iteration", iteration)
            .with("Corrections applied", corrections.is_some())
            .with("Temperature", temperature)
            .with("Generated", timestamp());
        let encoded = Artifact::new(ArtifactKind::SystemPrompt, header, text.as_str()).encode();

        self.ctx.store.write(&target, &encoded).await?;
        let archived = paths
            .history_dir()
            .join(format!("system_prompt_{iteration}.md"));
        self.ctx.store.write(&archived, &encoded).await?;

        info!(
            iteration,
            with_corrections = corrections.is_some(),
            had_previous = previous.is_some(),
            "target system prompt written"
        );
        Ok(text)
    }
}

fn system_prompt_input(rules: &str, previous: Option<&str>, corrections: Option<&str>) -> String {
    let mut input = format!("## Rules\n\n{rules}\n");
    if let Some(previous) = previous {
        input.push_str(&format!("\n## Previous system prompt\n\n{previous}\n"));
    }
    if let Some(corrections) = corrections {
        input.push_str(&format!("\n## Corrections\n\n{corrections}\n"));
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_input_has_rules_only() {
        let input = system_prompt_input("Be kind.", None, None);
        assert_eq!(input, "## Rules\n\nBe kind.\n");
    }

    #[test]
    fn test_regeneration_input_carries_previous_and_corrections() {
        let input = system_prompt_input("Be kind.", Some("You are kind."), Some("Mention sources."));
        assert!(input.contains("## Previous system prompt\n\nYou are kind."));
        assert!(input.find("Previous").unwrap() < input.find("## Corrections").unwrap());
        assert!(input.ends_with("Mention sources.\n"));
    }
}
