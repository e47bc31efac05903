//! Judges each target response against the rules with the service model and
//! records the verdict as a correction artifact.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::step_context::{ensure_completed, file_name, read_artifact, StepContext};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArtifactKind, BatchOutcome, ClientName, CorrectionRecord, COMMENT_MARKER};

const STEP: &str = "evaluation";

pub struct Evaluator {
    ctx: StepContext,
}

impl Evaluator {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }

    /// Evaluate every response into `corrections/<response-stem>.md`.
    ///
    /// Clears the corrections directory first.
    pub async fn evaluate_all(&self) -> DomainResult<BatchOutcome> {
        let rules_path = self.ctx.paths().all_rules_file();
        let rules = self.ctx.store.read(&rules_path).await?.ok_or_else(|| {
            DomainError::MissingPrerequisite {
                artifact: "aggregate rules document".to_string(),
                step: "permute".to_string(),
            }
        })?;

        let responses = self.ctx.store.list_or_empty(&self.ctx.paths().responses_dir()).await?;
        if responses.is_empty() {
            return Err(DomainError::MissingPrerequisite {
                artifact: "generated responses".to_string(),
                step: "responses".to_string(),
            });
        }

        let out_dir = self.ctx.paths().corrections_dir();
        self.ctx.store.reset_dir(&out_dir).await?;
        info!(responses = responses.len(), "evaluating responses");
        let out_dir = out_dir.as_path();
        let rules = rules.as_str();

        let outcome = self
            .ctx
            .executor(STEP, ClientName::Service)
            .run(responses, |response| async move {
                self.evaluate_one(&response, rules, out_dir).await.map(|()| true)
            })
            .await;
        ensure_completed(STEP, outcome)
    }

    async fn evaluate_one(&self, response_path: &Path, rules: &str, out_dir: &Path) -> DomainResult<()> {
        let response = read_artifact(&self.ctx, response_path, ArtifactKind::Response).await?;
        let prompt_path = linked_path(
            response_path,
            response.header.get("Source prompt"),
            self.ctx.paths().prompts_dir(),
        )?;
        let prompt = read_artifact(&self.ctx, &prompt_path, ArtifactKind::Prompt).await?;
        let permutation_path = linked_path(
            &prompt_path,
            prompt.header.get("Source permutation"),
            self.ctx.paths().permutations_dir(),
        )?;
        let permutation = self
            .ctx
            .store
            .read(&permutation_path)
            .await?
            .ok_or_else(|| DomainError::SourceMissing(permutation_path.clone()))?;

        let input = evaluation_input(rules, &permutation, &prompt.payload, &response.payload);
        let verdict = self
            .ctx
            .registry
            .call(
                &self.ctx.instructions.evaluation,
                &input,
                ClientName::Service,
                Some(self.ctx.generation().evaluation_temperature),
            )
            .await?;

        if CorrectionRecord::parse(&verdict).is_none() {
            warn!(response = %response_path.display(), "evaluation has no verdict; it will be ignored");
        }

        let path = out_dir.join(file_name(response_path));
        let body = format!(
            "{COMMENT_MARKER} Source response: {}\n{}\n",
            file_name(response_path),
            verdict.trim()
        );
        self.ctx.store.write(&path, &body).await?;
        debug!(correction = %path.display(), "correction written");
        Ok(())
    }

    /// Parsed correction artifacts in file order. `None` marks an artifact
    /// without a recognizable verdict.
    pub async fn collect(&self) -> DomainResult<Vec<Option<CorrectionRecord>>> {
        let files = self.ctx.store.list_or_empty(&self.ctx.paths().corrections_dir()).await?;
        let mut records = Vec::with_capacity(files.len());
        for path in files {
            let text = self.ctx.store.read(&path).await?.unwrap_or_default();
            records.push(CorrectionRecord::parse(&text));
        }
        Ok(records)
    }
}

/// Resolve a provenance header into a path inside `dir`.
fn linked_path(from: &Path, header: Option<&str>, dir: PathBuf) -> DomainResult<PathBuf> {
    header
        .filter(|name| !name.is_empty())
        .map(|name| dir.join(name))
        .ok_or_else(|| DomainError::MalformedArtifact {
            path: from.to_path_buf(),
            reason: "missing provenance header".to_string(),
        })
}

fn evaluation_input(rules: &str, permutation: &str, prompt: &str, response: &str) -> String {
    format!(
        "## Complete rules\n\n{rules}\n\n\
         ## Rules under test\n\n{permutation}\n\n\
         ## User prompt\n\n{prompt}\n\n\
         ## Assistant response\n\n{response}\n"
    )
}
