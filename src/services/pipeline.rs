//! Production implementation of the improvement steps, backed by the model
//! clients and the artifact directories.

use async_trait::async_trait;

use super::evaluator::Evaluator;
use super::permutation_service::{PermutationService, PermutationSummary};
use super::prompt_generator::PromptGenerator;
use super::response_generator::ResponseGenerator;
use super::step_context::StepContext;
use super::system_prompt_generator::SystemPromptGenerator;
use crate::domain::errors::DomainResult;
use crate::domain::models::{BatchOutcome, CorrectionRecord};
use crate::domain::ports::{ImprovementSteps, PrerequisiteStatus};

/// Every generation and evaluation step over one shared context.
pub struct Pipeline {
    ctx: StepContext,
}

impl Pipeline {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &StepContext {
        &self.ctx
    }

    pub async fn permute(&self) -> DomainResult<PermutationSummary> {
        PermutationService::new(self.ctx.store, self.ctx.paths().clone())
            .regenerate()
            .await
    }

    pub async fn generate_prompts(&self) -> DomainResult<BatchOutcome> {
        PromptGenerator::new(self.ctx.clone()).generate_all().await
    }
}

#[async_trait]
impl ImprovementSteps for Pipeline {
    async fn prerequisites(&self) -> DomainResult<PrerequisiteStatus> {
        let paths = self.ctx.paths();
        let store = &self.ctx.store;
        Ok(PrerequisiteStatus {
            aggregate_rules: store.exists(&paths.all_rules_file()).await,
            prompt_count: store.list_or_empty(&paths.prompts_dir()).await?.len(),
            system_prompt: store.exists(&paths.system_prompt_file()).await,
            response_count: store.list_or_empty(&paths.responses_dir()).await?.len(),
        })
    }

    async fn generate_system_prompt(&self, corrections: Option<&str>, iteration: u32) -> DomainResult<()> {
        SystemPromptGenerator::new(self.ctx.clone())
            .generate(corrections, iteration)
            .await
            .map(|_| ())
    }

    async fn generate_responses(&self) -> DomainResult<BatchOutcome> {
        ResponseGenerator::new(self.ctx.clone()).generate_all().await
    }

    async fn evaluate(&self) -> DomainResult<BatchOutcome> {
        Evaluator::new(self.ctx.clone()).evaluate_all().await
    }

    async fn collect_corrections(&self) -> DomainResult<Vec<Option<CorrectionRecord>>> {
        Evaluator::new(self.ctx.clone()).collect().await
    }
}
