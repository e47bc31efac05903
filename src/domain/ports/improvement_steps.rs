//! Steps the improvement controller delegates to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::{BatchOutcome, CorrectionRecord};

/// Which artifacts already exist on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerequisiteStatus {
    pub aggregate_rules: bool,
    pub prompt_count: usize,
    pub system_prompt: bool,
    pub response_count: usize,
}

#[async_trait]
pub trait ImprovementSteps: Send + Sync {
    async fn prerequisites(&self) -> DomainResult<PrerequisiteStatus>;

    /// Write a new target system prompt. `corrections` is `None` for the
    /// initial prompt.
    async fn generate_system_prompt(&self, corrections: Option<&str>, iteration: u32)
        -> DomainResult<()>;

    async fn generate_responses(&self) -> DomainResult<BatchOutcome>;

    async fn evaluate(&self) -> DomainResult<BatchOutcome>;

    /// Parsed correction artifacts in file-sorted order; `None` marks an
    /// artifact without a recognizable verdict.
    async fn collect_corrections(&self) -> DomainResult<Vec<Option<CorrectionRecord>>>;
}
