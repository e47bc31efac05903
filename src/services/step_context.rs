//! Shared dependencies of the generation and evaluation steps.

use std::path::Path;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc;

use super::batch_executor::{BatchEvent, BatchExecutor};
use super::instructions::Instructions;
use crate::adapters::clients::ClientRegistry;
use crate::adapters::fs::TextStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Artifact, ArtifactKind, BatchOutcome, ClientName, Config, GenerationConfig, PathsConfig,
};

/// Everything a step needs: clients, storage, configuration and an
/// optional progress channel.
#[derive(Clone)]
pub struct StepContext {
    pub registry: Arc<ClientRegistry>,
    pub store: TextStore,
    pub config: Arc<Config>,
    pub instructions: Arc<Instructions>,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl StepContext {
    pub fn new(registry: Arc<ClientRegistry>, config: Arc<Config>, instructions: Instructions) -> Self {
        Self {
            registry,
            store: TextStore::new(),
            config,
            instructions: Arc::new(instructions),
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn paths(&self) -> &PathsConfig {
        &self.config.paths
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.config.generation
    }

    /// Executor sized by the parallelism of the client that drives `step`.
    pub fn executor(&self, step: &str, client: ClientName) -> BatchExecutor {
        let executor = BatchExecutor::new(step, self.registry.parallelism(client));
        match &self.events {
            Some(tx) => executor.with_events(tx.clone()),
            None => executor,
        }
    }
}

/// Escalate an aborted run into a fatal error.
pub fn ensure_completed(step: &str, outcome: BatchOutcome) -> DomainResult<BatchOutcome> {
    if outcome.aborted {
        return Err(DomainError::BatchAborted {
            step: step.to_string(),
            completed: outcome.completed,
            total: outcome.total,
        });
    }
    Ok(outcome)
}

/// Read and decode a generated artifact; a missing marker is malformed.
pub async fn read_artifact(ctx: &StepContext, path: &Path, kind: ArtifactKind) -> DomainResult<Artifact> {
    let raw = ctx
        .store
        .read_raw(path)
        .await?
        .ok_or_else(|| DomainError::SourceMissing(path.to_path_buf()))?;
    Artifact::decode(kind, &raw).ok_or_else(|| DomainError::MalformedArtifact {
        path: path.to_path_buf(),
        reason: format!("missing `{}` marker", kind.marker()),
    })
}

/// Timestamp written into artifact headers.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// File name of `path` as a string, for provenance headers.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// File stem of `path`, for derived artifact names.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}
