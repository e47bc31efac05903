//! Service-model instructions for each generation step.
//!
//! Built-in texts can be replaced per step by pointing
//! `instructions.<step>` at a file.

use std::path::PathBuf;

use tracing::debug;

use crate::adapters::fs::TextStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::InstructionsConfig;

pub const PROMPT_GENERATION: &str = "\
You write test prompts for a conversational assistant.
The input is a set of behavioral rules the assistant must follow.
Write one realistic user message that exercises as many of these rules as
possible, including edge cases where a careless assistant would break them.
Reply with the user message only. Do not explain it and do not mention the rules.";

pub const EVALUATION: &str = "\
You audit assistant responses against a rule set.
The input contains the complete rules, the rule permutation under test, the
user prompt and the assistant response.
Decide whether the response follows every applicable rule.
Answer in exactly this format:
EVALUATION: PASS or FAIL
CORRECTIONS: concrete changes to the assistant's system prompt that would
prevent each violation, or \"None needed\" when the response passes.";

pub const SYSTEM_PROMPT: &str = "\
You write system prompts for a conversational assistant.
The input contains the complete rule set and may contain a previous system
prompt and corrections collected from failed evaluations.
Write a single system prompt that makes the assistant follow every rule.
When corrections are present, revise the previous prompt so each correction
is addressed without dropping existing guidance.
Reply with the system prompt text only.";

/// Resolved instruction texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructions {
    pub prompt_generation: String,
    pub evaluation: String,
    pub system_prompt: String,
}

impl Default for Instructions {
    fn default() -> Self {
        Self {
            prompt_generation: PROMPT_GENERATION.to_string(),
            evaluation: EVALUATION.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Instructions {
    /// Apply file overrides from configuration. An override that points at
    /// a missing or empty file is an error.
    pub async fn load(config: &InstructionsConfig, store: &TextStore) -> DomainResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            prompt_generation: resolve(store, config.prompt_generation.as_deref(), defaults.prompt_generation).await?,
            evaluation: resolve(store, config.evaluation.as_deref(), defaults.evaluation).await?,
            system_prompt: resolve(store, config.system_prompt.as_deref(), defaults.system_prompt).await?,
        })
    }
}

async fn resolve(store: &TextStore, path: Option<&str>, fallback: String) -> DomainResult<String> {
    let Some(path) = path else {
        return Ok(fallback);
    };
    let path = PathBuf::from(path);
    match store.read(&path).await? {
        Some(text) if !text.trim().is_empty() => {
            debug!(path = %path.display(), "using instruction override");
            Ok(text)
        }
        _ => Err(DomainError::SourceMissing(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_defaults_without_overrides() {
        let loaded = Instructions::load(&InstructionsConfig::default(), &TextStore::new())
            .await
            .unwrap();
        assert_eq!(loaded, Instructions::default());
        assert!(loaded.evaluation.contains("EVALUATION:"));
    }

    #[tokio::test]
    async fn test_file_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("eval.md");
        TextStore::new()
            .write(&path, "// note\nJudge strictly.")
            .await
            .unwrap();

        let config = InstructionsConfig {
            evaluation: Some(path.display().to_string()),
            ..Default::default()
        };
        let loaded = Instructions::load(&config, &TextStore::new()).await.unwrap();
        assert_eq!(loaded.evaluation, "Judge strictly.");
        assert_eq!(loaded.prompt_generation, PROMPT_GENERATION);
    }

    #[tokio::test]
    async fn test_missing_override_is_error() {
        let config = InstructionsConfig {
            system_prompt: Some("/nonexistent/system.md".to_string()),
            ..Default::default()
        };
        let err = Instructions::load(&config, &TextStore::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::SourceMissing(_)));
    }
}
