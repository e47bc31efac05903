//! Loads rule and flavor sources, expands them and persists the results.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::permutation_engine::PermutationEngine;
use crate::adapters::fs::TextStore;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FlavorLevel, PathsConfig, RuleDocument};

/// What one regeneration produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationSummary {
    pub permutation_count: usize,
    pub rule_count: usize,
    /// Flavor count per level, including empty levels.
    pub level_sizes: BTreeMap<u32, usize>,
    pub permutations_dir: PathBuf,
    pub aggregate_file: PathBuf,
}

pub struct PermutationService {
    store: TextStore,
    paths: PathsConfig,
}

impl PermutationService {
    pub fn new(store: TextStore, paths: PathsConfig) -> Self {
        Self { store, paths }
    }

    /// Rebuild the permutation directory and the aggregate rules document.
    ///
    /// The permutation directory is cleared first. Missing rule or flavor
    /// directories contribute nothing; a missing common rules file aborts
    /// before anything is written.
    pub async fn regenerate(&self) -> DomainResult<PermutationSummary> {
        let common_path = PathBuf::from(&self.paths.common_rules);
        let common = self
            .store
            .read(&common_path)
            .await?
            .map(|content| RuleDocument::new(common_path.display().to_string(), content))
            .ok_or_else(|| DomainError::SourceMissing(common_path.clone()))?;

        let rules = match &self.paths.rules_dir {
            Some(dir) => self.load_documents(Path::new(dir), "rules").await?,
            None => Vec::new(),
        };

        let mut levels = Vec::new();
        for (level, dir) in self.paths.flavor_level_dirs() {
            let flavors = self.load_documents(&dir, "flavors").await?;
            levels.push(FlavorLevel::new(level, flavors));
        }

        let engine = PermutationEngine::new();
        let expansion = engine.expand(Some(&common), &rules, &levels)?;

        let out_dir = self.paths.permutations_dir();
        self.store.reset_dir(&out_dir).await?;
        for permutation in &expansion.permutations {
            self.store
                .write(
                    &out_dir.join(permutation.file_name()),
                    &engine.render_permutation(permutation),
                )
                .await?;
        }

        let aggregate_file = self.paths.all_rules_file();
        self.store.write(&aggregate_file, &expansion.aggregate).await?;

        let summary = PermutationSummary {
            permutation_count: expansion.permutations.len(),
            rule_count: rules.len(),
            level_sizes: levels.iter().map(|l| (l.level, l.flavors.len())).collect(),
            permutations_dir: out_dir,
            aggregate_file,
        };
        info!(
            permutations = summary.permutation_count,
            rules = summary.rule_count,
            levels = summary.level_sizes.len(),
            "permutations regenerated"
        );
        Ok(summary)
    }

    /// Non-blank documents in `dir`, sorted by path.
    async fn load_documents(&self, dir: &Path, kind: &str) -> DomainResult<Vec<RuleDocument>> {
        let Some(files) = self.store.list_documents(dir).await? else {
            warn!(dir = %dir.display(), kind, "source directory missing; treating as empty");
            return Ok(Vec::new());
        };

        let mut docs = Vec::with_capacity(files.len());
        for path in files {
            match self.store.read(&path).await? {
                Some(content) if !content.trim().is_empty() => {
                    docs.push(RuleDocument::new(path.display().to_string(), content));
                }
                _ => warn!(path = %path.display(), kind, "skipping empty document"),
            }
        }
        if docs.is_empty() {
            warn!(dir = %dir.display(), kind, "no documents found");
        }
        ensure_unique_stems(&docs)?;
        Ok(docs)
    }
}

/// Permutation file names derive from stems, so `a.md` and `a.txt` cannot coexist.
fn ensure_unique_stems(docs: &[RuleDocument]) -> DomainResult<()> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(docs.len());
    for doc in docs {
        if let Some(first) = seen.insert(doc.stem(), &doc.source_id) {
            return Err(DomainError::Configuration(format!(
                "{first} and {} share the name '{}'; rename one of them",
                doc.source_id,
                doc.stem()
            )));
        }
    }
    Ok(())
}
