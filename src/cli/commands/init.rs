//! Implementation of the `permuter init` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::config::CONFIG_DIR;

/// Project configuration written by `init`. Paths are relative to the
/// directory the tool runs in.
pub const CONFIG_TEMPLATE: &str = r#"# permuter project configuration
paths:
  common_rules: rules/common.md
  rules_dir: rules/variants
  flavors_level_1_directory: flavors/level_1
  output_dir: .permuter

generation:
  prompts_per_permutation: 3
  prompt_temperature: 0.9
  response_temperature: 0.7
  evaluation_temperature: 0.0
  system_prompt_temperature: 0.4
  max_iterations: 3

clients:
  service:
    provider: anthropic
    model: claude-sonnet-4-5-20250929
    api_key_env: ANTHROPIC_API_KEY
    parallelism: 3
    requests_per_second: 2.0
  target:
    provider: anthropic
    model: claude-sonnet-4-5-20250929
    api_key_env: ANTHROPIC_API_KEY
    parallelism: 3
    requests_per_second: 2.0

retry:
  max_retries: 3
  initial_backoff_ms: 1000
  max_backoff_ms: 30000

logging:
  level: info
  format: pretty
  rotation: daily
"#;

const COMMON_RULES_TEMPLATE: &str = "// Rules shared by every permutation. Lines starting with // are ignored.\n";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub created: Vec<String>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.created.is_empty() {
            lines.push("\nCreated:".to_string());
            for entry in &self.created {
                lines.push(format!("  - {entry}"));
            }
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let result = scaffold(&target, args.force).await?;
    output(&result, json_mode);
    Ok(())
}

/// Write the configuration and the empty input layout under `target`.
/// Existing rule and flavor files are never touched.
pub async fn scaffold(target: &Path, force: bool) -> Result<InitOutput> {
    let config_file = target.join(CONFIG_DIR).join("config.yaml");
    if config_file.exists() && !force {
        return Ok(InitOutput {
            success: false,
            message: "Project already initialized. Use --force to overwrite the configuration."
                .to_string(),
            initialized_path: target.to_path_buf(),
            created: vec![],
        });
    }

    let mut created = Vec::new();
    for dir in [CONFIG_DIR, "rules/variants", "flavors/level_1"] {
        let path = target.join(dir);
        if !path.exists() {
            fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            created.push(format!("{dir}/"));
        }
    }

    fs::write(&config_file, CONFIG_TEMPLATE)
        .await
        .with_context(|| format!("Failed to write {}", config_file.display()))?;
    created.push(format!("{CONFIG_DIR}/config.yaml"));

    let common = target.join("rules/common.md");
    if !common.exists() {
        fs::write(&common, COMMON_RULES_TEMPLATE)
            .await
            .with_context(|| format!("Failed to write {}", common.display()))?;
        created.push("rules/common.md".to_string());
    }

    tracing::info!(path = %target.display(), "project initialized");
    Ok(InitOutput {
        success: true,
        message: format!("Initialized permuter project at {}", target.display()),
        initialized_path: target.to_path_buf(),
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Config;
    use crate::infrastructure::config::ConfigLoader;
    use figment::providers::{Format, Yaml};
    use figment::Figment;

    #[test]
    fn test_template_parses_and_validates() {
        let config: Config = Figment::new()
            .merge(Yaml::string(CONFIG_TEMPLATE))
            .extract()
            .unwrap();
        ConfigLoader::validate(&config).unwrap();
        assert_eq!(config.paths.flavor_level_dirs().len(), 1);
        assert_eq!(config.generation.max_iterations, 3);
    }

    #[tokio::test]
    async fn test_scaffold_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let result = scaffold(dir.path(), false).await.unwrap();

        assert!(result.success);
        assert!(dir.path().join(".permuter/config.yaml").is_file());
        assert!(dir.path().join("rules/common.md").is_file());
        assert!(dir.path().join("rules/variants").is_dir());
        assert!(dir.path().join("flavors/level_1").is_dir());
    }

    #[tokio::test]
    async fn test_scaffold_refuses_without_force() {
        let dir = tempfile::tempdir().unwrap();
        scaffold(dir.path(), false).await.unwrap();
        std::fs::write(dir.path().join("rules/common.md"), "Be kind.\n").unwrap();

        let again = scaffold(dir.path(), false).await.unwrap();
        assert!(!again.success);

        let forced = scaffold(dir.path(), true).await.unwrap();
        assert!(forced.success);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("rules/common.md")).unwrap(),
            "Be kind.\n"
        );
    }
}
