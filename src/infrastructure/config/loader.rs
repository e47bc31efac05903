use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{parse_flavor_level_key, Config};

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".permuter";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("paths.common_rules cannot be empty")]
    EmptyCommonRules,

    #[error("paths.output_dir cannot be empty")]
    EmptyOutputDir,

    #[error("Unknown key in paths: {0}")]
    UnknownPathKey(String),

    #[error("Invalid flavor level {0}: levels start at 1")]
    InvalidFlavorLevel(u32),

    #[error("Flavor level {0} is declared more than once")]
    DuplicateFlavorLevel(u32),

    #[error("generation.prompts_per_permutation must be at least 1")]
    InvalidPromptsPerPermutation,

    #[error("generation.max_iterations must be at least 1")]
    InvalidMaxIterations,

    #[error("Invalid {name}: {value}. Must be between 0.0 and 1.0")]
    InvalidTemperature { name: &'static str, value: f32 },

    #[error("Invalid parallelism for {0} client: must be at least 1")]
    InvalidParallelism(&'static str),

    #[error("Invalid rate limit for {client} client: {value}. Must be positive")]
    InvalidRateLimit { client: &'static str, value: f64 },

    #[error("Model name for {0} client cannot be empty")]
    EmptyModel(&'static str),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .permuter/config.yaml (project config, created by init)
    /// 3. .permuter/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PERMUTER_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("config.yaml")))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("local.yaml")))
            .merge(Env::prefixed("PERMUTER_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment variables still
    /// override file values.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("PERMUTER_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let paths = &config.paths;
        if paths.common_rules.trim().is_empty() {
            return Err(ConfigError::EmptyCommonRules);
        }
        if paths.output_dir.trim().is_empty() {
            return Err(ConfigError::EmptyOutputDir);
        }

        let mut seen = BTreeMap::new();
        for key in paths.extra.keys() {
            let level = parse_flavor_level_key(key)
                .ok_or_else(|| ConfigError::UnknownPathKey(key.clone()))?;
            if level == 0 {
                return Err(ConfigError::InvalidFlavorLevel(level));
            }
            if seen.insert(level, key).is_some() {
                return Err(ConfigError::DuplicateFlavorLevel(level));
            }
        }

        let generation = &config.generation;
        if generation.prompts_per_permutation == 0 {
            return Err(ConfigError::InvalidPromptsPerPermutation);
        }
        if generation.max_iterations == 0 {
            return Err(ConfigError::InvalidMaxIterations);
        }
        for (name, value) in [
            ("prompt_temperature", generation.prompt_temperature),
            ("response_temperature", generation.response_temperature),
            ("evaluation_temperature", generation.evaluation_temperature),
            ("system_prompt_temperature", generation.system_prompt_temperature),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidTemperature { name, value });
            }
        }

        for (client, settings) in [
            ("service", &config.clients.service),
            ("target", &config.clients.target),
        ] {
            if settings.parallelism == 0 {
                return Err(ConfigError::InvalidParallelism(client));
            }
            if !(settings.requests_per_second > 0.0 && settings.requests_per_second.is_finite()) {
                return Err(ConfigError::InvalidRateLimit {
                    client,
                    value: settings.requests_per_second,
                });
            }
            if settings.model.trim().is_empty() {
                return Err(ConfigError::EmptyModel(client));
            }
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{LogFormat, ProviderKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.paths.output_dir, ".permuter");
        assert_eq!(config.generation.max_iterations, 3);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let file = yaml_file(
            "paths:\n  common_rules: my/common.md\n  flavors_level_1_directory: f/1\n\
             clients:\n  target:\n    provider: mock\n    parallelism: 6\n\
             logging:\n  format: json\n",
        );
        let config = temp_env::with_vars_unset(["PERMUTER_LOGGING__LEVEL"], || {
            ConfigLoader::load_from_file(file.path()).unwrap()
        });

        assert_eq!(config.paths.common_rules, "my/common.md");
        assert_eq!(config.paths.rules_dir.as_deref(), Some("rules/variants"));
        assert_eq!(config.paths.flavor_level_dirs().len(), 1);
        assert_eq!(config.clients.target.provider, ProviderKind::Mock);
        assert_eq!(config.clients.target.parallelism, 6);
        assert_eq!(config.clients.service.parallelism, 3);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = yaml_file("generation:\n  max_iterations: 4\n");
        temp_env::with_vars(
            [
                ("PERMUTER_GENERATION__MAX_ITERATIONS", Some("7")),
                ("PERMUTER_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.generation.max_iterations, 7);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = ConfigLoader::load_from_file("/nonexistent/permuter.yaml").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let file = yaml_file("generation:\n  max_iterations: 0\n");
        let err = temp_env::with_vars_unset(["PERMUTER_GENERATION__MAX_ITERATIONS"], || {
            ConfigLoader::load_from_file(file.path()).unwrap_err()
        });
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidMaxIterations)
        ));
    }

    #[test]
    fn test_validate_empty_common_rules() {
        let mut config = Config::default();
        config.paths.common_rules = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyCommonRules)
        ));
    }

    #[test]
    fn test_validate_unknown_path_key() {
        let mut config = Config::default();
        config.paths.extra.insert("flavour_dir".into(), "x".into());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::UnknownPathKey(key)) if key == "flavour_dir"
        ));
    }

    #[test]
    fn test_validate_duplicate_and_zero_levels() {
        let mut config = Config::default();
        config.paths.extra.insert("flavors_level_1_directory".into(), "a".into());
        config.paths.extra.insert("flavors_level_01_directory".into(), "b".into());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::DuplicateFlavorLevel(1))
        ));

        let mut config = Config::default();
        config.paths.extra.insert("flavors_level_0_directory".into(), "a".into());
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidFlavorLevel(0))
        ));
    }

    #[test]
    fn test_validate_generation_bounds() {
        let mut config = Config::default();
        config.generation.prompts_per_permutation = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidPromptsPerPermutation)
        ));

        let mut config = Config::default();
        config.generation.response_temperature = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTemperature {
                name: "response_temperature",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_client_settings() {
        let mut config = Config::default();
        config.clients.target.parallelism = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidParallelism("target"))
        ));

        let mut config = Config::default();
        config.clients.service.requests_per_second = 0.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRateLimit { client: "service", .. })
        ));
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 30000;
        config.retry.max_backoff_ms = 10000;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30000, 10000))
        ));
    }

    #[test]
    fn test_validate_zero_retries_allowed() {
        let mut config = Config::default();
        config.retry.max_retries = 0;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }
}
