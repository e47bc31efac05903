use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::client::ClientName;

/// Main configuration structure for permuter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Generation and iteration tunables
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Service and target model clients
    #[serde(default)]
    pub clients: ClientsConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Optional instruction overrides
    #[serde(default)]
    pub instructions: InstructionsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Input documents and output directory.
///
/// Flavor levels are declared as `flavors_level_<N>_directory` keys and
/// collected into `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    /// Common rules document (required)
    #[serde(default = "default_common_rules")]
    pub common_rules: String,

    /// Directory of rule variants (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_dir: Option<String>,

    /// Root for every generated artifact
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// `flavors_level_<N>_directory` entries and any unrecognized keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

fn default_common_rules() -> String {
    "rules/common.md".to_string()
}

fn default_output_dir() -> String {
    ".permuter".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            common_rules: default_common_rules(),
            rules_dir: Some("rules/variants".to_string()),
            output_dir: default_output_dir(),
            extra: BTreeMap::new(),
        }
    }
}

/// Parse `flavors_level_<N>_directory` into `N`.
pub fn parse_flavor_level_key(key: &str) -> Option<u32> {
    key.strip_prefix("flavors_level_")?
        .strip_suffix("_directory")?
        .parse()
        .ok()
}

impl PathsConfig {
    /// Configured flavor level directories, ascending by level.
    pub fn flavor_level_dirs(&self) -> Vec<(u32, PathBuf)> {
        let mut levels: Vec<(u32, PathBuf)> = self
            .extra
            .iter()
            .filter_map(|(k, v)| parse_flavor_level_key(k).map(|n| (n, PathBuf::from(v))))
            .collect();
        levels.sort_by_key(|(n, _)| *n);
        levels
    }

    pub fn output_root(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    pub fn permutations_dir(&self) -> PathBuf {
        self.output_root().join("permutations")
    }

    pub fn all_rules_file(&self) -> PathBuf {
        self.output_root().join("all_rules.md")
    }

    pub fn prompts_dir(&self) -> PathBuf {
        self.output_root().join("prompts")
    }

    pub fn responses_dir(&self) -> PathBuf {
        self.output_root().join("responses")
    }

    pub fn corrections_dir(&self) -> PathBuf {
        self.output_root().join("corrections")
    }

    pub fn system_prompt_file(&self) -> PathBuf {
        self.output_root().join("target_system_prompt.md")
    }

    pub fn history_dir(&self) -> PathBuf {
        self.output_root().join("history")
    }
}

/// Generation tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    /// Prompts generated for each permutation
    #[serde(default = "default_prompts_per_permutation")]
    pub prompts_per_permutation: usize,

    #[serde(default = "default_prompt_temperature")]
    pub prompt_temperature: f32,

    #[serde(default = "default_response_temperature")]
    pub response_temperature: f32,

    #[serde(default)]
    pub evaluation_temperature: f32,

    #[serde(default = "default_system_prompt_temperature")]
    pub system_prompt_temperature: f32,

    /// Upper bound on evaluation passes
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

const fn default_prompts_per_permutation() -> usize {
    3
}

const fn default_prompt_temperature() -> f32 {
    0.9
}

const fn default_response_temperature() -> f32 {
    0.7
}

const fn default_system_prompt_temperature() -> f32 {
    0.4
}

const fn default_max_iterations() -> u32 {
    3
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            prompts_per_permutation: default_prompts_per_permutation(),
            prompt_temperature: default_prompt_temperature(),
            response_temperature: default_response_temperature(),
            evaluation_temperature: 0.0,
            system_prompt_temperature: default_system_prompt_temperature(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Backend used by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// Deterministic offline responses
    Mock,
}

/// One model client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Units executed concurrently in one batch
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Sustained request rate
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

const fn default_provider() -> ProviderKind {
    ProviderKind::Anthropic
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

const fn default_timeout_secs() -> u64 {
    120
}

const fn default_max_tokens() -> u32 {
    4096
}

/// Kept small so a rate-limited provider is not flooded.
pub const DEFAULT_PARALLELISM: usize = 3;

const fn default_parallelism() -> usize {
    DEFAULT_PARALLELISM
}

const fn default_requests_per_second() -> f64 {
    2.0
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            parallelism: default_parallelism(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientsConfig {
    #[serde(default)]
    pub service: ClientConfig,

    #[serde(default)]
    pub target: ClientConfig,
}

impl ClientsConfig {
    pub const fn get(&self, name: ClientName) -> &ClientConfig {
        match name {
            ClientName::Service => &self.service,
            ClientName::Target => &self.target,
        }
    }
}

/// Retry policy for rate-limited requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Files replacing the built-in service instructions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InstructionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_generation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for rolling JSON log files (stderr only when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    #[serde(default = "default_rotation")]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

const fn default_rotation() -> RotationPolicy {
    RotationPolicy::Daily
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
