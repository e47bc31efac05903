//! Permuter - rule permutation and system prompt improvement harness
//!
//! Expands a common rules document, rule variants and layered flavor
//! directories into one document per combination, generates test prompts
//! for each, runs them through a target model and has a service model judge
//! the answers. Failed judgements feed back into the target system prompt
//! until a pass comes back clean or the iteration budget runs out.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and ports
//! - **Service Layer** (`services`): permutation, generation, evaluation and
//!   the improvement loop
//! - **Adapters** (`adapters`): model clients and the artifact store
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::clients::ClientRegistry;
pub use adapters::fs::TextStore;
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    BatchOutcome, ClientName, Config, ControllerState, ConvergenceState, CorrectionRecord,
    EvaluationTally, LoggingConfig, RetryConfig,
};
pub use domain::ports::{ImprovementSteps, ModelClient};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ImprovementController, ImprovementReport, PermutationEngine, Pipeline};
