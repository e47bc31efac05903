pub mod artifact;
pub mod batch;
pub mod client;
pub mod config;
pub mod convergence;
pub mod correction;
pub mod rule;

pub use artifact::{strip_comments, Artifact, ArtifactHeader, ArtifactKind, COMMENT_MARKER};
pub use batch::{BatchOutcome, UnitFailure};
pub use client::{ClientName, ModelRequest};
pub use config::{
    ClientConfig, ClientsConfig, Config, GenerationConfig, InstructionsConfig, LogFormat,
    LoggingConfig, PathsConfig, ProviderKind, RetryConfig, RotationPolicy,
};
pub use convergence::{ControllerState, ConvergenceState};
pub use correction::{aggregate_corrections, CorrectionRecord, EvaluationTally, Verdict};
pub use rule::{FlavorLevel, Permutation, RuleDocument};
