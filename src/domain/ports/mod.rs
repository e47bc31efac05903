//! Port interfaces implemented by adapters and services.

pub mod improvement_steps;
pub mod model_client;

pub use improvement_steps::{ImprovementSteps, PrerequisiteStatus};
pub use model_client::ModelClient;
