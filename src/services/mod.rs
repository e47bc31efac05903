pub mod batch_executor;
pub mod evaluator;
pub mod improvement_controller;
pub mod instructions;
pub mod permutation_engine;
pub mod permutation_service;
pub mod pipeline;
pub mod prompt_generator;
pub mod response_generator;
pub mod step_context;
pub mod system_prompt_generator;

pub use batch_executor::{BatchEvent, BatchExecutor, WorkUnit};
pub use evaluator::Evaluator;
pub use improvement_controller::{ImprovementController, ImprovementReport};
pub use instructions::Instructions;
pub use permutation_engine::{Expansion, PermutationEngine};
pub use permutation_service::{PermutationService, PermutationSummary};
pub use pipeline::Pipeline;
pub use prompt_generator::{PromptGenerator, PromptJob};
pub use response_generator::ResponseGenerator;
pub use step_context::StepContext;
pub use system_prompt_generator::SystemPromptGenerator;
