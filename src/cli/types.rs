//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::commands::{
    evaluate::EvaluateArgs, improve::ImproveArgs, init::InitArgs, permute::PermuteArgs,
    prompts::PromptsArgs, responses::ResponsesArgs, run::RunArgs, status::StatusArgs,
};

#[derive(Parser, Debug)]
#[command(name = "permuter")]
#[command(about = "Permuter - rule permutation and system prompt improvement harness", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .permuter/config.yaml + local.yaml)
    #[arg(short, long, global = true, env = "PERMUTER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project configuration and source layout
    Init(InitArgs),

    /// Expand rules and flavors into permutation documents
    Permute(PermuteArgs),

    /// Generate test prompts for every permutation
    Prompts(PromptsArgs),

    /// Run every prompt through the target model
    Responses(ResponsesArgs),

    /// Evaluate responses against the rules
    Evaluate(EvaluateArgs),

    /// Iterate on the target system prompt until evaluations pass
    Improve(ImproveArgs),

    /// Permute, generate prompts, then improve
    Run(RunArgs),

    /// Show artifact counts and the latest evaluation summary
    Status(StatusArgs),
}
