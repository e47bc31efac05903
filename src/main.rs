//! Permuter CLI entry point.

use anyhow::Result;
use clap::Parser;

use permuter::cli::{commands, Cli, Commands};
use permuter::domain::models::Config;
use permuter::infrastructure::config::ConfigLoader;
use permuter::infrastructure::logging::LoggerImpl;

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let json = cli.json;
    if let Commands::Init(args) = cli.command {
        let _logger = LoggerImpl::init(&Config::default().logging)?;
        return commands::init::execute(args, json).await;
    }

    let config = load_config(&cli)?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Permute(args) => commands::permute::execute(args, &config, json).await,
        Commands::Prompts(args) => commands::prompts::execute(args, &config, json).await,
        Commands::Responses(args) => commands::responses::execute(args, &config, json).await,
        Commands::Evaluate(args) => commands::evaluate::execute(args, &config, json).await,
        Commands::Improve(args) => commands::improve::execute(args, &config, json).await,
        Commands::Run(args) => commands::run::execute(args, &config, json).await,
        Commands::Status(args) => commands::status::execute(args, &config, json).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = dispatch(cli).await {
        permuter::cli::handle_error(err, json);
    }
}
