//! Helpdesk RAG CLI entry point.

use anyhow::{Context, Result};
use clap::Parser;

use helpdesk_rag::cli::{commands, handle_error, load_config, AppContext, Cli, Commands};
use helpdesk_rag::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(&cli).await {
        handle_error(&err, cli.json);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let log_config = LogConfig::try_from(&config.logging).map_err(anyhow::Error::msg)?;
    let _logger = LoggerImpl::init(&log_config)?;

    let ctx = AppContext::build(config)?;
    match &cli.command {
        Commands::Health => commands::health::execute(&ctx, cli.json).await,
        Commands::EnsureCollection => commands::collection::execute(&ctx, cli.json).await,
        Commands::Search { query, top_k, kb } => {
            commands::search::execute(&ctx, query.clone(), *top_k, kb.clone(), cli.json).await
        }
    }
}
