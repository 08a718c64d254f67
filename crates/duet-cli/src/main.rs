//! Duet CLI - drive the conversation sync engine from the terminal.

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::load_config;
use crate::commands::conversation_id::run_conversation_id;
use crate::commands::demo::run_demo;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("duet=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ConversationId { a, b, json } => run_conversation_id(&a, &b, json)?,
        Commands::Demo { json, messages } => {
            let config = load_config(cli.config.as_deref())?;
            run_demo(config, messages, json).await?;
        }
    }

    Ok(())
}
