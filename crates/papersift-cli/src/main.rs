//! papersift CLI - Extract structured fields from research papers.

use clap::Parser;
use papersift_cli::commands;
use papersift_cli::{Cli, Command, Config};
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> papersift_cli::Result<()> {
    let Cli { config, command } = Cli::parse();

    match command {
        Command::Init(args) => commands::execute_init(args, &config),
        Command::Fields => {
            commands::execute_fields();
            Ok(())
        }
        Command::Run(args) => {
            let config = load_config(&config)?;
            commands::execute_run(args, &config).await?;
            Ok(())
        }
    }
}

/// Load the configuration and install the log subscriber it asks for.
fn load_config(path: &Path) -> papersift_cli::Result<Config> {
    let config = Config::load(path)?;

    // Log to stderr; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    Ok(config)
}
