//! CLI command definitions and argument parsing.

use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// papersift - Extract structured fields from research papers with an LLM.
#[derive(Debug, Parser)]
#[command(name = "papersift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "PAPERSIFT_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every unprocessed document in the input directory
    Run(RunArgs),

    /// Write a default configuration file
    Init(InitArgs),

    /// Print the extracted field names
    Fields,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Directory of PDF or text documents (overrides paths.input_dir)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Results CSV (overrides paths.results_file)
    #[arg(short, long)]
    pub results: Option<PathBuf>,

    /// Response cache file (overrides paths.cache_file)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Process at most this many documents
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}
