//! papersift CLI library.
//!
//! This library provides the pieces behind the `papersift` binary:
//! configuration management, document text sources, and the batch driver
//! that feeds a directory of papers through the extractor.

pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod source;

pub use batch::{list_documents, BatchRunner, BatchSummary};
pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use source::{AutoTextSource, PdfTextSource, PlainTextSource};
