//! Batch processing of a document directory.

use crate::error::{CliError, Result};
use crate::source::is_supported;
use papersift_domain::{ExtractionRecord, LlmClient, TextSource};
use papersift_extractor::{Extractor, ResultStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Supported documents found in the input directory
    pub found: usize,
    /// Documents that produced a record this run
    pub processed: usize,
    /// Documents already in the result store
    pub skipped: usize,
    /// Records written as failures
    pub failed: usize,
    /// Documents answered from the response cache
    pub cache_hits: usize,
    /// Model calls made
    pub llm_calls: usize,
}

/// Runs every unprocessed document in a directory through the extractor.
pub struct BatchRunner<C, S>
where
    C: LlmClient,
    S: TextSource,
{
    extractor: Extractor<C>,
    source: S,
    store: ResultStore,
    limit: Option<usize>,
}

impl<C, S> BatchRunner<C, S>
where
    C: LlmClient,
    S: TextSource,
{
    /// Create a runner writing to `store`.
    pub fn new(extractor: Extractor<C>, source: S, store: ResultStore) -> Self {
        Self {
            extractor,
            source,
            store,
            limit: None,
        }
    }

    /// Stop after `limit` documents have been processed.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// The extractor documents are sent through.
    pub fn extractor(&self) -> &Extractor<C> {
        &self.extractor
    }

    /// The result store records are appended to.
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Process `input_dir` in filename order.
    ///
    /// Per-document failures are stored as failure records; only store
    /// errors abort the batch.
    pub async fn run(&mut self, input_dir: &Path) -> Result<BatchSummary> {
        let documents = list_documents(input_dir)?;
        let mut summary = BatchSummary {
            found: documents.len(),
            ..BatchSummary::default()
        };

        info!(
            "Found {} documents in {}",
            documents.len(),
            input_dir.display()
        );

        for path in &documents {
            let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
                warn!("Skipping {}: filename is not valid UTF-8", path.display());
                continue;
            };

            if self.store.is_processed(filename) {
                info!("Skipping {}: already processed", filename);
                summary.skipped += 1;
                continue;
            }

            if self.limit.is_some_and(|limit| summary.processed >= limit) {
                info!("Reached limit of {} documents", summary.processed);
                break;
            }

            info!("Processing {}...", filename);
            let record = match self.source.extract_text(path) {
                Ok(text) if text.trim().is_empty() => {
                    ExtractionRecord::failure(filename, "No text extracted from document")
                }
                Ok(text) => {
                    let result = self.extractor.extract(filename, &text).await;
                    if result.metadata.cache_hit {
                        summary.cache_hits += 1;
                    }
                    summary.llm_calls += result.metadata.llm_calls;
                    result.record
                }
                Err(e) => ExtractionRecord::failure(
                    filename,
                    CliError::TextExtraction(e.to_string()).to_string(),
                ),
            };

            if !record.is_success() {
                warn!(
                    "Failed to process {}: {}",
                    filename,
                    record.error().unwrap_or_default()
                );
                summary.failed += 1;
            }

            self.store.append(&record)?;
            summary.processed += 1;
        }

        info!(
            "Batch complete: {} processed, {} skipped, {} failed ({} cache hits, {} model calls)",
            summary.processed,
            summary.skipped,
            summary.failed,
            summary.cache_hits,
            summary.llm_calls
        );

        Ok(summary)
    }
}

/// Supported documents directly inside `dir`, sorted by filename.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "Input directory {} does not exist",
            dir.display()
        )));
    }

    let mut documents = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            documents.push(path);
        }
    }
    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(documents)
}
