//! Run command implementation.

use crate::batch::{BatchRunner, BatchSummary};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::source::AutoTextSource;
use papersift_extractor::{default_query, Extractor, ResponseCache, ResultStore};
use papersift_llm::AnthropicClient;
use tracing::info;

/// Process the input directory against the Anthropic API.
pub async fn execute_run(args: RunArgs, config: &Config) -> Result<BatchSummary> {
    let input_dir = args.input.unwrap_or_else(|| config.paths.input_dir.clone());
    let results_file = args
        .results
        .unwrap_or_else(|| config.paths.results_file.clone());
    let cache_file = args.cache.unwrap_or_else(|| config.paths.cache_file.clone());

    let client = AnthropicClient::new(config.api_key()?, config.llm.model.clone())?
        .with_endpoint(config.llm.endpoint.clone())
        .with_max_retries(config.llm.max_retries);

    info!(
        "Using model {} at {} ({} tokens/minute)",
        client.model(),
        config.llm.endpoint,
        config.extractor.tokens_per_minute
    );

    let query = default_query();
    let cache = ResponseCache::open(&cache_file)?;
    info!(
        "Loaded {} cached responses from {}",
        cache.len(),
        cache_file.display()
    );

    let store = ResultStore::open(&results_file, &query)?;
    let extractor = Extractor::new(client, cache, query, config.extractor.clone())?;

    let mut runner =
        BatchRunner::new(extractor, AutoTextSource::default(), store).with_limit(args.limit);
    let summary = runner.run(&input_dir).await?;

    println!(
        "Processed {} of {} documents ({} skipped, {} failed). Results in {}",
        summary.processed,
        summary.found,
        summary.skipped,
        summary.failed,
        results_file.display()
    );
    Ok(summary)
}
