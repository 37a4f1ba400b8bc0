//! Core Extractor implementation

use crate::cache::ResponseCache;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::{CsvRowParser, ResponseParser};
use crate::rate_limiter::RateLimiter;
use crate::tokens::EstimatingTokenCounter;
use crate::types::{ExtractionMetadata, ExtractionResult};
use papersift_domain::prompt::{render_user_message, SYSTEM_PROMPT};
use papersift_domain::{
    CacheKey, CompletionOptions, ExtractionQuery, ExtractionRecord, LlmClient, TokenCounter,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Headroom kept below the context window when pre-fitting a document
const CONTEXT_SAFETY_TOKENS: usize = 1_000;

/// The Extractor turns one document into one [`ExtractionRecord`]
///
/// Each distinct (text, query) pair costs at most one model call over the
/// lifetime of the cache. Oversized documents are cut to a prefix and
/// retried until the service accepts them or the shrink limits are hit.
pub struct Extractor<C>
where
    C: LlmClient,
{
    client: Arc<C>,
    counter: Arc<dyn TokenCounter>,
    parser: Box<dyn ResponseParser>,
    limiter: RateLimiter,
    cache: Mutex<ResponseCache>,
    query: ExtractionQuery,
    config: ExtractorConfig,
    prompt_overhead: usize,
}

/// Per-document state for one call of `extract`
struct ProcessingState {
    current_text: String,
    current_tokens: usize,
    shrinks: usize,
    llm_calls: usize,
    cache_hit: bool,
    waited: Duration,
}

impl<C> Extractor<C>
where
    C: LlmClient,
{
    /// Create a new Extractor with the estimating token counter and CSV parser
    pub fn new(
        client: C,
        cache: ResponseCache,
        query: ExtractionQuery,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let counter: Arc<dyn TokenCounter> = Arc::new(EstimatingTokenCounter);
        let prompt_overhead = prompt_overhead(counter.as_ref(), &query);
        let parser = Box::new(CsvRowParser::new(&config.ignored_line_fragments));

        Ok(Self {
            client: Arc::new(client),
            counter,
            parser,
            limiter: RateLimiter::new(config.tokens_per_minute),
            cache: Mutex::new(cache),
            query,
            config,
            prompt_overhead,
        })
    }

    /// Use a different token counter
    pub fn with_token_counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.counter = Arc::new(counter);
        self.prompt_overhead = prompt_overhead(self.counter.as_ref(), &self.query);
        self
    }

    /// Use a different response parser
    pub fn with_parser(mut self, parser: impl ResponseParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// The query applied to every document
    pub fn query(&self) -> &ExtractionQuery {
        &self.query
    }

    /// Active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The client used for model calls
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Shared per-minute token budget
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Number of cached responses
    pub fn cached_responses(&self) -> usize {
        self.lock_cache().len()
    }

    /// Tokens the system prompt and instruction add to every request
    pub fn prompt_overhead(&self) -> usize {
        self.prompt_overhead
    }

    /// Extract the query's fields from one document
    ///
    /// Never fails: processing and parsing errors become a
    /// [`ExtractionRecord::Failure`].
    pub async fn extract(&self, filename: &str, text: &str) -> ExtractionResult {
        let start_time = Instant::now();
        let full_key = CacheKey::compute(text, &self.query);
        let initial_tokens = self.counter.count(text);

        info!(
            "Starting extraction for '{}' ({} tokens)",
            filename, initial_tokens
        );

        let mut state = ProcessingState {
            current_text: text.to_string(),
            current_tokens: initial_tokens,
            shrinks: 0,
            llm_calls: 0,
            cache_hit: false,
            waited: Duration::ZERO,
        };

        let outcome = self
            .obtain_response(&full_key, &mut state)
            .await
            .and_then(|response| self.parser.parse(&response, self.query.field_count()));

        let record = match outcome {
            Ok(values) => ExtractionRecord::from_values(filename, &self.query, values),
            Err(e) => {
                warn!("Extraction failed for '{}': {}", filename, e);
                ExtractionRecord::failure(filename, e.to_string())
            }
        };

        let processing_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            "Extraction complete for '{}': success={}, calls={}, shrinks={}, cache_hit={}",
            filename,
            record.is_success(),
            state.llm_calls,
            state.shrinks,
            state.cache_hit
        );

        ExtractionResult {
            record,
            metadata: ExtractionMetadata {
                filename: filename.to_string(),
                cache_key: full_key,
                cache_hit: state.cache_hit,
                llm_calls: state.llm_calls,
                shrinks: state.shrinks,
                initial_tokens,
                final_tokens: (!state.cache_hit).then_some(state.current_tokens),
                rate_limit_wait: state.waited,
                processing_time_ms,
            },
        }
    }

    /// Run the lookup / admit / call / shrink loop until a raw response exists
    async fn obtain_response(
        &self,
        full_key: &CacheKey,
        state: &mut ProcessingState,
    ) -> Result<String, ExtractorError> {
        if let Some(response) = self.cached(full_key) {
            info!("Using cached response");
            state.cache_hit = true;
            return Ok(response);
        }

        self.pre_fit(state);

        let options = self.config.completion_options();
        loop {
            let key = if state.shrinks == 0 {
                full_key.clone()
            } else {
                CacheKey::compute(&state.current_text, &self.query)
            };

            if state.shrinks > 0 {
                if let Some(response) = self.cached(&key) {
                    info!("Using cached response for truncated text");
                    state.cache_hit = true;
                    self.store_response(full_key, &response);
                    return Ok(response);
                }
            }

            let cost = self.request_cost(&state.current_text);
            state.waited += self.limiter.admit(cost).await;
            state.llm_calls += 1;

            debug!(
                "Calling model with {} document tokens ({} total)",
                state.current_tokens, cost
            );

            match self.call_client(&state.current_text, &options).await {
                Ok(response) => {
                    self.limiter.record(cost).await;
                    self.store_response(&key, &response);
                    if &key != full_key {
                        // Reruns on the full text then hit without shrinking again
                        self.store_response(full_key, &response);
                    }
                    return Ok(response);
                }
                Err(ExtractorError::Overflow(msg)) => {
                    warn!(
                        "Input too large at {} tokens: {}",
                        state.current_tokens, msg
                    );
                    self.shrink(state)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_client(
        &self,
        text: &str,
        options: &CompletionOptions,
    ) -> Result<String, ExtractorError> {
        self.client
            .call(text, &self.query, options)
            .await
            .map_err(|e| {
                if e.is_overflow() {
                    ExtractorError::Overflow(e.to_string())
                } else {
                    ExtractorError::Processing(e.to_string())
                }
            })
    }

    /// Cut the text up front when it cannot fit the model's context window
    fn pre_fit(&self, state: &mut ProcessingState) {
        let Some(max_context) = self.config.max_context_tokens else {
            return;
        };

        let limit = max_context
            .saturating_sub(self.prompt_overhead)
            .saturating_sub(CONTEXT_SAFETY_TOKENS)
            .max(self.config.min_truncation_tokens);

        if state.current_tokens <= limit {
            return;
        }

        let truncated = self.counter.truncate(&state.current_text, limit);
        let tokens = self.counter.count(&truncated);
        info!(
            "Document exceeds context window, truncating from {} to {} tokens",
            state.current_tokens, tokens
        );
        state.current_text = truncated;
        state.current_tokens = tokens;
        state.shrinks += 1;
    }

    /// Shrink the current text one step
    ///
    /// The target is the smaller of the ratio step and the per-minute budget
    /// left for document text, never below the floor.
    fn shrink(&self, state: &mut ProcessingState) -> Result<(), ExtractorError> {
        let floor = self.config.min_truncation_tokens;
        let current = state.current_tokens;

        if state.shrinks >= self.config.max_shrink_steps {
            return Err(ExtractorError::Processing(format!(
                "Input still too large after {} shrink steps ({} tokens)",
                state.shrinks, current
            )));
        }
        if current <= floor {
            return Err(ExtractorError::Processing(format!(
                "Input too large at {} tokens, already at the {} token floor",
                current, floor
            )));
        }

        let by_ratio = (current as f64 * self.config.truncation_ratio).floor() as usize;
        let by_budget = self
            .limiter
            .budget()
            .saturating_sub(self.prompt_overhead);
        let target = by_ratio.min(by_budget).max(floor);

        if target >= current {
            return Err(ExtractorError::Processing(format!(
                "Cannot shrink input below {} tokens",
                current
            )));
        }

        let truncated = self.counter.truncate(&state.current_text, target);
        let tokens = self.counter.count(&truncated);
        if tokens >= current {
            return Err(ExtractorError::Processing(format!(
                "Truncation made no progress at {} tokens",
                current
            )));
        }

        info!("Truncating from {} to {} tokens", current, tokens);
        state.current_text = truncated;
        state.current_tokens = tokens;
        state.shrinks += 1;
        Ok(())
    }

    /// Tokens a request for `text` will spend, prompt framing included
    fn request_cost(&self, text: &str) -> usize {
        self.counter.count(SYSTEM_PROMPT)
            + self
                .counter
                .count(&render_user_message(text, self.query.instruction()))
    }

    fn cached(&self, key: &CacheKey) -> Option<String> {
        self.lock_cache().get(key).map(str::to_string)
    }

    fn store_response(&self, key: &CacheKey, response: &str) {
        if let Err(e) = self.lock_cache().set(key, response) {
            warn!("Failed to persist cached response {}: {}", key, e);
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prompt_overhead(counter: &dyn TokenCounter, query: &ExtractionQuery) -> usize {
    counter.count(SYSTEM_PROMPT) + counter.count(&render_user_message("", query.instruction()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use papersift_llm::MockClient;

    fn extractor(config: ExtractorConfig) -> Extractor<MockClient> {
        Extractor::new(
            MockClient::new("a,b"),
            ResponseCache::in_memory(),
            ExtractionQuery::new("Extract a and b", ["a", "b"]),
            config,
        )
        .unwrap()
    }

    fn state(tokens: usize) -> ProcessingState {
        ProcessingState {
            current_text: "x".repeat(tokens * 4),
            current_tokens: tokens,
            shrinks: 0,
            llm_calls: 0,
            cache_hit: false,
            waited: Duration::ZERO,
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = ExtractorConfig::default();
        config.truncation_ratio = 1.5;
        let result = Extractor::new(
            MockClient::new(""),
            ResponseCache::in_memory(),
            ExtractionQuery::new("q", ["a"]),
            config,
        );
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_extract_reports_metadata() {
        let extractor = extractor(ExtractorConfig::default());
        let result = tokio_test::block_on(extractor.extract("doc.txt", &"z".repeat(400)));

        assert!(result.is_success());
        assert_eq!(result.metadata.filename, "doc.txt");
        assert_eq!(result.metadata.initial_tokens, 100);
        assert_eq!(result.metadata.final_tokens, Some(100));
        assert_eq!(result.metadata.llm_calls, 1);
        assert!(!result.metadata.was_truncated());
        assert_eq!(
            result.metadata.cache_key,
            CacheKey::compute(&"z".repeat(400), extractor.query())
        );
    }

    #[test]
    fn test_request_cost_includes_framing() {
        let extractor = extractor(ExtractorConfig::default());
        let text = "y".repeat(4_000);
        let cost = extractor.request_cost(&text);
        assert!(cost >= 1_000 + extractor.prompt_overhead() - 2);
        assert!(cost <= 1_000 + extractor.prompt_overhead() + 2);
    }

    #[test]
    fn test_shrink_by_ratio() {
        let mut config = ExtractorConfig::default();
        config.tokens_per_minute = 1_000_000;
        let extractor = extractor(config);

        let mut s = state(10_000);
        extractor.shrink(&mut s).unwrap();
        assert_eq!(s.current_tokens, 8_000);
        assert_eq!(s.shrinks, 1);
    }

    #[test]
    fn test_shrink_limited_by_budget() {
        let extractor = extractor(ExtractorConfig::default());
        let mut s = state(100_000);
        extractor.shrink(&mut s).unwrap();
        assert_eq!(s.current_tokens, 20_000 - extractor.prompt_overhead());
    }

    #[test]
    fn test_shrink_clamps_to_floor() {
        let mut config = ExtractorConfig::default();
        config.tokens_per_minute = 1_000_000;
        let extractor = extractor(config);

        let mut s = state(1_100);
        extractor.shrink(&mut s).unwrap();
        assert_eq!(s.current_tokens, 1_000);

        assert!(matches!(
            extractor.shrink(&mut s),
            Err(ExtractorError::Processing(_))
        ));
    }

    #[test]
    fn test_shrink_stops_at_step_limit() {
        let mut config = ExtractorConfig::default();
        config.tokens_per_minute = 1_000_000;
        config.max_shrink_steps = 2;
        let extractor = extractor(config);

        let mut s = state(10_000);
        extractor.shrink(&mut s).unwrap();
        extractor.shrink(&mut s).unwrap();
        assert!(extractor.shrink(&mut s).is_err());
        assert_eq!(s.shrinks, 2);
    }

    #[test]
    fn test_pre_fit_cuts_to_context_window() {
        let mut config = ExtractorConfig::default();
        config.max_context_tokens = Some(10_000);
        let extractor = extractor(config);

        let mut s = state(50_000);
        extractor.pre_fit(&mut s);
        assert_eq!(
            s.current_tokens,
            10_000 - extractor.prompt_overhead() - CONTEXT_SAFETY_TOKENS
        );
        assert_eq!(s.shrinks, 1);

        let mut small = state(100);
        extractor.pre_fit(&mut small);
        assert_eq!(small.shrinks, 0);
    }
}
