//! Integration tests for the Extractor

use crate::{EstimatingTokenCounter, Extractor, ExtractorConfig, ExtractorError, ResponseCache};
use papersift_domain::{ExtractionQuery, LlmError, TokenCounter};
use papersift_llm::MockClient;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const ROW: &str = "\"val1\",\"val2\",\"val3\"";

fn query() -> ExtractionQuery {
    ExtractionQuery::new("Extract a, b and c as one CSV row", ["a", "b", "c"])
}

/// Budget high enough that the ratio step alone decides truncation
fn roomy_config() -> ExtractorConfig {
    ExtractorConfig {
        tokens_per_minute: 1_000_000,
        ..ExtractorConfig::default()
    }
}

fn extractor(client: MockClient, config: ExtractorConfig) -> Extractor<MockClient> {
    Extractor::new(client, ResponseCache::in_memory(), query(), config).unwrap()
}

fn limited_client(limit: usize) -> MockClient {
    MockClient::new(ROW).with_context_limit(limit, Arc::new(EstimatingTokenCounter))
}

#[tokio::test]
async fn test_end_to_end_extraction() {
    let client = MockClient::new("Thinking...\n\"val1\",\"val2\",\"val3\"\n");
    let extractor = extractor(client, ExtractorConfig::default());

    let result = extractor.extract("paper.pdf", "Some document text").await;

    assert!(result.is_success());
    assert_eq!(result.record.filename(), "paper.pdf");
    assert_eq!(result.record.value("a"), Some("val1"));
    assert_eq!(result.record.value("b"), Some("val2"));
    assert_eq!(result.record.value("c"), Some("val3"));
    assert_eq!(result.metadata.llm_calls, 1);
    assert!(!result.metadata.cache_hit);
}

#[tokio::test]
async fn test_identical_documents_call_once() {
    let extractor = extractor(MockClient::new(ROW), ExtractorConfig::default());

    let first = extractor.extract("paper.pdf", "Same text").await;
    let second = extractor.extract("paper.pdf", "Same text").await;

    assert_eq!(extractor.client().call_count(), 1);
    assert_eq!(first.record, second.record);
    assert!(second.metadata.cache_hit);
    assert_eq!(second.metadata.llm_calls, 0);
    assert_eq!(first.metadata.cache_key, second.metadata.cache_key);
}

#[tokio::test]
async fn test_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");

    let first = Extractor::new(
        MockClient::new(ROW),
        ResponseCache::open(&path).unwrap(),
        query(),
        ExtractorConfig::default(),
    )
    .unwrap();
    assert!(first.extract("paper.pdf", "Persisted text").await.is_success());
    assert_eq!(first.client().call_count(), 1);

    let second = Extractor::new(
        MockClient::new(ROW),
        ResponseCache::open(&path).unwrap(),
        query(),
        ExtractorConfig::default(),
    )
    .unwrap();
    let result = second.extract("paper.pdf", "Persisted text").await;
    assert!(result.is_success());
    assert_eq!(second.client().call_count(), 0);
}

#[tokio::test]
async fn test_overflow_shrinks_once() {
    // 200,000 ASCII chars estimate to 50,000 tokens
    let text = "a".repeat(200_000);
    let extractor = extractor(limited_client(40_000), ExtractorConfig::default());

    let result = extractor.extract("big.pdf", &text).await;

    assert!(result.is_success());
    assert_eq!(extractor.client().call_count(), 2);
    assert_eq!(result.metadata.shrinks, 1);
    assert_eq!(result.metadata.initial_tokens, 50_000);
    assert!(result.metadata.final_tokens.unwrap() <= 32_000);

    let calls = extractor.client().calls();
    assert!(text.starts_with(&calls[1]));
    assert!(EstimatingTokenCounter.count(&calls[1]) <= 32_000);
}

#[tokio::test]
async fn test_rerun_of_truncated_document_makes_no_calls() {
    let text = "a".repeat(200_000);
    let extractor = extractor(limited_client(40_000), roomy_config());

    extractor.extract("big.pdf", &text).await;
    assert_eq!(extractor.client().call_count(), 2);

    let rerun = extractor.extract("big.pdf", &text).await;
    assert!(rerun.is_success());
    assert!(rerun.metadata.cache_hit);
    assert_eq!(rerun.metadata.llm_calls, 0);
    assert_eq!(rerun.metadata.final_tokens, None);
    assert_eq!(extractor.client().call_count(), 2);
}

#[tokio::test]
async fn test_truncation_converges() {
    let text = "a".repeat(200_000);
    let extractor = extractor(limited_client(5_000), roomy_config());

    let result = extractor.extract("big.pdf", &text).await;
    assert!(result.is_success());

    let counts: Vec<usize> = extractor
        .client()
        .calls()
        .iter()
        .map(|call| EstimatingTokenCounter.count(call))
        .collect();
    assert!(counts.windows(2).all(|pair| pair[1] < pair[0]));
    assert!(counts.len() <= 21);
    assert!(*counts.last().unwrap() <= 5_000);
}

#[tokio::test]
async fn test_limit_below_floor_fails() {
    let text = "a".repeat(40_000);
    let extractor = extractor(limited_client(500), roomy_config());

    let result = extractor.extract("big.pdf", &text).await;

    assert!(!result.is_success());
    assert!(result.record.error().unwrap().contains("floor"));
    assert!(extractor.client().call_count() <= 21);
    assert_eq!(extractor.cached_responses(), 0);
}

#[tokio::test]
async fn test_service_error_becomes_failure_record() {
    let mut client = MockClient::new(ROW);
    client.add_error("Broken text", LlmError::Service("upstream exploded".to_string()));
    let extractor = extractor(client, ExtractorConfig::default());

    let result = extractor.extract("broken.pdf", "Broken text").await;

    assert!(!result.is_success());
    assert_eq!(result.record.filename(), "broken.pdf");
    assert!(result.record.error().unwrap().contains("upstream exploded"));
    assert_eq!(extractor.client().call_count(), 1);
    assert_eq!(extractor.cached_responses(), 0);
    assert_eq!(extractor.rate_limiter().usage().await, 0);
}

#[tokio::test]
async fn test_parse_failure_keeps_response_cached() {
    let extractor = extractor(
        MockClient::new("I am unable to produce a row."),
        ExtractorConfig::default(),
    );

    let result = extractor.extract("paper.pdf", "Text").await;
    assert!(!result.is_success());
    assert!(result
        .record
        .error()
        .unwrap()
        .starts_with(&ExtractorError::Parse(String::new()).to_string()));
    assert_eq!(extractor.cached_responses(), 1);

    extractor.extract("paper.pdf", "Text").await;
    assert_eq!(extractor.client().call_count(), 1);
}

#[tokio::test]
async fn test_cache_write_failure_keeps_record() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let cache = ResponseCache::open(blocker.join("cache.json")).unwrap();
    let extractor =
        Extractor::new(MockClient::new(ROW), cache, query(), ExtractorConfig::default()).unwrap();

    let result = extractor.extract("paper.pdf", "Text").await;
    assert!(result.is_success());
    assert_eq!(result.record.value("c"), Some("val3"));
}

#[tokio::test]
async fn test_successful_calls_are_charged() {
    let extractor = extractor(MockClient::new(ROW), ExtractorConfig::default());
    extractor.extract("paper.pdf", &"a".repeat(4_000)).await;

    let usage = extractor.rate_limiter().usage().await;
    assert!(usage >= 1_000);
    assert!(usage <= 1_000 + extractor.prompt_overhead() + 1);
}

#[tokio::test(start_paused = true)]
async fn test_budget_delays_next_document() {
    let config = ExtractorConfig {
        tokens_per_minute: 2_000,
        ..ExtractorConfig::default()
    };
    let extractor = extractor(MockClient::new(ROW), config);

    // ~1,000 tokens each; together they exceed the budget
    let first = extractor.extract("one.pdf", &"a".repeat(4_000)).await;
    let second = extractor.extract("two.pdf", &"b".repeat(4_000)).await;

    assert_eq!(first.metadata.rate_limit_wait, Duration::ZERO);
    assert!(second.metadata.rate_limit_wait > Duration::ZERO);
    assert!(second.metadata.rate_limit_wait <= Duration::from_secs(60));
    assert_eq!(extractor.client().call_count(), 2);
}

#[tokio::test]
async fn test_oversized_document_is_pre_fit() {
    let config = ExtractorConfig {
        max_context_tokens: Some(10_000),
        ..roomy_config()
    };
    let extractor = extractor(MockClient::new(ROW), config);

    let result = extractor.extract("huge.pdf", &"a".repeat(100_000)).await;

    assert!(result.is_success());
    assert_eq!(extractor.client().call_count(), 1);
    assert!(result.metadata.was_truncated());
    assert!(result.metadata.final_tokens.unwrap() < 10_000);
}
