//! Integration tests for LLM re-ranking

mod helpers;

use helpers::{store_with, FailingLlmClient, PendingLlmClient, ScriptedLlmClient};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tagrec::llm::{LlmReranker, RERANK_LIMIT};
use tokio_util::sync::CancellationToken;

fn candidates() -> Vec<String> {
    (0..12).map(|i| format!("c{:02}", i)).collect()
}

fn reranker_with(client: Arc<dyn tagrec::llm::LlmClient>) -> LlmReranker {
    let names = candidates();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    LlmReranker::new(client, Arc::new(store_with(&refs)), "gpt-3.5-turbo")
}

fn tags(result: &[tagrec::Property]) -> Vec<&str> {
    result.iter().map(|p| p.as_str()).collect()
}

#[tokio::test]
async fn test_model_picks_first_then_candidate_padding() {
    // 5 valid candidates (one repeated) plus 2 tags the candidates do not contain
    let response = "1. c07\n2. c03\n3. made_up\n4. c11\n- c03\n5. c00\n6. `c05`\n7. other_thing";
    let reranker = reranker_with(Arc::new(ScriptedLlmClient::new(response)));

    let result = reranker.rerank(&["amenity=restaurant"], &candidates()).await;

    assert_eq!(result.len(), RERANK_LIMIT);
    assert_eq!(
        tags(&result),
        vec!["c07", "c03", "c11", "c00", "c05", "c01", "c02", "c04", "c06", "c08"]
    );
}

#[tokio::test]
async fn test_output_is_duplicate_free_subset() {
    let response = "c01\nc01\nc01\nc02";
    let reranker = reranker_with(Arc::new(ScriptedLlmClient::new(response)));

    let result = reranker.rerank(&["x"], &candidates()).await;

    let ids: HashSet<u32> = result.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), result.len());
    let allowed: HashSet<String> = candidates().into_iter().collect();
    assert!(result.iter().all(|p| allowed.contains(p.as_str())));
}

#[tokio::test]
async fn test_zero_valid_tags_yields_first_candidates() {
    let reranker = reranker_with(Arc::new(ScriptedLlmClient::new(
        "I am sorry, I cannot help with that.",
    )));

    let result = reranker.rerank(&["x"], &candidates()).await;

    let expected: Vec<String> = candidates().into_iter().take(RERANK_LIMIT).collect();
    assert_eq!(tags(&result), expected);
}

#[tokio::test]
async fn test_candidates_unknown_to_store_are_skipped() {
    let reranker = reranker_with(Arc::new(ScriptedLlmClient::new("ghost\nc04")));

    let result = reranker
        .rerank(&["x"], &["ghost", "c04", "c09", "phantom"])
        .await;

    assert_eq!(tags(&result), vec!["c04", "c09"]);
}

#[tokio::test]
async fn test_provider_failure_yields_empty() {
    let reranker = reranker_with(Arc::new(FailingLlmClient));
    assert!(reranker.rerank(&["x"], &candidates()).await.is_empty());
}

#[tokio::test]
async fn test_cancellation_yields_empty() {
    let reranker = reranker_with(Arc::new(PendingLlmClient));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        reranker.rerank_with_cancel(&["x"], &candidates(), &cancel),
    )
    .await
    .expect("cancellation must end the request");
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_prompt_carries_inputs_and_candidates() {
    let client = Arc::new(ScriptedLlmClient::new(""));
    let reranker = reranker_with(client.clone());

    reranker
        .rerank(&["amenity=restaurant", "La Thai"], &["c00", "c01"])
        .await;

    let prompt = client.last_prompt().unwrap();
    assert!(prompt.contains("amenity=restaurant, La Thai"));
    assert!(prompt.contains("c00, c01"));
    assert!(prompt.contains("8"));
    let request = client.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request.model, "gpt-3.5-turbo");
}
