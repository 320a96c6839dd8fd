//! LLM re-ranker
//!
//! Asks the language model to pick and order the most relevant candidates,
//! then reconciles the free-text answer against the candidate list and the
//! property store. The result is always a duplicate-free subset of the
//! candidates, model ranking first and candidate order as filler.

use super::prompt::{build_rerank_prompt, parse_tag_lines, PROMPT_SELECT_COUNT};
use super::{LlmClient, LlmRequest};
use crate::store::PropertyStore;
use crate::types::Property;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Maximum number of re-ranked properties returned
pub const RERANK_LIMIT: usize = 10;

/// Number of properties the caller is expected to keep
pub const RERANK_SELECT_COUNT: usize = PROMPT_SELECT_COUNT;

/// Re-ranks candidate tags through a language model
pub struct LlmReranker {
    client: Arc<dyn LlmClient>,
    store: Arc<dyn PropertyStore>,
    model: String,
}

impl LlmReranker {
    pub fn new(client: Arc<dyn LlmClient>, store: Arc<dyn PropertyStore>, model: impl Into<String>) -> Self {
        Self {
            client,
            store,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Re-rank `candidates` for `input_tags`
    ///
    /// Returns at most [`RERANK_LIMIT`] properties, or an empty vector when the
    /// provider fails.
    pub async fn rerank<S, T>(&self, input_tags: &[S], candidates: &[T]) -> Vec<Property>
    where
        S: AsRef<str> + Sync,
        T: AsRef<str> + Sync,
    {
        self.rerank_with_cancel(input_tags, candidates, &CancellationToken::new())
            .await
    }

    /// Like [`LlmReranker::rerank`], but gives up (empty result) once `cancel` fires
    pub async fn rerank_with_cancel<S, T>(
        &self,
        input_tags: &[S],
        candidates: &[T],
        cancel: &CancellationToken,
    ) -> Vec<Property>
    where
        S: AsRef<str> + Sync,
        T: AsRef<str> + Sync,
    {
        let request = LlmRequest {
            model: self.model.clone(),
            prompt: build_rerank_prompt(input_tags, candidates),
        };

        debug!(
            model = %self.model,
            inputs = input_tags.len(),
            candidates = candidates.len(),
            "Requesting LLM re-ranking"
        );

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("LLM re-ranking cancelled");
                return Vec::new();
            }
            response = self.client.complete(request) => response,
        };

        match response {
            Ok(text) => reconcile(&text, candidates, self.store.as_ref()),
            Err(e) => {
                warn!(error = %e, "LLM re-ranking failed, continuing without it");
                Vec::new()
            }
        }
    }
}

/// Map model output onto the candidate list
///
/// Valid model picks come first in the order returned; the remainder is filled
/// from `candidates` in order, up to [`RERANK_LIMIT`].
pub fn reconcile<T: AsRef<str>>(
    response: &str,
    candidates: &[T],
    store: &dyn PropertyStore,
) -> Vec<Property> {
    let allowed: HashSet<&str> = candidates.iter().map(|c| c.as_ref().trim()).collect();
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(RERANK_LIMIT);

    for tag in parse_tag_lines(response) {
        if result.len() >= RERANK_LIMIT {
            break;
        }
        if !allowed.contains(tag.as_str()) {
            debug!(tag = %tag, "Model returned a tag outside the candidates, skipping");
            continue;
        }
        if let Some(property) = store.lookup(&tag) {
            if seen.insert(property.id) {
                result.push(property);
            }
        }
    }

    let ranked = result.len();
    for candidate in candidates {
        if result.len() >= RERANK_LIMIT {
            break;
        }
        if let Some(property) = store.lookup(candidate.as_ref().trim()) {
            if seen.insert(property.id) {
                result.push(property);
            }
        }
    }

    debug!(ranked, padded = result.len() - ranked, "LLM response reconciled");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::store::PropertyMap;
    use async_trait::async_trait;

    struct FixedClient(&'static str);

    #[async_trait]
    impl LlmClient for FixedClient {
        async fn complete(&self, _request: LlmRequest) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct DownClient;

    #[async_trait]
    impl LlmClient for DownClient {
        async fn complete(&self, _request: LlmRequest) -> Result<String, LlmError> {
            Err(LlmError::Network("connection refused".to_string()))
        }
    }

    fn store(tags: &[&str]) -> Arc<PropertyMap> {
        let mut map = PropertyMap::new();
        for tag in tags {
            map.get_or_insert(tag, 1);
        }
        Arc::new(map)
    }

    fn tags(props: &[Property]) -> Vec<&str> {
        props.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn test_reconcile_drops_non_candidates_and_duplicates() {
        let store = store(&["a", "b", "c", "x"]);
        let result = reconcile("c\nx\nc\na", &["a", "b", "c"], store.as_ref());
        assert_eq!(tags(&result), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_reconcile_caps_at_limit() {
        let candidates: Vec<String> = (0..15).map(|i| format!("t{}", i)).collect();
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let store = store(&refs);
        let result = reconcile("", &candidates, store.as_ref());
        assert_eq!(result.len(), RERANK_LIMIT);
        assert_eq!(result[0].as_str(), "t0");
        assert_eq!(result[9].as_str(), "t9");
    }

    #[tokio::test]
    async fn test_rerank_prefers_model_order() {
        let reranker = LlmReranker::new(
            Arc::new(FixedClient("1. b\n2. a")),
            store(&["a", "b", "c"]),
            "test-model",
        );
        let result = reranker.rerank(&["input"], &["a", "b", "c"]).await;
        assert_eq!(tags(&result), vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty() {
        let reranker = LlmReranker::new(Arc::new(DownClient), store(&["a"]), "test-model");
        assert!(reranker.rerank(&["input"], &["a"]).await.is_empty());
    }
}
