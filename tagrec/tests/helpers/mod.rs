//! Shared test doubles for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tagrec::llm::{LlmClient, LlmError, LlmRequest};
use tagrec::{
    Property, PropertyMap, PropertyStore, RecommendationItem, RecommendationList, Recommender,
    RecommenderError,
};

/// Property map with the given tags (frequency 1)
pub fn store_with(tags: &[&str]) -> PropertyMap {
    let mut map = PropertyMap::new();
    for tag in tags {
        map.get_or_insert(tag, 1);
    }
    map
}

/// Build a list from (property, probability) pairs
pub fn list_of(items: &[(&Property, f32)]) -> RecommendationList {
    items
        .iter()
        .map(|(p, prob)| RecommendationItem::new((*p).clone(), *prob))
        .collect()
}

// ============================================================================
// Recommenders
// ============================================================================

/// Answers from a table keyed by the sorted input ids; unknown keys yield an
/// empty list. Counts calls.
#[derive(Default)]
pub struct TableRecommender {
    table: HashMap<Vec<u32>, RecommendationList>,
    pub calls: AtomicUsize,
}

impl TableRecommender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, input: &[&Property], list: RecommendationList) -> Self {
        let mut key: Vec<u32> = input.iter().map(|p| p.id).collect();
        key.sort_unstable();
        self.table.insert(key, list);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Recommender for TableRecommender {
    fn recommend(&self, input: &[Property]) -> Result<RecommendationList, RecommenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut key: Vec<u32> = input.iter().map(|p| p.id).collect();
        key.sort_unstable();
        Ok(self.table.get(&key).cloned().unwrap_or_default())
    }
}

/// Sleeps on every call and records peak concurrency
///
/// Each call returns `per_call` properties unique to the input size, so
/// variants of different sizes never overlap.
pub struct SlowRecommender {
    delay: Duration,
    per_call: usize,
    fail_on_size: Option<usize>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
    pub sizes: Mutex<Vec<usize>>,
}

impl SlowRecommender {
    pub fn new(delay: Duration, per_call: usize) -> Self {
        Self {
            delay,
            per_call,
            fail_on_size: None,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            sizes: Mutex::new(Vec::new()),
        }
    }

    /// Fail every call whose input has exactly `size` properties
    pub fn failing_on_size(mut self, size: usize) -> Self {
        self.fail_on_size = Some(size);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Recommender for SlowRecommender {
    fn recommend(&self, input: &[Property]) -> Result<RecommendationList, RecommenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sizes.lock().unwrap().push(input.len());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on_size == Some(input.len()) {
            return Err(RecommenderError::Internal("induced failure".to_string()));
        }

        let base = 10_000 + input.len() as u32 * 100;
        Ok((0..self.per_call)
            .map(|k| {
                RecommendationItem::new(
                    Property::new(base + k as u32, format!("s{}_{}", input.len(), k), 1),
                    0.9 - k as f32 * 0.01,
                )
            })
            .collect())
    }
}

// ============================================================================
// LLM clients
// ============================================================================

/// Returns a fixed response and records the last request
pub struct ScriptedLlmClient {
    response: String,
    pub last_request: Mutex<Option<LlmRequest>>,
    pub calls: AtomicUsize,
}

impl ScriptedLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            last_request: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_request
            .lock()
            .unwrap()
            .as_ref()
            .map(|r| r.prompt.clone())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        Ok(self.response.clone())
    }
}

/// Always fails
pub struct FailingLlmClient;

#[async_trait]
impl LlmClient for FailingLlmClient {
    async fn complete(&self, _request: LlmRequest) -> Result<String, LlmError> {
        Err(LlmError::RateLimited)
    }
}

/// Never answers
pub struct PendingLlmClient;

#[async_trait]
impl LlmClient for PendingLlmClient {
    async fn complete(&self, _request: LlmRequest) -> Result<String, LlmError> {
        std::future::pending::<Result<String, LlmError>>().await
    }
}

/// Look up tags that must exist in `store`
pub fn props_of(store: &dyn PropertyStore, tags: &[&str]) -> Vec<Property> {
    tags.iter()
        .map(|t| store.lookup(t).unwrap_or_else(|| panic!("unknown tag {}", t)))
        .collect()
}
