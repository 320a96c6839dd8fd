//! Workflow procedures

use crate::backoff::BackoffStrategy;
use crate::instance::Instance;
use crate::llm::{LlmReranker, RERANK_SELECT_COUNT};
use crate::types::{RecommendationItem, RecommendationList};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Number of direct recommendations handed to the re-ranker
pub const RERANK_CANDIDATE_COUNT: usize = 30;

/// Procedure failure
#[derive(Debug, Error)]
pub enum ProcedureError {
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Computation producing a ranked recommendation list
#[async_trait]
pub trait Procedure: Send + Sync {
    async fn execute(&self, ctx: &Instance) -> Result<RecommendationList, ProcedureError>;
}

/// Direct recommendations for the full input (reuses the context's cache)
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectProcedure;

#[async_trait]
impl Procedure for DirectProcedure {
    async fn execute(&self, ctx: &Instance) -> Result<RecommendationList, ProcedureError> {
        Ok(ctx.calc_recommendations().clone())
    }
}

/// Direct recommendations truncated to `n`
#[derive(Debug, Clone, Copy)]
pub struct TopNProcedure {
    pub n: usize,
}

impl TopNProcedure {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

#[async_trait]
impl Procedure for TopNProcedure {
    async fn execute(&self, ctx: &Instance) -> Result<RecommendationList, ProcedureError> {
        Ok(ctx.calc_recommendations().top(self.n))
    }
}

/// Runs a backoff strategy over the context's input
pub struct BackoffProcedure<S: BackoffStrategy> {
    strategy: S,
}

impl<S: BackoffStrategy> BackoffProcedure<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }
}

#[async_trait]
impl<S: BackoffStrategy> Procedure for BackoffProcedure<S> {
    async fn execute(&self, ctx: &Instance) -> Result<RecommendationList, ProcedureError> {
        debug!(
            request_id = %ctx.request_id,
            strategy = self.strategy.name(),
            "Running backoff procedure"
        );
        Ok(self.strategy.recommend(ctx.props()).await)
    }
}

/// Direct candidates re-ranked by a language model
///
/// Re-ranked items keep their direct probability. When re-ranking produces
/// nothing the un-reranked candidates are returned instead.
pub struct LlmRerankProcedure {
    reranker: Arc<LlmReranker>,
    candidate_count: usize,
    select_count: usize,
    cancel: CancellationToken,
}

impl LlmRerankProcedure {
    pub fn new(reranker: Arc<LlmReranker>) -> Self {
        Self {
            reranker,
            candidate_count: RERANK_CANDIDATE_COUNT,
            select_count: RERANK_SELECT_COUNT,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight re-ranking when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[async_trait]
impl Procedure for LlmRerankProcedure {
    async fn execute(&self, ctx: &Instance) -> Result<RecommendationList, ProcedureError> {
        let candidates = ctx.calc_recommendations().top(self.candidate_count);
        if candidates.is_empty() {
            debug!(request_id = %ctx.request_id, "No candidates to re-rank");
            return Ok(candidates);
        }

        let input_tags = ctx.tags();
        let candidate_tags = candidates.tags();
        let reranked = self
            .reranker
            .rerank_with_cancel(&input_tags, &candidate_tags, &self.cancel)
            .await;

        if reranked.is_empty() {
            warn!(
                request_id = %ctx.request_id,
                candidates = candidates.len(),
                "Re-ranking unavailable, using direct order"
            );
            return Ok(candidates.top(self.select_count));
        }

        let mut list: RecommendationList = reranked
            .into_iter()
            .map(|property| {
                let probability = candidates.probability_of(&property).unwrap_or(0.0);
                RecommendationItem::new(property, probability)
            })
            .collect();
        list.truncate(self.select_count);
        Ok(list)
    }
}
