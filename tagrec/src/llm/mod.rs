//! LLM integration
//!
//! The language model is an untrusted oracle: its output is free text that is
//! parsed line by line and reconciled against the closed tag vocabulary.
//! Provider failures never fail a request; they degrade to "no re-ranking".

pub mod http_client;
pub mod prompt;
pub mod reranker;

pub use http_client::HttpLlmClient;
pub use prompt::{build_rerank_prompt, parse_tag_lines};
pub use reranker::{LlmReranker, RERANK_LIMIT, RERANK_SELECT_COUNT};

use async_trait::async_trait;
use thiserror::Error;

/// Single-turn completion request (one user message, no system message)
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub prompt: String,
}

/// LLM client trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError>;
}

/// LLM client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API key")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API key")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),
}
