//! OpenAI-compatible chat completions client

use super::{LlmClient, LlmError, LlmRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tagrec_common::config::{is_valid_key, LlmConfig};

const USER_AGENT: &str = concat!("tagrec/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP LLM client
pub struct HttpLlmClient {
    http_client: reqwest::Client,
    endpoint: String,
    auth_header: HeaderValue,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self, LlmError> {
        if !is_valid_key(api_key) {
            return Err(LlmError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let mut auth_header = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| LlmError::Unauthorized)?;
        auth_header.set_sensitive(true);

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            auth_header,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
        };

        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.auth_header.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(LlmError::Unauthorized);
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(status.as_u16(), error_text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::EmptyResponse("no choices in completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_api_key_rejected() {
        let result = HttpLlmClient::new(&LlmConfig::default(), "  ");
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_client_uses_configured_endpoint() {
        let config = LlmConfig {
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ..LlmConfig::default()
        };
        let client = HttpLlmClient::new(&config, "sk-test").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/v1/chat/completions");
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [{ "role": "user", "content": "hello" }]
            })
        );
    }
}
