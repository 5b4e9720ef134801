// CompletionClient and HttpCompletionClient repeat the module name
#![allow(clippy::module_name_repetitions)]

use crate::error::{BatchError, BatchResult};
use crate::params::RequestParams;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A single chat-completion round trip
///
/// Workers only see this trait, which lets tests swap the HTTP client for
/// doubles that control latency and payloads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `query` as the user message and return the completion text
    async fn complete(&self, params: &RequestParams, query: &str) -> BatchResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// OpenAI-compatible `/chat/completions` client
///
/// Clone is cheap because `reqwest::Client` keeps its connection pool behind
/// an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct HttpCompletionClient {
    client: reqwest::Client,
}

impl HttpCompletionClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built
    pub fn with_timeout(timeout: Duration) -> BatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BatchError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

/// Join the base URL and the chat-completions path
fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Pull the first choice's text out of a response body
fn parse_completion(body: &str) -> BatchResult<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| BatchError::MalformedResponse(format!("Invalid completion JSON: {e}")))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            BatchError::MalformedResponse("Completion contains no message content".to_string())
        })
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, params: &RequestParams, query: &str) -> BatchResult<String> {
        let (base_url, api_key, model) = params.required()?;

        let url = completions_url(base_url);
        let request = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: query,
            }],
        };

        debug!("POST {} (model {}, {} chars)", url, model, query.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BatchError::Network(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BatchError::Network(format!("Failed to read response from {url}: {e}")))?;

        if !status.is_success() {
            return Err(BatchError::Remote {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(&body)
    }
}
