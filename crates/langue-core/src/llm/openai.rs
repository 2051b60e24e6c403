use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{ChatMessage, ChatModel};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// HTTP client for OpenAI-compatible APIs.
/// Works with: Groq, OpenAI, llama.cpp server, Ollama, DeepSeek, etc.
pub struct OpenAiClient {
    client: Client,
    /// Base URL for the API (e.g., "https://api.groq.com/openai/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Number of attempts per request
    pub retry_count: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::ConfigLoad(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            retry_count: config.retry_count.max(1),
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POST a JSON body, retrying transient failures.
    ///
    /// Returns the first successful response; the caller reads the body.
    pub async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<Response> {
        let url = self.url(path);
        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            let mut req = self.client.post(&url).json(body);
            if let Some(ref key) = self.api_key {
                req = req.bearer_auth(key);
            }

            match req.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) if response.status().as_u16() == 429 => {
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse().ok());

                    warn!("Rate limited, retry after {:?}s", retry_after);
                    last_error = Some(Error::ServiceRateLimited { retry_after });

                    if attempt + 1 < self.retry_count {
                        let wait_time = retry_after.unwrap_or(5) * 1000;
                        tokio::time::sleep(Duration::from_millis(wait_time)).await;
                    }
                    continue;
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!("API error: {} - {}", status, body);
                    let err = Error::ServiceRequest(format!("HTTP {status}: {body}"));
                    // Client errors other than 429 will not improve on retry
                    if status.is_client_error() {
                        return Err(err);
                    }
                    last_error = Some(err);
                }
                Err(e) => {
                    warn!("Request failed: {}", e);
                    last_error = Some(if e.is_timeout() {
                        Error::ServiceTimeout
                    } else {
                        Error::ServiceRequest(e.to_string())
                    });
                }
            }

            if attempt + 1 < self.retry_count {
                tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
            }
        }

        error!("Request to {} failed after {} attempts", url, self.retry_count);
        Err(last_error.unwrap_or(Error::ServiceMaxRetriesExceeded))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `ChatModel` backed by `/chat/completions`
pub struct OpenAiChat {
    client: Arc<OpenAiClient>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiChat {
    pub fn new(client: Arc<OpenAiClient>, model: impl Into<String>, temperature: Option<f32>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let response = self.client.post_json("chat/completions", &request).await?;
        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::ServiceInvalidResponse(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::ServiceInvalidResponse("No choices in response".to_string()))
    }
}
