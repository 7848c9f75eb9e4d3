//! HTTP translation client with retry logic

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::config::ClientConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{ErrorResponse, TranslateRequest, TranslateResponse};
use crate::core::port::TranslationPort;
use crate::core::retry::RetryPolicy;

/// Client for the DeepL translate endpoint
#[derive(Debug, Clone)]
pub struct DeepLClient {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
    retry: RetryPolicy,
}

impl DeepLClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        let retry = config.retry_policy();

        Ok(Self {
            client,
            config: Arc::new(config),
            retry,
        })
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::new(config)
    }

    /// Endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.config.api_endpoint
    }

    /// Send one request and classify the outcome
    async fn send_request(&self, request: &TranslateRequest, attempt: u32) -> Result<Vec<String>> {
        debug!(
            "Sending translate request (attempt {}, {} texts, target {}) to {}",
            attempt,
            request.text.len(),
            request.target_lang,
            self.config.api_endpoint
        );

        let response = self
            .client
            .post(&self.config.api_endpoint)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::TimeoutError
                } else {
                    TranslationError::NetworkError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::OK {
            let body: TranslateResponse = response
                .json()
                .await
                .map_err(|e| TranslationError::InvalidResponseError {
                    message: format!("failed to decode successful response: {}", e),
                })?;

            return Ok(body.translations.into_iter().map(|t| t.text).collect());
        }

        let status_code = status.as_u16();
        let error_text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                debug!("Failed to read error body for status {}: {}", status, e);
                String::new()
            }
        };
        debug!("Received error response {}: {}", status, error_text);

        let message = serde_json::from_str::<ErrorResponse>(&error_text)
            .ok()
            .map(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.to_string());

        Err(TranslationError::from_status(status_code, message))
    }
}

#[async_trait]
impl TranslationPort for DeepLClient {
    async fn translate(&self, texts: &[String], target_lang: &str) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = TranslateRequest::new(texts.to_vec(), target_lang);
        self.retry
            .run(|attempt| self.send_request(&request, attempt))
            .await
    }
}
