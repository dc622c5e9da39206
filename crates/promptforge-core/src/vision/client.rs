//! Vision comparison client
//!
//! Sends one user turn containing the instruction block and two inline
//! base64 JPEG images to an OpenAI-compatible chat completions endpoint,
//! and returns the raw model text.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ComparisonConfig;
use crate::error::{Error, Result};

use super::prompt::build_comparison_prompt;

/// Vision comparison client
#[derive(Clone)]
pub struct ComparisonClient {
    http_client: HttpClient,
    config: ComparisonConfig,
    api_key: String,
}

impl std::fmt::Debug for ComparisonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComparisonClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .finish()
    }
}

/// Builder for ComparisonClient
pub struct ComparisonClientBuilder {
    config: Option<ComparisonConfig>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl Default for ComparisonClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            api_key: None,
            timeout_secs: None,
        }
    }

    /// Set the comparison configuration
    pub fn config(mut self, config: ComparisonConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the ComparisonClient
    pub fn build(self) -> Result<ComparisonClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self.api_key.ok_or_else(|| {
            Error::Config(
                "Vision API key is required. Set PROMPTFORGE_VISION_API_KEY.".to_string(),
            )
        })?;

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(config.timeout_secs));

        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(ComparisonClient {
            http_client,
            config,
            api_key,
        })
    }
}

impl ComparisonClient {
    /// Create a client with the given configuration and API key
    pub fn new(config: ComparisonConfig, api_key: impl Into<String>) -> Result<Self> {
        ComparisonClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    /// Create a new builder
    pub fn builder() -> ComparisonClientBuilder {
        ComparisonClientBuilder::new()
    }

    /// Compare two normalized images, returning the raw model text.
    ///
    /// `target_b64` and `generated_b64` are bare base64 JPEG payloads as
    /// produced by the normalizer. An HTTP 504 from the provider's gateway is
    /// surfaced as `GatewayTimeout` so the caller can show a distinct
    /// "please try again" message.
    pub async fn compare(
        &self,
        target_b64: &str,
        generated_b64: &str,
        prompt_text: &str,
    ) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": build_comparison_prompt(prompt_text)
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{}", target_b64)
                        }
                    },
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": format!("data:image/jpeg;base64,{}", generated_b64)
                        }
                    }
                ]
            }],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false
        });

        debug!(model = %self.config.model, "Sending image comparison request");

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Error::Network)?;

        let status = response.status();

        if status.as_u16() == 504 {
            warn!("Comparison provider gateway timeout");
            return Err(Error::GatewayTimeout);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Image comparison request failed");
            return Err(Error::ComparisonProvider {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ChatCompletionResponse = response.json().await.map_err(|e| {
            Error::ComparisonProvider {
                status: status.as_u16(),
                body: format!("failed to parse response: {}", e),
            }
        })?;

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::ComparisonProvider {
                status: status.as_u16(),
                body: "no content in response".to_string(),
            })?;

        debug!(chars = content.len(), "Received comparison response");
        Ok(content)
    }
}

/// Chat completion response structure
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
