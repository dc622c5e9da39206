//! Image generation client
//!
//! Talks to an OpenAI-compatible image generation endpoint. Each client owns
//! its own credential pool and prompt cache; there is no process-global state,
//! so independent sessions can run with independent pools.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};

use super::pool::CredentialPool;
use super::types::{GeneratedImage, GenerationResponse};

/// Image generation client with credential rotation and prompt caching
pub struct GenerationClient {
    http_client: HttpClient,
    config: GenerationConfig,
    credentials: CredentialPool,
    /// normalized prompt -> generated image; never evicted (the number of
    /// distinct prompts in one session is small)
    cache: Mutex<HashMap<String, GeneratedImage>>,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("endpoint", &self.config.endpoint)
            .field("model", &self.config.model)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Cache contents summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub prompts: Vec<String>,
}

/// Builder for GenerationClient
pub struct GenerationClientBuilder {
    config: Option<GenerationConfig>,
    credentials: Option<CredentialPool>,
    timeout_secs: Option<u64>,
}

impl Default for GenerationClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            credentials: None,
            timeout_secs: None,
        }
    }

    /// Set the generation configuration
    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credential pool
    pub fn credentials(mut self, pool: CredentialPool) -> Self {
        self.credentials = Some(pool);
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the GenerationClient
    pub fn build(self) -> Result<GenerationClient> {
        let config = self.config.unwrap_or_default();
        let credentials = self.credentials.unwrap_or_else(CredentialPool::from_env);

        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(config.timeout_secs));

        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(GenerationClient {
            http_client,
            config,
            credentials,
            cache: Mutex::new(HashMap::new()),
        })
    }
}

impl GenerationClient {
    /// Create a client with the given configuration and credential pool
    pub fn new(config: GenerationConfig, credentials: CredentialPool) -> Result<Self> {
        GenerationClientBuilder::new()
            .config(config)
            .credentials(credentials)
            .build()
    }

    /// Create a new builder
    pub fn builder() -> GenerationClientBuilder {
        GenerationClientBuilder::new()
    }

    /// Generate an image from a text prompt.
    ///
    /// Repeated prompts (case-insensitive) are served from the cache without
    /// a network call and without advancing the credential cursor. A cache
    /// miss rotates to the next credential before the request is made; the
    /// cursor advances even if the request then fails. Failed generations are
    /// never cached, and there is no retry at this layer.
    pub async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptyPrompt);
        }

        // Cache key only; the request keeps the original casing
        let cache_key = trimmed.to_lowercase();

        if let Some(cached) = self.cache_lookup(&cache_key) {
            debug!(prompt = %trimmed, url = %cached.url, "Prompt cache hit");
            return Ok(cached);
        }

        if self.credentials.is_empty() {
            return Err(Error::NoCredentials);
        }
        let api_key = self.credentials.next()?;

        let request_prompt = match self.config.literal_suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => format!("{}{}", trimmed, suffix),
            _ => trimmed.to_string(),
        };

        let body = json!({
            "prompt": request_prompt,
            "model": self.config.model,
            "n": 1,
            "size": "auto",
            "quality": "auto",
            "output_format": self.config.output_format,
        });

        debug!(model = %self.config.model, "Sending image generation request");

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await
            .map_err(Error::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Image generation request failed");
            return Err(Error::ImageProvider {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerationResponse = response.json().await.map_err(|e| {
            Error::UnexpectedProviderResponse(format!("failed to parse response: {}", e))
        })?;

        let url = payload.into_url().ok_or_else(|| {
            Error::UnexpectedProviderResponse("no image URL in response".to_string())
        })?;

        let image = GeneratedImage::new(url);
        self.cache_insert(cache_key, image.clone());

        info!(url = %image.url, "Image generated");
        Ok(image)
    }

    /// Summary of the prompt cache
    pub fn cache_stats(&self) -> CacheStats {
        match self.cache.lock() {
            Ok(cache) => CacheStats {
                size: cache.len(),
                prompts: cache.keys().cloned().collect(),
            },
            Err(_) => CacheStats {
                size: 0,
                prompts: Vec::new(),
            },
        }
    }

    /// Drop all cached prompt -> image entries. Returns how many were dropped.
    pub fn clear_cache(&self) -> usize {
        if let Ok(mut cache) = self.cache.lock() {
            let size = cache.len();
            cache.clear();
            debug!(dropped = size, "Cleared prompt cache");
            size
        } else {
            0
        }
    }

    /// Number of credentials in the pool
    pub fn credential_count(&self) -> usize {
        self.credentials.len()
    }

    /// Current rotation cursor position (observable for cache-hit checks)
    pub fn rotation_position(&self) -> usize {
        self.credentials.position()
    }

    fn cache_lookup(&self, key: &str) -> Option<GeneratedImage> {
        self.cache.lock().ok().and_then(|cache| cache.get(key).cloned())
    }

    fn cache_insert(&self, key: String, image: GeneratedImage) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, image);
        }
    }

    #[cfg(test)]
    fn seed_cache(&self, prompt: &str, url: &str) {
        self.cache_insert(
            prompt.trim().to_lowercase(),
            GeneratedImage::new(url.to_string()),
        );
    }
}
