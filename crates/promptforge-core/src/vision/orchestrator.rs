//! Comparison orchestration
//!
//! Composes the normalizer, the comparison client, and the parser into one
//! call with a never-fails contract: the caller always gets a renderable
//! result, so no spinner can hang on an uncaught comparison error.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::normalize::ImageNormalizer;

use super::client::ComparisonClient;
use super::parser::parse_comparison;

/// Outcome of one comparison attempt.
///
/// When `error` is set the comparison failed and `score` is zero; the
/// progression layer treats that uniformly with a legitimately low score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub score: u8,
    pub feedback: String,
    pub improvements: String,
    pub raw_text: String,
    pub error: Option<String>,
}

impl ComparisonResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn from_error(message: String) -> Self {
        Self {
            score: 0,
            feedback: String::new(),
            improvements: String::new(),
            raw_text: String::new(),
            error: Some(message),
        }
    }
}

/// Never-fails comparison pipeline: normalize both images, call the provider,
/// parse the feedback
pub struct ImageComparator {
    normalizer: ImageNormalizer,
    client: ComparisonClient,
}

impl std::fmt::Debug for ImageComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageComparator")
            .field("client", &self.client)
            .finish()
    }
}

impl ImageComparator {
    pub fn new(normalizer: ImageNormalizer, client: ComparisonClient) -> Self {
        Self { normalizer, client }
    }

    /// Compare a target image against a generated image.
    ///
    /// Never returns an error: normalization failures, network failures,
    /// gateway timeouts, and empty responses all collapse into a zero-score
    /// result carrying the failure message.
    pub async fn compare_with_feedback(
        &self,
        target_source: &str,
        generated_source: &str,
        prompt_text: &str,
    ) -> ComparisonResult {
        match self
            .try_compare(target_source, generated_source, prompt_text)
            .await
        {
            Ok(result) => {
                info!(score = result.score, "Image comparison complete");
                result
            }
            Err(e) => {
                warn!(error = %e, "Image comparison failed");
                ComparisonResult::from_error(e.to_string())
            }
        }
    }

    async fn try_compare(
        &self,
        target_source: &str,
        generated_source: &str,
        prompt_text: &str,
    ) -> Result<ComparisonResult> {
        // The two normalizations are independent; both must finish before the
        // remote call is issued.
        let (target_b64, generated_b64) = tokio::try_join!(
            self.normalizer.normalize(target_source),
            self.normalizer.normalize(generated_source),
        )?;

        let raw_text = self
            .client
            .compare(&target_b64, &generated_b64, prompt_text)
            .await?;

        let parsed = parse_comparison(&raw_text);

        Ok(ComparisonResult {
            score: parsed.score.unwrap_or(0),
            feedback: parsed.differences,
            improvements: parsed.improvements,
            raw_text,
            error: None,
        })
    }
}
