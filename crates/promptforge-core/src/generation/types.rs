//! Generation request/response types

use serde::{Deserialize, Serialize};

/// Opaque reference to a generated raster image.
///
/// The image itself is a remote resource; locally this is only a URL handle.
/// Once created it is read-only and lives in the client's cache for the life
/// of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}

impl GeneratedImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Provider response adapter.
///
/// Known providers disagree on where the image URL lives: an OpenAI-style
/// `data[0].url` array, a flat `url`, or a flat `image_url`. One struct
/// absorbs all three shapes; `into_url` is the single normalization step.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerationResponse {
    data: Option<Vec<GenerationEntry>>,
    url: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerationEntry {
    url: Option<String>,
}

impl GenerationResponse {
    pub(crate) fn into_url(self) -> Option<String> {
        self.data
            .and_then(|entries| entries.into_iter().next())
            .and_then(|entry| entry.url)
            .or(self.url)
            .or(self.image_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_style_shape() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"data":[{"url":"https://img.example/a.webp"}]}"#).unwrap();
        assert_eq!(
            response.into_url().as_deref(),
            Some("https://img.example/a.webp")
        );
    }

    #[test]
    fn test_flat_url_shape() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"url":"https://img.example/b.webp"}"#).unwrap();
        assert_eq!(
            response.into_url().as_deref(),
            Some("https://img.example/b.webp")
        );
    }

    #[test]
    fn test_image_url_shape() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"image_url":"https://img.example/c.webp"}"#).unwrap();
        assert_eq!(
            response.into_url().as_deref(),
            Some("https://img.example/c.webp")
        );
    }

    #[test]
    fn test_data_wins_over_flat_fields() {
        let response: GenerationResponse = serde_json::from_str(
            r#"{"data":[{"url":"https://img.example/first.webp"}],"url":"https://img.example/second.webp"}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_url().as_deref(),
            Some("https://img.example/first.webp")
        );
    }

    #[test]
    fn test_no_url_anywhere() {
        let response: GenerationResponse =
            serde_json::from_str(r#"{"data":[{}],"created":123}"#).unwrap();
        assert!(response.into_url().is_none());
    }
}
