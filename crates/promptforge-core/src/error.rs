//! Error types for Promptforge

use thiserror::Error;

/// Result type alias using Promptforge's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Promptforge error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check your internet connection.")]
    Network(#[from] reqwest::Error),

    #[error("Image provider error ({status}): {body}")]
    ImageProvider { status: u16, body: String },

    #[error("Unexpected image provider response: {0}")]
    UnexpectedProviderResponse(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    #[error("Comparison provider error ({status}): {body}")]
    ComparisonProvider { status: u16, body: String },

    #[error("The comparison provider timed out at the gateway. Please try again.")]
    GatewayTimeout,

    // Attempt errors (E300-E399)
    #[error("Another attempt is already in flight for this session")]
    AttemptInFlight,

    // Storage errors (E400-E499)
    #[error("Progress storage error: {0}")]
    Storage(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No image API credentials configured")]
    NoCredentials,

    // Input errors (E800-E899)
    #[error("Prompt cannot be empty")]
    EmptyPrompt,
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => "E100",
            Self::ImageProvider { .. } => "E101",
            Self::UnexpectedProviderResponse(_) => "E102",
            Self::ImageLoad(_) => "E103",
            Self::ComparisonProvider { .. } => "E104",
            Self::GatewayTimeout => "E105",
            Self::AttemptInFlight => "E300",
            Self::Storage(_) => "E400",
            Self::Config(_) => "E600",
            Self::NoCredentials => "E601",
            Self::EmptyPrompt => "E800",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Network(_) => Some("Check internet connection".to_string()),
            Self::GatewayTimeout => Some("Try the same prompt again".to_string()),
            Self::NoCredentials => Some(
                "Set PROMPTFORGE_IMAGE_API_KEY_1 (or PROMPTFORGE_IMAGE_API_KEYS)".to_string(),
            ),
            Self::EmptyPrompt => Some("Describe the target image in a few words".to_string()),
            Self::AttemptInFlight => Some("Wait for the current attempt to finish".to_string()),
            _ => None,
        }
    }

    /// Whether a fresh attempt with the same input is worth making
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::ImageProvider { .. }
                | Self::ComparisonProvider { .. }
                | Self::GatewayTimeout
                | Self::ImageLoad(_)
        )
    }
}
