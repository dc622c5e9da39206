//! Promptforge Core Library
//!
//! This crate provides the core pipeline for Promptforge, including:
//! - Image generation client (credential rotation, prompt caching)
//! - Image normalization (resize, flatten, recompress for transport)
//! - Vision comparison (scoring, feedback parsing, never-fails orchestration)
//! - Level progression (thresholds, unlocking, game completion)
//! - Game session composition and attempt event stream

pub mod config;
pub mod error;
pub mod generation;
pub mod normalize;
pub mod progress;
pub mod session;
pub mod vision;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::generation::{GeneratedImage, GenerationClient};
    pub use crate::normalize::ImageNormalizer;
    pub use crate::progress::{LevelProgress, ProgressionEngine, ScoreOutcome};
    pub use crate::session::{AttemptReport, GameSession, LevelCatalog};
    pub use crate::vision::{ComparisonClient, ComparisonResult, ImageComparator};
}
