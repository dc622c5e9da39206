//! Image generation
//!
//! Client for the image generation provider, with round-robin credential
//! rotation and a per-prompt memoization cache.

pub mod client;
pub mod pool;
pub mod types;

pub use client::{CacheStats, GenerationClient, GenerationClientBuilder};
pub use pool::CredentialPool;
pub use types::GeneratedImage;
