//! Vision comparison
//!
//! Sends a target image and a generated image to a vision-language provider,
//! parses the scored feedback out of the model prose, and wraps the whole
//! flow behind a never-fails orchestrator.

pub mod client;
pub mod orchestrator;
pub mod parser;
pub mod prompt;

pub use client::{ComparisonClient, ComparisonClientBuilder};
pub use orchestrator::{ComparisonResult, ImageComparator};
pub use parser::{ParsedComparison, parse_comparison};
pub use prompt::build_comparison_prompt;
