//! Mood-flavored one-line reactions to a captured photo.
//!
//! The pipeline talks to the analysis collaborator through the [`Analyzer`]
//! trait; [`OpenAiAnalyzer`] is the production implementation. When analysis
//! fails for any reason the pipeline substitutes [`FALLBACK_REACTION`] and
//! keeps going.

use async_trait::async_trait;
use thiserror::Error;

mod openai;

pub use openai::OpenAiAnalyzer;

/// Fixed reaction used whenever analysis fails.
pub const FALLBACK_REACTION: &str = "Es gab einen Fehler bei der Bildanalyse.";

#[derive(Debug, Error)]
pub enum VisionError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("analysis service returned {0}")]
    Api(String),
    #[error("empty analysis response")]
    Empty,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Produce a single short reaction to `image` guided by `prompt`.
    async fn describe(&self, image: &[u8], prompt: &str) -> Result<String, VisionError>;
}
