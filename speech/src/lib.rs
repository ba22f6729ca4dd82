//! Turning a reaction line into audible speech.
//!
//! [`Synthesizer`] persists synthesized audio to the canonical audio path;
//! [`Player`] plays it back. Both are collaborator seams: the production
//! implementations are a Replicate TTS client and a subprocess player, the
//! tests substitute recorders.

use async_trait::async_trait;
use mood::VoiceProfile;
use std::path::Path;
use thiserror::Error;

mod player;
mod replicate;

pub use player::CommandPlayer;
pub use replicate::ReplicateSynthesizer;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("synthesis service returned {0}")]
    Api(String),
    #[error("prediction finished without output")]
    NoOutput,
    #[error("player {0} failed: {1}")]
    Player(String, String),
    #[error("no audio player available")]
    NoPlayer,
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with the given voice and persist the audio at `out`.
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        out: &Path,
    ) -> Result<(), SpeechError>;
}

#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), SpeechError>;
}
