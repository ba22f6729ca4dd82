//! Replicate client for the minimax speech model.

use async_trait::async_trait;
use mood::VoiceProfile;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

use crate::{SpeechError, Synthesizer};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
const DEFAULT_MODEL: &str = "minimax/speech-02-turbo";

pub struct ReplicateSynthesizer {
    client: Client,
    base_url: String,
    token: String,
    model: String,
}

impl ReplicateSynthesizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct Prediction {
    output: Option<serde_json::Value>,
    error: Option<String>,
}

impl Prediction {
    /// The output is a URL string, or occasionally a one-element array of
    /// URL strings depending on the model version.
    fn output_url(self) -> Option<String> {
        match self.output? {
            serde_json::Value::String(url) => Some(url),
            serde_json::Value::Array(items) => items
                .into_iter()
                .find_map(|v| v.as_str().map(|s| s.to_string())),
            _ => None,
        }
    }
}

#[async_trait]
impl Synthesizer for ReplicateSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice: &VoiceProfile,
        out: &Path,
    ) -> Result<(), SpeechError> {
        let body = json!({
            "input": {
                "text": text,
                "pitch": voice.pitch,
                "speed": voice.speed,
                "volume": 1,
                "bitrate": 128_000,
                "channel": "mono",
                "emotion": voice.emotion,
                "voice_id": voice.voice_id,
                "sample_rate": 32_000,
                "audio_format": "mp3",
                "language_boost": "German",
                "subtitle_enable": false,
                "english_normalization": true
            }
        });
        debug!(voice = voice.voice_id, "requesting synthesis");
        let resp = self
            .client
            .post(format!(
                "{}/models/{}/predictions",
                self.base_url, self.model
            ))
            .bearer_auth(&self.token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SpeechError::Api(resp.status().to_string()));
        }
        let prediction: Prediction = resp.json().await?;
        if let Some(error) = prediction.error.as_deref() {
            if !error.is_empty() {
                return Err(SpeechError::Api(error.to_string()));
            }
        }
        let url = prediction.output_url().ok_or(SpeechError::NoOutput)?;
        let audio = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(out, &audio).await?;
        info!(bytes = audio.len(), path = %out.display(), "audio synthesized");
        Ok(())
    }
}
