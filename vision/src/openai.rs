//! HTTP client for the OpenAI vision endpoint.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{Analyzer, VisionError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f64 = 0.8;

pub struct OpenAiAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiAnalyzer {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn describe(&self, image: &[u8], prompt: &str) -> Result<String, VisionError> {
        let encoded = general_purpose::STANDARD.encode(image);
        let body = json!({
            "model": self.model,
            "temperature": TEMPERATURE,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{encoded}") }
                    }
                ]
            }]
        });
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(VisionError::Api(resp.status().to_string()));
        }
        let completion: Completion = resp.json().await?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(VisionError::Empty)?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(VisionError::Empty);
        }
        info!(reaction = %text, "image analyzed");
        Ok(text)
    }
}
