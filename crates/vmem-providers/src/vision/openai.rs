//! OpenAI-compatible vision captioning provider.
//!
//! One frame per call, sent as a base64 data URL with the low-detail flag
//! (good enough for scene description, far cheaper).

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::VisionProvider;

/// Chat-completions-shaped [`VisionProvider`].
pub struct OpenAiVisionProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiVisionProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiVisionProvider {
    async fn describe_frame(&self, jpeg: &[u8], prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::vision(
                "vision provider is not configured (missing API key)",
            ));
        }

        let data_url = format!(
            "data:image/jpeg;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(jpeg)
        );

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt},
                    {"type": "image_url", "image_url": {"url": data_url, "detail": "low"}}
                ]
            }],
            "max_tokens": 150,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::vision(format!("vision request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vision(format!(
                "vision service returned {status}: {body}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::vision(format!("unparseable vision response: {e}")))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_owned())
            .ok_or_else(|| Error::vision("vision response had no content"))
    }

    fn provider_name(&self) -> &str {
        "openai-vision"
    }
}
