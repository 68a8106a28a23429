//! OpenAI-compatible chat provider for extraction and translation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::ChatProvider;

/// Chat-completions-shaped [`ChatProvider`].
pub struct OpenAiChatProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiChatProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(180))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    async fn chat(&self, prompt: &str, json_mode: bool) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(Error::extraction(
                "chat provider is not configured (missing API key)",
            ));
        }

        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_tokens": 16000,
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::extraction(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::extraction(format!(
                "chat service returned {status}: {body}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::extraction(format!("unparseable chat response: {e}")))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| Error::extraction("chat response had no content"))
    }
}

#[async_trait]
impl ChatProvider for OpenAiChatProvider {
    async fn chat_json(&self, prompt: &str) -> Result<String> {
        self.chat(prompt, true).await
    }

    async fn chat_text(&self, prompt: &str) -> Result<String> {
        self.chat(prompt, false).await
    }

    fn provider_name(&self) -> &str {
        "openai-chat"
    }
}
