//! OpenAI-compatible speech-to-text provider (Whisper API shape).
//!
//! Submits one file per call as multipart form data and asks for verbose
//! JSON with segment timestamps. Chunking for oversized files is the
//! transcription engine's job, driven by the limits this provider reports.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use vmem_domain::entities::{SpeechTask, Transcription, TranscriptSegment};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::SpeechProvider;

/// Whisper API upload limit (25 MB).
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Containers the API accepts without re-muxing.
const ACCEPTED_EXTENSIONS: &[&str] = &[".mp3", ".mp4", ".mpeg", ".mpga", ".m4a", ".wav", ".webm"];

#[derive(Debug, Deserialize)]
struct ApiSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<ApiSegment>,
}

/// Whisper-shaped [`SpeechProvider`].
pub struct OpenAiSpeechProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiSpeechProvider {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(600))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl SpeechProvider for OpenAiSpeechProvider {
    async fn transcribe_file(
        &self,
        path: &Path,
        language: Option<&str>,
        task: SpeechTask,
    ) -> Result<Transcription> {
        if self.api_key.is_empty() {
            return Err(Error::transcription(
                "speech provider is not configured (missing API key)",
            ));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::transcription_with_source(format!("read {}", path.display()), e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_owned();

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "segment");
        if let Some(language) = language {
            form = form.text("language", language.to_owned());
        }

        let endpoint = match task {
            SpeechTask::Transcribe => "audio/transcriptions",
            SpeechTask::Translate => "audio/translations",
        };

        debug!(path = %path.display(), endpoint, "submitting audio to speech service");
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::transcription_with_source("speech request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::transcription(format!(
                "speech service returned {status}: {body}"
            )));
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::transcription_with_source("unparseable speech response", e))?;

        let segments = api
            .segments
            .into_iter()
            .map(|s| TranscriptSegment {
                start: s.start,
                end: s.end.max(s.start),
                text: s.text.trim().to_owned(),
                speaker: None,
            })
            .collect();

        Ok(Transcription {
            text: api.text,
            language: api
                .language
                .unwrap_or_else(|| language.unwrap_or("en").to_owned()),
            segments,
        })
    }

    fn max_upload_bytes(&self) -> u64 {
        MAX_UPLOAD_BYTES
    }

    fn accepted_extensions(&self) -> &[&str] {
        ACCEPTED_EXTENSIONS
    }

    fn provider_name(&self) -> &str {
        "openai-whisper"
    }
}
