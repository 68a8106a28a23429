//! Speaker diarization over an external HTTP service.
//!
//! Diarization models are heavyweight and GPU-hungry; deployments that
//! want speaker labels run a sidecar service and point
//! `VMEM_MEDIA__DIARIZATION_URL` at it. The service takes an audio upload
//! and returns speaker turns as JSON.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use vmem_domain::entities::SpeakerTurn;
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::SpeakerLabeler;

#[derive(Debug, Deserialize)]
struct ApiTurn {
    start: f64,
    end: f64,
    speaker: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    segments: Vec<ApiTurn>,
}

/// HTTP-sidecar-backed [`SpeakerLabeler`].
pub struct HttpSpeakerLabeler {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpeakerLabeler {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl SpeakerLabeler for HttpSpeakerLabeler {
    async fn diarize(&self, audio_path: &Path) -> Result<Vec<SpeakerTurn>> {
        let bytes = tokio::fs::read(audio_path).await.map_err(|e| {
            Error::media_with_source(format!("read {}", audio_path.display()), e)
        })?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_owned();

        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::network_with_source("diarization request failed", e))?;

        if !response.status().is_success() {
            return Err(Error::network(format!(
                "diarization service returned {}",
                response.status()
            )));
        }

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::network_with_source("unparseable diarization response", e))?;

        let turns: Vec<SpeakerTurn> = api
            .segments
            .into_iter()
            .map(|t| SpeakerTurn {
                start: t.start,
                end: t.end.max(t.start),
                speaker: t.speaker,
            })
            .collect();
        debug!(turns = turns.len(), "diarization complete");
        Ok(turns)
    }

    fn provider_name(&self) -> &str {
        "http-diarization"
    }
}
