//! Transcription engine: drives the speech service and works around its
//! upload limit.
//!
//! Strategy, in order: submit directly when the file is an accepted format
//! under the limit; otherwise strip to an audio-only track (stream copy
//! first, re-encode on failure); if still over the limit, split into
//! equal-duration chunks each below 90% of the limit and stitch the
//! segments back together with chunk-offset correction.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use vmem_domain::constants::media::SPEECH_CHUNK_SAFETY;
use vmem_domain::entities::{SpeechTask, Transcription, TranscriptSegment};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{MediaToolkit, SpeechProvider};

/// Chunk-aware transcription over a [`SpeechProvider`].
pub struct TranscriptionEngine {
    speech: Arc<dyn SpeechProvider>,
    toolkit: Arc<dyn MediaToolkit>,
}

impl TranscriptionEngine {
    pub fn new(speech: Arc<dyn SpeechProvider>, toolkit: Arc<dyn MediaToolkit>) -> Self {
        Self { speech, toolkit }
    }

    /// Transcribe (or translate) a media file of any size.
    pub async fn transcribe(
        &self,
        path: &Path,
        language: Option<&str>,
        task: SpeechTask,
    ) -> Result<Transcription> {
        let limit = self.speech.max_upload_bytes();
        let size = file_size(path).await?;
        let ext = extension_of(path);

        if self.speech.accepted_extensions().contains(&ext.as_str()) && size <= limit {
            debug!(size, %ext, "submitting file directly to speech service");
            return self.speech.transcribe_file(path, language, task).await;
        }

        // Too large or not an accepted container: strip the video track.
        let audio = self.toolkit.strip_to_audio(path).await?;
        let cleanup = audio != path;

        let result = self.transcribe_audio(&audio, language, task, limit).await;

        if cleanup {
            let _ = tokio::fs::remove_file(&audio).await;
        }
        result
    }

    async fn transcribe_audio(
        &self,
        audio: &Path,
        language: Option<&str>,
        task: SpeechTask,
        limit: u64,
    ) -> Result<Transcription> {
        let size = file_size(audio).await?;
        if size <= limit {
            debug!(size, "audio-only file fits, submitting");
            return self.speech.transcribe_file(audio, language, task).await;
        }

        info!(size, limit, "audio exceeds upload limit, splitting into chunks");
        self.transcribe_chunked(audio, language, task, size, limit)
            .await
    }

    async fn transcribe_chunked(
        &self,
        audio: &Path,
        language: Option<&str>,
        task: SpeechTask,
        size: u64,
        limit: u64,
    ) -> Result<Transcription> {
        let duration = self.toolkit.probe(audio).await?.duration_seconds;
        if duration <= 0.0 {
            return Err(Error::transcription(
                "Could not determine audio duration for chunking",
            ));
        }

        let chunk_budget = (limit as f64 * SPEECH_CHUNK_SAFETY).max(1.0);
        let num_chunks = (size as f64 / chunk_budget).ceil() as usize;
        let chunk_duration = duration / num_chunks as f64;

        let mut all_text: Vec<String> = Vec::with_capacity(num_chunks);
        let mut all_segments: Vec<TranscriptSegment> = Vec::new();
        let mut detected_language = language.unwrap_or("en").to_owned();

        for i in 0..num_chunks {
            let start = i as f64 * chunk_duration;
            let chunk = self
                .toolkit
                .cut_audio_chunk(audio, start, chunk_duration, i)
                .await?;

            let result = self.speech.transcribe_file(&chunk, language, task).await;
            let _ = tokio::fs::remove_file(&chunk).await;
            let partial = result?;

            all_text.push(partial.text);
            if !partial.language.is_empty() {
                detected_language = partial.language;
            }
            for seg in partial.segments {
                all_segments.push(TranscriptSegment {
                    start: seg.start + start,
                    end: seg.end + start,
                    text: seg.text,
                    speaker: seg.speaker,
                });
            }
        }

        Ok(Transcription {
            text: all_text.join(" "),
            language: detected_language,
            segments: all_segments,
        })
    }
}

async fn file_size(path: &Path) -> Result<u64> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::media_with_source(format!("stat {}", path.display()), e))?;
    Ok(meta.len())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}
