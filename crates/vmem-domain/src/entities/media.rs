//! Media acquisition types shared between the acquirer and the pipeline.

use serde::{Deserialize, Serialize};

use super::content::TranscriptSegment;

/// Basic properties of a local media file (ffprobe output).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds (0 when unknown)
    pub duration_seconds: f64,
    /// Frame width in pixels (0 for audio-only)
    pub width: u32,
    /// Frame height in pixels (0 for audio-only)
    pub height: u32,
    /// File size in bytes
    pub file_size_bytes: i64,
}

/// Source platform statistics captured at download time and forwarded to
/// the extractor (view counts make creator-mode analysis possible).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceStats {
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub subscriber_count: i64,
    pub upload_date: String,
    pub channel: String,
    pub categories: Vec<String>,
    /// Truncated to 500 chars at parse time
    pub description: String,
}

impl SourceStats {
    /// A stats bundle is worth forwarding when the platform reported
    /// anything at all.
    #[must_use]
    pub fn is_meaningful(&self) -> bool {
        self.view_count > 0 || !self.channel.is_empty() || !self.upload_date.is_empty()
    }
}

/// Metadata bundle returned alongside a download.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadMetadata {
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Media title as reported by the platform
    pub title: String,
    /// Natural identifier on the platform (e.g. YouTube video id)
    pub media_id: String,
    /// Platform statistics when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SourceStats>,
}

/// Output of the speech-to-text service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcription {
    /// Full transcript text
    pub text: String,
    /// Detected (or requested) language code
    pub language: String,
    /// Ordered segments, contiguous, `end >= start`
    pub segments: Vec<TranscriptSegment>,
}

/// Speech task requested from the transcription service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechTask {
    /// Transcribe in the spoken language
    Transcribe,
    /// Translate to English while transcribing
    Translate,
}

impl SpeechTask {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

/// A diarizer speaker turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerTurn {
    pub start: f64,
    pub end: f64,
    /// Raw diarizer label (`SPEAKER_00`, `SPEAKER_01`, ...)
    pub speaker: String,
}

/// One sampled video frame, JPEG-encoded.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// JPEG bytes (already resized for the vision model)
    pub jpeg: Vec<u8>,
}
