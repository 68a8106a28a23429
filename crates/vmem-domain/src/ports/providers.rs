//! External provider ports.
//!
//! Every outside collaborator (speech, vision, extraction LLM, embeddings,
//! blob storage, media tools, cache) sits behind one of these narrow traits.
//! The core never sees their implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{
    DownloadMetadata, MediaInfo, SampledFrame, SpeakerTurn, SpeechTask, Transcription,
};
use crate::error::Result;
use crate::value_objects::Embedding;

// ============================================================================
// Embedding
// ============================================================================

/// Dense text embedding interface.
///
/// Implementations hold one model instance per process, loaded lazily on
/// first use and reused across tenants. Vectors are normalized and share the
/// dimension fixed at load time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let embeddings = self.embed_batch(&[text.to_owned()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::Error::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    fn dimensions(&self) -> usize;

    fn provider_name(&self) -> &str;
}

// ============================================================================
// Speech
// ============================================================================

/// Speech-to-text service port.
///
/// Submits one file at a time; the transcription engine handles format
/// stripping and chunking when a file exceeds [`Self::max_upload_bytes`].
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Transcribe (or translate) a single audio file.
    async fn transcribe_file(
        &self,
        path: &Path,
        language: Option<&str>,
        task: SpeechTask,
    ) -> Result<Transcription>;

    /// Upload size limit imposed by the service, in bytes.
    fn max_upload_bytes(&self) -> u64;

    /// File extensions the service accepts directly (lowercase, with dot).
    fn accepted_extensions(&self) -> &[&str];

    fn provider_name(&self) -> &str;
}

// ============================================================================
// Vision
// ============================================================================

/// Vision captioning port. One call per frame; the pipeline bounds
/// concurrency.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Describe a JPEG frame given a context prompt. Implementations use a
    /// low-detail mode where the backend supports one.
    async fn describe_frame(&self, jpeg: &[u8], prompt: &str) -> Result<String>;

    fn provider_name(&self) -> &str;
}

// ============================================================================
// Extraction / chat LLM
// ============================================================================

/// Chat LLM port used for structured extraction and translation.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a prompt expecting a JSON object back (JSON response mode where
    /// the backend supports one). Returns the raw response text; callers
    /// parse and repair.
    async fn chat_json(&self, prompt: &str) -> Result<String>;

    /// Send a prompt expecting plain text back.
    async fn chat_text(&self, prompt: &str) -> Result<String>;

    fn provider_name(&self) -> &str;
}

// ============================================================================
// Blob storage
// ============================================================================

/// Thumbnail blob store.
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store bytes under a logical path, returning a retrievable URL.
    async fn put(&self, bytes: &[u8], logical_path: &str) -> Result<String>;

    /// Fetch bytes by URL.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;

    /// Delete by URL. Idempotent.
    async fn delete(&self, url: &str) -> Result<()>;

    fn provider_name(&self) -> &str;
}

// ============================================================================
// Cache
// ============================================================================

/// Read-through cache for lightweight JSON payloads (job lists).
#[async_trait]
pub trait CacheProvider: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<String>>;

    async fn set_json(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    fn provider_name(&self) -> &str;
}

// ============================================================================
// Media acquisition
// ============================================================================

/// Downloads remote media and returns local paths plus a metadata bundle.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download the audio track only (small) together with platform
    /// metadata. Reuses an already-downloaded file when the natural id
    /// matches.
    async fn download_audio_with_metadata(
        &self,
        url: &str,
        cookies_file: Option<&Path>,
    ) -> Result<(PathBuf, DownloadMetadata)>;

    /// Download the full video (needed for frame sampling).
    async fn download_video(&self, url: &str, cookies_file: Option<&Path>) -> Result<PathBuf>;
}

/// Local media toolkit: probing, audio stripping, chunk cutting, frame
/// sampling, thumbnail resizing. Backed by ffmpeg/ffprobe.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Basic properties of a local media file.
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;

    /// Extract the audio track into a speech-accepted container.
    /// Stream-copies first; re-encodes only when the copy fails.
    async fn strip_to_audio(&self, path: &Path) -> Result<PathBuf>;

    /// Cut `[start, start+duration)` seconds of audio into a new file.
    async fn cut_audio_chunk(
        &self,
        path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        chunk_index: usize,
    ) -> Result<PathBuf>;

    /// Sample JPEG frames at the given cadence, capped to `max_frames`
    /// (the interval widens for long media).
    async fn sample_frames(
        &self,
        path: &Path,
        interval_seconds: f64,
        max_frames: usize,
    ) -> Result<Vec<SampledFrame>>;

    /// Resize a JPEG to the given width, preserving aspect ratio.
    async fn make_thumbnail(&self, jpeg: &[u8], target_width: u32) -> Result<Vec<u8>>;
}

// ============================================================================
// Speaker labeling
// ============================================================================

/// Optional speaker diarization port.
#[async_trait]
pub trait SpeakerLabeler: Send + Sync {
    /// Detect speaker turns across an audio file.
    async fn diarize(&self, audio_path: &Path) -> Result<Vec<SpeakerTurn>>;

    fn provider_name(&self) -> &str;
}
