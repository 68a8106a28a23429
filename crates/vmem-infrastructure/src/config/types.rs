//! Configuration value objects.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Relational database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite path or URL (`sqlite://data/vmem.db`)
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/vmem.db".to_owned(),
        }
    }
}

/// Job queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL
    pub url: String,
    /// Name of the single durable queue
    pub name: String,
    /// Wall-clock timeout for one job, enforced at the queue layer
    pub job_timeout_seconds: u64,
    /// How often a transient-external failure is retried by the queue
    /// layer (deployment parameter; the worker's deducted-credits guard
    /// keeps retries safe)
    pub max_retries: u32,
    /// Run jobs in a background task of the enqueueing process instead of
    /// the queue (single-node deployments)
    pub thread_fallback: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_owned(),
            name: "video_processing".to_owned(),
            job_timeout_seconds: 3 * 60 * 60,
            max_retries: 0,
            thread_fallback: false,
        }
    }
}

/// Credentials and model names for the OpenAI-compatible providers
/// (speech, vision, extraction). The only settings without usable
/// defaults: a missing key degrades ingestion at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; empty means unconfigured
    pub api_key: String,
    /// API base URL
    pub base_url: String,
    /// Chat model for extraction and translation
    pub chat_model: String,
    /// Vision-capable model for frame captioning
    pub vision_model: String,
    /// Speech-to-text model
    pub speech_model: String,
}

impl OpenAiConfig {
    /// Whether a key is present.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_owned(),
            chat_model: "gpt-4o-mini".to_owned(),
            vision_model: "gpt-4o-mini".to_owned(),
            speech_model: "whisper-1".to_owned(),
        }
    }
}

/// Blob storage settings (thumbnails).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobConfig {
    /// Bearer token for the blob REST API; empty selects the local-disk
    /// store
    pub token: String,
    /// Blob API endpoint
    #[serde(default = "default_blob_url")]
    pub api_url: String,
}

fn default_blob_url() -> String {
    "https://blob.vercel-storage.com".to_owned()
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// fastembed model name
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_owned(),
        }
    }
}

/// Media acquisition and frame sampling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// yt-dlp binary
    pub ytdlp_bin: String,
    /// ffmpeg binary
    pub ffmpeg_bin: String,
    /// ffprobe binary
    pub ffprobe_bin: String,
    /// Seconds between sampled frames
    pub frame_interval_seconds: f64,
    /// Hard cap on sampled frames
    pub max_frames: usize,
    /// Whether to run speaker detection (off on small instances)
    pub detect_speakers: bool,
    /// Diarization sidecar endpoint; empty disables speaker labeling
    pub diarization_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ytdlp_bin: "yt-dlp".to_owned(),
            ffmpeg_bin: "ffmpeg".to_owned(),
            ffprobe_bin: "ffprobe".to_owned(),
            frame_interval_seconds: vmem_domain::constants::media::FRAME_INTERVAL_SECONDS,
            max_frames: vmem_domain::constants::media::MAX_FRAMES,
            detect_speakers: false,
            diarization_url: String::new(),
        }
    }
}

/// Rate limit knobs (enforced by the API surface, carried here so one
/// config object describes the deployment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub auth_requests_per_minute: u32,
    pub unauth_requests_per_minute: u32,
    pub video_processing_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            auth_requests_per_minute: 100,
            unauth_requests_per_minute: 20,
            video_processing_per_hour: 10,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive ("info", "vmem=debug,info", ...)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

/// The whole deployment's configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root data directory (downloads, thumbnails, uploads)
    pub data_dir: PathBuf,
    /// Public base URL thumbnails are served from
    pub api_base_url: String,
    /// Allowed CORS origins, comma-splittable by the API surface
    pub cors_origins: Vec<String>,
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub openai: OpenAiConfig,
    pub blob: BlobConfig,
    pub embedding: EmbeddingConfig,
    pub media: MediaConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            api_base_url: String::new(),
            cors_origins: vec![
                "http://localhost:3000".to_owned(),
                "http://localhost:5173".to_owned(),
            ],
            database: DatabaseConfig::default(),
            queue: QueueConfig::default(),
            openai: OpenAiConfig::default(),
            blob: BlobConfig::default(),
            embedding: EmbeddingConfig::default(),
            media: MediaConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Downloaded media cache directory.
    pub fn videos_dir(&self) -> PathBuf {
        self.data_dir.join("videos")
    }

    /// Local thumbnail root.
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.data_dir.join("thumbnails")
    }

    /// Uploaded file staging directory.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }
}
