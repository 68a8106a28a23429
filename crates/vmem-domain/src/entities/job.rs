//! Ingestion job entity and lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{CollectionId, JobId, TenantId};

/// Lifecycle status of an ingestion job.
///
/// `queued → running → {completed | failed | cancelled}`. Terminal states are
/// never overwritten; repositories enforce this with conditional updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is waiting to be picked up by a worker
    Queued,
    /// Job is currently executing
    Running,
    /// Job completed successfully
    Completed,
    /// Job terminated with an error
    Failed,
    /// Job was cancelled by the user
    Cancelled,
}

impl JobStatus {
    /// Returns `true` if the job is in a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown job status: {s}")),
        }
    }
}

/// Extraction mode selected at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// Always-on structured extraction (title, summary, topics, ...)
    General,
    /// Adds a structured recipe payload
    Recipe,
    /// Adds a learning/study payload
    Learn,
    /// Adds a creator-analytics payload
    Creator,
    /// Adds meeting-minutes payload
    Meeting,
}

impl IngestMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Recipe => "recipe",
            Self::Learn => "learn",
            Self::Creator => "creator",
            Self::Meeting => "meeting",
        }
    }
}

impl Default for IngestMode {
    fn default() -> Self {
        Self::General
    }
}

impl std::str::FromStr for IngestMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "recipe" => Ok(Self::Recipe),
            "learn" => Ok(Self::Learn),
            "creator" => Ok(Self::Creator),
            "meeting" => Ok(Self::Meeting),
            _ => Err(format!("Unknown ingest mode: {s}")),
        }
    }
}

/// Where the job's media comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum JobSource {
    /// Remote URL to download via the media acquirer
    Url(String),
    /// Already-uploaded local file path
    Upload(String),
}

impl JobSource {
    /// Classify a raw source string: anything with an http(s) scheme is a URL.
    pub fn from_raw(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_owned())
        } else {
            Self::Upload(raw.to_owned())
        }
    }

    /// The raw source string (URL or path).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Url(s) | Self::Upload(s) => s,
        }
    }

    /// Returns `true` for remote URL sources.
    #[must_use]
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

/// Per-job processing settings chosen by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Whether to run the vision track (frame sampling + captioning)
    #[serde(default = "default_analyze_frames")]
    pub analyze_frames: bool,
    /// Requested output language code, `None` keeps the detected language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Collection to add the produced content to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<CollectionId>,
    /// Extraction provider name (informational, e.g. "openai")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Cookies text for authenticated downloads, written to a scope-bound
    /// temp file before yt-dlp runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
}

fn default_provider() -> String {
    "openai".to_owned()
}

fn default_analyze_frames() -> bool {
    true
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            analyze_frames: true,
            language: None,
            collection_id: None,
            provider: default_provider(),
            cookies: None,
        }
    }
}

/// One ingestion attempt, the durable handle for queue dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    /// Unique identifier
    pub id: JobId,
    /// Owning tenant
    pub tenant: TenantId,
    /// Media source (URL or upload path)
    pub source: JobSource,
    /// Extraction mode
    pub mode: IngestMode,
    /// Caller-selected settings
    pub settings: JobSettings,
    /// Lifecycle status
    pub status: JobStatus,
    /// Progress percentage, monotonic non-decreasing while running
    pub progress: f64,
    /// Short human-readable stage description ("Transcribing audio...")
    pub status_text: Option<String>,
    /// Display title (source-derived until extraction provides one)
    pub title: String,
    /// Failure reason, set when status is `failed`
    pub error: Option<String>,
    /// Credits deducted for this job (0 until the debit stage runs;
    /// set at most once; the retry guard reads it before deducting)
    pub credits_deducted: i64,
    /// When the job was created/queued
    pub created_at: DateTime<Utc>,
    /// When a worker picked the job up
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
    /// The produced content (JSON), populated on completion
    pub result: Option<serde_json::Value>,
}

impl IngestJob {
    /// Create a new job in `Queued` status.
    pub fn new(tenant: TenantId, source: JobSource, mode: IngestMode, settings: JobSettings) -> Self {
        let title = {
            let raw = source.as_str();
            raw.chars().take(50).collect()
        };
        Self {
            id: JobId::new(),
            tenant,
            source,
            mode,
            settings,
            status: JobStatus::Queued,
            progress: 0.0,
            status_text: None,
            title,
            error: None,
            credits_deducted: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
        }
    }
}

/// Lightweight job projection for list views.
///
/// Excludes the heavy columns (`result`, `settings`) on purpose; the list
/// query must never load them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: f64,
    pub title: String,
    pub source: String,
    pub mode: IngestMode,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
