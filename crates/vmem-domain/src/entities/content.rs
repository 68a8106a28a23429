//! Content entities: the structured artifact produced by one successful ingest.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::{CollectionId, ContentId};

/// One transcript segment as returned by the speech service, optionally
/// carrying a speaker label after diarization merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment start time in seconds
    pub start: f64,
    /// Segment end time in seconds (`end >= start`)
    pub end: f64,
    /// Trimmed segment text
    pub text: String,
    /// Speaker label (raw diarizer form, e.g. `SPEAKER_00`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// A transcript paragraph: consecutive segments grouped for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptParagraph {
    /// Paragraph start time in seconds
    pub timestamp: f64,
    /// Paragraph end time in seconds
    pub end: f64,
    /// Speaker label carried from the first segment of the paragraph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Joined paragraph text
    pub text: String,
}

/// Per-frame vision output: a short caption plus a longer description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// Short caption for timeline display
    pub caption: String,
    /// Full visual description
    pub description: String,
}

/// One entry in the merged chronological timeline.
///
/// Transcript paragraphs and vision entries are interleaved, sorted by
/// timestamp; a transcript entry precedes a vision entry at equal timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TimelineEntry {
    /// A transcript paragraph
    Transcript {
        timestamp: f64,
        end: f64,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speaker: Option<String>,
    },
    /// A vision frame description
    Vision {
        timestamp: f64,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail: Option<String>,
    },
}

impl TimelineEntry {
    /// Timestamp used for chronological ordering.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Transcript { timestamp, .. } | Self::Vision { timestamp, .. } => *timestamp,
        }
    }
}

/// A named entity extracted from the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Entity name ("Rust", "Gordon Ramsay")
    pub name: String,
    /// Entity kind ("person", "product", "concept", ...)
    #[serde(rename = "type")]
    pub entity_type: String,
    /// One-line description
    #[serde(default)]
    pub description: String,
}

/// A key point with optional timestamp anchoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    /// The point itself
    pub point: String,
    /// Timestamp reference ("MM:SS") when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Supporting details
    #[serde(default)]
    pub details: String,
}

/// A notable quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Quote text
    pub text: String,
    /// Who said it
    #[serde(default)]
    pub speaker: String,
    /// Timestamp reference when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A resource (link, tool, book) mentioned in the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    /// Resource name
    pub name: String,
    /// URL when mentioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Why it was mentioned
    #[serde(default)]
    pub description: String,
}

/// One thumbnail manifest entry. The JPEG lives in blob storage (or the
/// local thumbnails directory as fallback when `url` is absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailEntry {
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// File name within the content's thumbnail directory (`<secs>.jpg`)
    pub filename: String,
    /// Public blob URL when uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The structured artifact produced from one successful ingest.
///
/// This is the extractor's output enriched by the pipeline (transcript,
/// timeline, thumbnails, metadata). The vector row adds `embedding` and
/// `searchable_text` at persist time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentExtract {
    /// Server-assigned identifier (may be replaced by dedup)
    pub id: ContentId,
    /// Extracted title
    pub title: String,
    /// Extracted summary
    pub summary: String,
    /// Content kind: tutorial, lecture, interview, how-to, review, ...
    pub content_type: String,
    /// Extraction mode this content was produced under
    pub mode: String,
    /// Main speaker/presenter name when identified
    #[serde(default)]
    pub speaker: String,
    /// Topic strings
    #[serde(default)]
    pub topics: Vec<String>,
    /// Key points
    #[serde(default)]
    pub key_points: Vec<KeyPoint>,
    /// Extracted entities
    #[serde(default)]
    pub entities: Vec<EntityMention>,
    /// Actionable takeaways
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Notable quotes
    #[serde(default)]
    pub quotes: Vec<Quote>,
    /// Mentioned resources
    #[serde(default)]
    pub resources: Vec<ResourceLink>,
    /// Search tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Formatted transcript (timestamps + speakers)
    #[serde(default)]
    pub transcript: String,
    /// Raw speech segments in non-decreasing start order
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
    /// Vision descriptions, one `[Ns] ...` string per sampled frame
    #[serde(default)]
    pub frame_descriptions: Vec<String>,
    /// Structured per-frame analyses (caption + description)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_analyses: Option<Vec<FrameAnalysis>>,
    /// Merged chronological timeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Vec<TimelineEntry>>,
    /// Media duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    /// Source URL for URL ingests (dedup key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Local path of the processed media file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_video: Option<String>,
    /// Collections this content belongs to
    #[serde(default)]
    pub collections: Vec<CollectionId>,
    /// Size of the stored media in bytes (storage accounting)
    #[serde(default)]
    pub file_size_bytes: i64,
    /// Creation time (ISO-8601)
    pub created_at: String,
    /// Free-form metadata: thumbnail manifest, detected language,
    /// translation info, poster URL
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
    /// Recipe payload (recipe mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Value>,
    /// Learning payload (learn mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn: Option<Value>,
    /// Creator payload (creator mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Value>,
    /// Meeting minutes payload (meeting mode only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting: Option<Value>,
}

impl ContentExtract {
    /// Thumbnail manifest stored under `metadata.thumbnails`, if any.
    pub fn thumbnails(&self) -> Vec<ThumbnailEntry> {
        self.metadata
            .get("thumbnails")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    /// Replace the thumbnail manifest in `metadata.thumbnails`.
    pub fn set_thumbnails(&mut self, manifest: &[ThumbnailEntry]) {
        if let Ok(value) = serde_json::to_value(manifest) {
            self.metadata.insert("thumbnails".to_owned(), value);
        }
    }

    /// Record the detected language in metadata.
    pub fn set_detected_language(&mut self, code: &str, name: &str) {
        self.metadata
            .insert("detected_language".to_owned(), Value::String(code.to_owned()));
        self.metadata.insert(
            "detected_language_name".to_owned(),
            Value::String(name.to_owned()),
        );
    }

    /// Record translation target in metadata.
    pub fn set_translated_to(&mut self, code: &str, name: &str) {
        self.metadata
            .insert("translated_to".to_owned(), Value::String(code.to_owned()));
        self.metadata.insert(
            "translated_to_name".to_owned(),
            Value::String(name.to_owned()),
        );
    }
}

/// A stored content row joined with its similarity score from a search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredContent {
    /// The full content artifact
    pub content: ContentExtract,
    /// Cosine similarity against the query, in `[-1, 1]`
    pub similarity: f32,
}

/// Lightweight content projection for collection listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: ContentId,
    pub title: String,
    pub summary: String,
    pub content_type: String,
    pub tags: Vec<String>,
    pub topics: Vec<String>,
}
