//! Domain entities.

pub mod content;
pub mod credit;
pub mod job;
pub mod media;

pub use content::{
    ContentExtract, ContentSummary, EntityMention, FrameAnalysis, KeyPoint, Quote, ResourceLink,
    ScoredContent, ThumbnailEntry, TimelineEntry, TranscriptParagraph, TranscriptSegment,
};
pub use credit::{
    CreditTransaction, DurationCheck, StorageCheck, Subscription, Tier, TierLimits,
    TransactionKind,
};
pub use job::{IngestJob, IngestMode, JobSettings, JobSource, JobStatus, JobSummary};
pub use media::{
    DownloadMetadata, MediaInfo, SampledFrame, SourceStats, SpeakerTurn, SpeechTask, Transcription,
};
