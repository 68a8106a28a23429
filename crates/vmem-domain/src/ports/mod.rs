//! Port traits: the seams between the core and everything else.

pub mod infrastructure;
pub mod providers;
pub mod repositories;
pub mod services;

pub use infrastructure::{DatabaseExecutor, Dispatcher, JobQueue, QueuedJob, SqlParam, SqlRow};
pub use providers::{
    BlobStorage, CacheProvider, ChatProvider, EmbeddingProvider, MediaDownloader, MediaToolkit,
    SpeakerLabeler, SpeechProvider, VisionProvider,
};
pub use repositories::{
    ContentRecord, ContentRepository, CreditRepository, EntityRecord, JobRepository, StoredVector,
};
pub use services::{BillingInterface, JobControllerInterface, VectorMemoryInterface};
