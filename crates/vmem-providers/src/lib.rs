//! Provider implementations for vmem.
//!
//! Everything here implements a `vmem-domain` port: SQLite persistence
//! behind the executor abstraction, fastembed embeddings, OpenAI-shaped
//! speech/vision/chat clients, blob stores, and the moka cache. Wiring
//! happens in `vmem-infrastructure::bootstrap`.

pub mod blob;
pub mod cache;
pub mod database;
pub mod embedding;
pub mod extraction;
pub mod speaker;
pub mod speech;
pub mod vision;

pub use blob::{LocalBlobStorage, RestBlobStorage};
pub use cache::MokaCacheProvider;
pub use database::sqlite::{
    SqliteContentRepository, SqliteCreditRepository, SqliteExecutor, SqliteJobRepository,
};
pub use embedding::FastEmbedProvider;
pub use extraction::OpenAiChatProvider;
pub use speaker::HttpSpeakerLabeler;
pub use speech::OpenAiSpeechProvider;
pub use vision::OpenAiVisionProvider;
