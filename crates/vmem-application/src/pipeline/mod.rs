//! The worker-side ingestion pipeline.

pub mod ingest;
pub mod progress;

pub use ingest::{IngestPipeline, PipelineConfig, PipelineOutcome};
pub use progress::{ProgressSender, ProgressWriter};
