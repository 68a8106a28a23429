//! Application layer for vmem: the ingestion pipeline and the services
//! around it.
//!
//! Everything here is expressed against the domain ports: repositories for
//! persistence, providers for the outside world. The binary wires concrete
//! implementations in via `vmem-infrastructure` and `vmem-providers`.

pub mod extractor;
pub mod pipeline;
pub mod thumbnails;
pub mod timeline;
pub mod transcriber;
pub mod transcript;
pub mod translator;
pub mod use_cases;
pub mod vision;

pub use extractor::{ContentExtractor, ExtractRequest};
pub use pipeline::{IngestPipeline, PipelineConfig, PipelineOutcome};
pub use transcriber::TranscriptionEngine;
pub use translator::Translator;
pub use use_cases::{BillingService, JobController, VectorMemory};
