//! Configuration validation: warnings, not hard failures.
//!
//! A deployment with no provider credentials still starts (enqueue
//! rejects nothing, the worker fails jobs with a clear message), so
//! validation only surfaces what the operator should know.

use super::types::AppConfig;

/// Collect human-readable warnings about this configuration.
pub fn validate_config(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.openai.is_configured() {
        warnings.push(
            "OPENAI key not set (VMEM_OPENAI__API_KEY): transcription, vision, and \
             extraction will fail at ingest time"
                .to_owned(),
        );
    }

    if config.blob.token.is_empty() {
        warnings.push(
            "blob token not set (VMEM_BLOB__TOKEN): thumbnails fall back to local disk".to_owned(),
        );
    }

    if config.queue.thread_fallback {
        warnings.push(
            "queue thread-fallback enabled: jobs run in-process in the enqueueing service"
                .to_owned(),
        );
    }

    if config.queue.job_timeout_seconds < 60 {
        warnings.push(format!(
            "queue job timeout of {}s is shorter than a typical ingest",
            config.queue.job_timeout_seconds
        ));
    }

    warnings
}
