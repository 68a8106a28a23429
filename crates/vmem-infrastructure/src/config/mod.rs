//! Environment-driven configuration.
//!
//! An immutable [`AppConfig`] is built once at process start (defaults
//! merged with `VMEM_`-prefixed environment variables, `__` as the nesting
//! separator) and passed explicitly into constructors. Every value has a
//! default except provider credentials, which only degrade ingestion at
//! call time when missing.

mod types;
mod validation;

pub use types::{
    AppConfig, BlobConfig, DatabaseConfig, EmbeddingConfig, LoggingConfig, MediaConfig,
    OpenAiConfig, QueueConfig, RateLimitConfig,
};
pub use validation::validate_config;

use figment::providers::{Env, Serialized};
use figment::Figment;

use vmem_domain::error::{Error, Result};

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "VMEM_";

/// Load configuration: defaults, overridden by `VMEM_*` environment
/// variables (`VMEM_DATABASE__URL`, `VMEM_QUEUE__THREAD_FALLBACK`, ...).
pub fn load_config() -> Result<AppConfig> {
    let config: AppConfig = Figment::new()
        .merge(Serialized::defaults(AppConfig::default()))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| Error::config(format!("configuration error: {e}")))?;

    for warning in validate_config(&config) {
        tracing::warn!("{warning}");
    }
    Ok(config)
}

/// Create the on-disk layout the pipeline expects (data, videos,
/// thumbnails, uploads).
pub fn ensure_directories(config: &AppConfig) -> Result<()> {
    for dir in [
        config.data_dir.clone(),
        config.videos_dir(),
        config.thumbnails_dir(),
        config.uploads_dir(),
    ] {
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::config(format!("could not create {}: {e}", dir.display())))?;
    }
    Ok(())
}
