//! Moka in-memory cache provider.
//!
//! High-performance concurrent cache for lightweight JSON payloads (job
//! lists). Per-entry TTLs are tracked on the value and checked lazily on
//! read.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;

use vmem_domain::error::Result;
use vmem_domain::ports::CacheProvider;

#[derive(Clone)]
struct CachedValue {
    json: String,
    expires_at: Option<Instant>,
}

/// Moka-based [`CacheProvider`].
#[derive(Clone)]
pub struct MokaCacheProvider {
    cache: Cache<String, CachedValue>,
}

impl MokaCacheProvider {
    /// Create a provider with the given entry capacity.
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
        }
    }
}

#[async_trait]
impl CacheProvider for MokaCacheProvider {
    async fn get_json(&self, key: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.get(key).await {
            if cached
                .expires_at
                .is_some_and(|expires_at| Instant::now() >= expires_at)
            {
                self.cache.invalidate(key).await;
                return Ok(None);
            }
            return Ok(Some(cached.json));
        }
        Ok(None)
    }

    async fn set_json(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.cache
            .insert(
                key.to_owned(),
                CachedValue {
                    json: value.to_owned(),
                    expires_at,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let existed = self.cache.contains_key(key);
        self.cache.invalidate(key).await;
        Ok(existed)
    }

    fn provider_name(&self) -> &str {
        "moka"
    }
}
