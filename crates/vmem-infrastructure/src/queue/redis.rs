//! Redis-backed job queue: one named list, JSON entries.
//!
//! `LPUSH` to enqueue, `BRPOP` to dequeue: FIFO with blocking pickup.
//! The connection manager reconnects transparently; the connection is
//! process-scoped and shared for dequeue.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{JobQueue, QueuedJob};

/// Durable single-queue implementation over Redis.
pub struct RedisJobQueue {
    manager: ConnectionManager,
    queue_key: String,
}

impl RedisJobQueue {
    /// Connect to Redis and bind to the named queue.
    pub async fn connect(url: &str, queue_name: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::queue_with_source("invalid redis URL", e))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::queue_with_source("could not connect to redis", e))?;
        Ok(Self {
            manager,
            queue_key: format!("vmem:queue:{queue_name}"),
        })
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn push(&self, entry: &QueuedJob) -> Result<()> {
        let payload = serde_json::to_string(entry)?;
        let mut conn = self.manager.clone();
        let _: () = conn
            .lpush(&self.queue_key, payload)
            .await
            .map_err(|e| Error::queue_with_source("enqueue failed", e))?;
        debug!(job_id = %entry.job_id, queue = %self.queue_key, "job pushed");
        Ok(())
    }

    async fn pop(&self, timeout_seconds: u64) -> Result<Option<QueuedJob>> {
        let mut conn = self.manager.clone();
        let popped: Option<(String, String)> = conn
            .brpop(&self.queue_key, timeout_seconds as f64)
            .await
            .map_err(|e| Error::queue_with_source("dequeue failed", e))?;

        match popped {
            Some((_, payload)) => {
                let entry: QueuedJob = serde_json::from_str(&payload)
                    .map_err(|e| Error::queue(format!("malformed queue entry: {e}")))?;
                debug!(job_id = %entry.job_id, "job popped");
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}
