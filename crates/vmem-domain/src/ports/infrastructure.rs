//! Infrastructure ports: SQL execution, the job queue, and dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::IngestJob;
use crate::error::Result;
use crate::value_objects::{JobId, TenantId};

// ============================================================================
// Database executor
// ============================================================================

/// Parameter for prepared statement binding (driver-agnostic).
#[derive(Debug, Clone)]
pub enum SqlParam {
    /// String value
    String(String),
    /// 64-bit integer
    I64(i64),
    /// 64-bit float (progress, timestamps)
    F64(f64),
    /// Boolean flag
    Bool(bool),
    /// Null
    Null,
}

/// Abstraction for a single query result row.
///
/// Implementations wrap driver-specific rows and expose values by column
/// name so repository code can map to domain entities without depending on
/// the driver.
pub trait SqlRow: Send + Sync {
    /// Try to get a string by column name.
    fn try_get_string(&self, name: &str) -> Result<Option<String>>;

    /// Try to get an i64 by column name.
    fn try_get_i64(&self, name: &str) -> Result<Option<i64>>;

    /// Try to get an f64 by column name.
    fn try_get_f64(&self, name: &str) -> Result<Option<f64>>;
}

/// Port for executing SQL.
///
/// Repositories depend on this trait; they do not hold pools or use driver
/// types directly. Every call acquires a fresh connection from the pool, so
/// sessions are never shared across concurrent operations.
#[async_trait]
pub trait DatabaseExecutor: Send + Sync {
    /// Execute a statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64>;

    async fn query_one(&self, sql: &str, params: &[SqlParam]) -> Result<Option<Arc<dyn SqlRow>>>;

    async fn query_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Arc<dyn SqlRow>>>;
}

// ============================================================================
// Queue
// ============================================================================

/// The payload a worker needs to pick a job up. The job row is the durable
/// handle; this entry is a hint for worker pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub tenant: TenantId,
    /// Zero-based delivery attempt (incremented by queue-layer retries)
    #[serde(default)]
    pub attempt: u32,
    /// Wall-clock timeout for the whole job, in seconds
    pub timeout_seconds: u64,
}

/// Durable single-named-queue port.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Push a job entry for worker pickup.
    async fn push(&self, entry: &QueuedJob) -> Result<()>;

    /// Block up to `timeout_seconds` waiting for the next entry.
    async fn pop(&self, timeout_seconds: u64) -> Result<Option<QueuedJob>>;
}

// ============================================================================
// Dispatch
// ============================================================================

/// Job dispatch port: queue-backed in scaled deployments, in-process for a
/// single node. Selected by configuration; callers cannot tell the
/// difference (the job's observable contract is identical).
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Hand a freshly created queued job to a worker.
    async fn dispatch(&self, job: &IngestJob) -> Result<()>;
}
