//! SQLite job repository.
//!
//! Lifecycle writes are conditional UPDATEs so terminal-state protection
//! holds at the SQL level: a slow progress writer, a completing worker,
//! and a cancelling user can interleave freely without resurrecting a
//! finished job.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use vmem_domain::entities::{
    IngestJob, IngestMode, JobSettings, JobSource, JobStatus, JobSummary,
};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{DatabaseExecutor, JobRepository, SqlParam, SqlRow};
use vmem_domain::utils::epoch_secs;
use vmem_domain::value_objects::{JobId, TenantId};

use super::row_helpers::{epoch_column, json_column, required_i64, required_string, to_json_text};

const TERMINAL_FILTER: &str = "status NOT IN ('completed', 'failed', 'cancelled')";

/// Columns the list projection loads. Excludes result (large), settings,
/// and the other heavy fields on purpose.
const LIST_COLUMNS: &str =
    "id, status, progress, title, source, mode, error, started_at, completed_at";

/// SQLite-backed [`JobRepository`].
pub struct SqliteJobRepository {
    executor: Arc<dyn DatabaseExecutor>,
}

impl SqliteJobRepository {
    pub fn new(executor: Arc<dyn DatabaseExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn create(&self, job: &IngestJob) -> Result<()> {
        let params = [
            SqlParam::String(job.id.as_str()),
            SqlParam::I64(job.tenant.as_i64()),
            SqlParam::String(job.source.as_str().to_owned()),
            SqlParam::String(
                if job.source.is_url() { "url" } else { "upload" }.to_owned(),
            ),
            SqlParam::String(job.mode.as_str().to_owned()),
            SqlParam::String(to_json_text(&job.settings)?),
            SqlParam::String(job.status.as_str().to_owned()),
            SqlParam::F64(job.progress),
            SqlParam::String(job.title.clone()),
            SqlParam::I64(job.credits_deducted),
            SqlParam::I64(job.created_at.timestamp()),
        ];
        self.executor
            .execute(
                r"
                INSERT INTO jobs (id, tenant_id, source, source_kind, mode, settings,
                                  status, progress, title, credits_deducted, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
                &params,
            )
            .await?;
        debug!(job_id = %job.id, "job row created");
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<IngestJob>> {
        let row = self
            .executor
            .query_one(
                "SELECT * FROM jobs WHERE id = ?",
                &[SqlParam::String(job_id.as_str())],
            )
            .await?;
        row.map(|r| row_to_job(r.as_ref())).transpose()
    }

    async fn list(
        &self,
        tenant: TenantId,
        limit: usize,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobSummary>> {
        let rows = match status {
            Some(status) => {
                self.executor
                    .query_all(
                        &format!(
                            "SELECT {LIST_COLUMNS} FROM jobs
                             WHERE tenant_id = ? AND status = ?
                             ORDER BY created_at DESC LIMIT ?"
                        ),
                        &[
                            SqlParam::I64(tenant.as_i64()),
                            SqlParam::String(status.as_str().to_owned()),
                            SqlParam::I64(limit as i64),
                        ],
                    )
                    .await?
            }
            None => {
                self.executor
                    .query_all(
                        &format!(
                            "SELECT {LIST_COLUMNS} FROM jobs
                             WHERE tenant_id = ?
                             ORDER BY created_at DESC LIMIT ?"
                        ),
                        &[SqlParam::I64(tenant.as_i64()), SqlParam::I64(limit as i64)],
                    )
                    .await?
            }
        };

        rows.iter().map(|r| row_to_summary(r.as_ref())).collect()
    }

    async fn mark_running(&self, job_id: &JobId) -> Result<bool> {
        // Re-claiming a running job succeeds so a queue re-delivery after
        // a worker crash can re-enter it; started_at keeps the first value.
        let affected = self
            .executor
            .execute(
                "UPDATE jobs SET status = 'running', started_at = COALESCE(started_at, ?)
                 WHERE id = ? AND status IN ('queued', 'running')",
                &[SqlParam::I64(epoch_secs()), SqlParam::String(job_id.as_str())],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn update_progress(
        &self,
        job_id: &JobId,
        progress: f64,
        status_text: Option<&str>,
    ) -> Result<bool> {
        // MAX keeps progress monotonic; the status filter keeps terminal
        // rows untouched.
        let affected = self
            .executor
            .execute(
                &format!(
                    "UPDATE jobs
                     SET progress = MAX(progress, ?), status_text = COALESCE(?, status_text)
                     WHERE id = ? AND {TERMINAL_FILTER}"
                ),
                &[
                    SqlParam::F64(progress.clamp(0.0, 100.0)),
                    status_text.map_or(SqlParam::Null, |t| SqlParam::String(t.to_owned())),
                    SqlParam::String(job_id.as_str()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn complete(&self, job_id: &JobId, result: &serde_json::Value) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                "UPDATE jobs
                 SET status = 'completed', progress = 100, completed_at = ?, result = ?
                 WHERE id = ? AND status = 'running'",
                &[
                    SqlParam::I64(epoch_secs()),
                    SqlParam::String(to_json_text(result)?),
                    SqlParam::String(job_id.as_str()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn fail(&self, job_id: &JobId, error: &str) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                &format!(
                    "UPDATE jobs SET status = 'failed', error = ?, completed_at = ?
                     WHERE id = ? AND {TERMINAL_FILTER}"
                ),
                &[
                    SqlParam::String(error.to_owned()),
                    SqlParam::I64(epoch_secs()),
                    SqlParam::String(job_id.as_str()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn cancel(&self, job_id: &JobId, tenant: TenantId) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                &format!(
                    "UPDATE jobs SET status = 'cancelled', completed_at = ?
                     WHERE id = ? AND tenant_id = ? AND {TERMINAL_FILTER}"
                ),
                &[
                    SqlParam::I64(epoch_secs()),
                    SqlParam::String(job_id.as_str()),
                    SqlParam::I64(tenant.as_i64()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn delete(&self, job_id: &JobId, tenant: TenantId) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                "DELETE FROM jobs
                 WHERE id = ? AND tenant_id = ?
                   AND status IN ('completed', 'failed', 'cancelled')",
                &[
                    SqlParam::String(job_id.as_str()),
                    SqlParam::I64(tenant.as_i64()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn set_credits_deducted(&self, job_id: &JobId, credits: i64) -> Result<()> {
        // Set at most once: a retry that already paid keeps its original
        // deduction on record.
        self.executor
            .execute(
                "UPDATE jobs SET credits_deducted = ? WHERE id = ? AND credits_deducted = 0",
                &[SqlParam::I64(credits), SqlParam::String(job_id.as_str())],
            )
            .await?;
        Ok(())
    }
}

fn row_to_job(row: &dyn SqlRow) -> Result<IngestJob> {
    let source_raw = required_string(row, "source")?;
    let source = match required_string(row, "source_kind")?.as_str() {
        "upload" => JobSource::Upload(source_raw),
        _ => JobSource::Url(source_raw),
    };
    let status = JobStatus::from_str(&required_string(row, "status")?)
        .map_err(Error::database)?;
    let mode = IngestMode::from_str(&required_string(row, "mode")?)
        .map_err(Error::database)?;
    let settings: JobSettings = json_column(row, "settings")?;
    let result: Option<serde_json::Value> = row
        .try_get_string("result")?
        .map(|text| serde_json::from_str(&text))
        .transpose()?;

    Ok(IngestJob {
        id: JobId::from_string(&required_string(row, "id")?),
        tenant: TenantId::new(required_i64(row, "tenant_id")?),
        source,
        mode,
        settings,
        status,
        progress: row.try_get_f64("progress")?.unwrap_or(0.0),
        status_text: row.try_get_string("status_text")?,
        title: required_string(row, "title")?,
        error: row.try_get_string("error")?,
        credits_deducted: row.try_get_i64("credits_deducted")?.unwrap_or(0),
        created_at: epoch_column(row, "created_at")?.unwrap_or_default(),
        started_at: epoch_column(row, "started_at")?,
        completed_at: epoch_column(row, "completed_at")?,
        result,
    })
}

fn row_to_summary(row: &dyn SqlRow) -> Result<JobSummary> {
    Ok(JobSummary {
        id: JobId::from_string(&required_string(row, "id")?),
        status: JobStatus::from_str(&required_string(row, "status")?)
            .map_err(Error::database)?,
        progress: row.try_get_f64("progress")?.unwrap_or(0.0),
        title: required_string(row, "title")?,
        source: required_string(row, "source")?,
        mode: IngestMode::from_str(&required_string(row, "mode")?)
            .map_err(Error::database)?,
        error: row.try_get_string("error")?,
        started_at: epoch_column(row, "started_at")?,
        completed_at: epoch_column(row, "completed_at")?,
    })
}
