//! Job controller: lifecycle writes, queue coupling, list caching.
//!
//! Every state transition is a conditional repository update, so terminal
//! states can never be resurrected by late writers (a slow vision stage
//! reporting "85% analyzing frame 12/20" after a cancel is a no-op).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use vmem_domain::entities::{
    IngestJob, IngestMode, JobSettings, JobSource, JobStatus, JobSummary,
};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{
    BillingInterface, CacheProvider, Dispatcher, JobControllerInterface, JobRepository,
};
use vmem_domain::value_objects::{JobId, TenantId};

const LIST_CACHE_TTL: Duration = Duration::from_secs(30);
/// Only the default listing shape is cached; one key per tenant.
const CACHED_LIST_LIMIT: usize = 50;
const REFUND_REASON: &str = "video_processing";

/// Concrete job controller over a repository, dispatcher, billing, and a
/// list cache.
pub struct JobController {
    repo: Arc<dyn JobRepository>,
    dispatcher: Arc<dyn Dispatcher>,
    billing: Arc<dyn BillingInterface>,
    cache: Arc<dyn CacheProvider>,
}

impl JobController {
    pub fn new(
        repo: Arc<dyn JobRepository>,
        dispatcher: Arc<dyn Dispatcher>,
        billing: Arc<dyn BillingInterface>,
        cache: Arc<dyn CacheProvider>,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            billing,
            cache,
        }
    }

    fn list_cache_key(tenant: TenantId) -> String {
        format!("jobs:tenant:{tenant}")
    }

    async fn invalidate_list(&self, tenant: TenantId) {
        let _ = self.cache.delete(&Self::list_cache_key(tenant)).await;
    }

    /// Tenant owning a job, for cache invalidation from id-only call sites.
    async fn tenant_of(&self, job_id: &JobId) -> Option<TenantId> {
        self.repo.get(job_id).await.ok().flatten().map(|j| j.tenant)
    }

    fn validate_source(source: &str) -> Result<JobSource> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_argument("Source must not be empty"));
        }
        let parsed = JobSource::from_raw(trimmed);
        if let JobSource::Url(url) = &parsed {
            // Reject scheme-only or hostless URLs synchronously at enqueue
            // time; they never consume credits.
            let rest = url
                .trim_start_matches("https://")
                .trim_start_matches("http://");
            if rest.is_empty() || !rest.contains('.') {
                return Err(Error::invalid_argument(format!("Invalid URL: {url}")));
            }
        }
        Ok(parsed)
    }
}

#[async_trait]
impl JobControllerInterface for JobController {
    async fn enqueue(
        &self,
        tenant: TenantId,
        source: &str,
        mode: IngestMode,
        settings: JobSettings,
    ) -> Result<JobId> {
        let parsed = Self::validate_source(source)?;
        let job = IngestJob::new(tenant, parsed, mode, settings);
        self.repo.create(&job).await?;

        // The row is the durable handle; the queue entry is only a pickup
        // hint, so a dispatch failure surfaces to the caller while the row
        // remains visible (and deletable) in the list.
        self.dispatcher.dispatch(&job).await?;

        self.invalidate_list(tenant).await;
        info!(job_id = %job.id, %tenant, "job enqueued");
        Ok(job.id)
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<IngestJob>> {
        self.repo.get(job_id).await
    }

    async fn list(
        &self,
        tenant: TenantId,
        limit: usize,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobSummary>> {
        // Only the unfiltered default listing is cached; filtered or
        // unusually-sized views go straight through.
        let cacheable = status.is_none() && limit == CACHED_LIST_LIMIT;
        let key = Self::list_cache_key(tenant);

        if cacheable {
            if let Ok(Some(cached)) = self.cache.get_json(&key).await {
                if let Ok(summaries) = serde_json::from_str::<Vec<JobSummary>>(&cached) {
                    debug!(%tenant, "job list served from cache");
                    return Ok(summaries);
                }
            }
        }

        let summaries = self.repo.list(tenant, limit, status).await?;

        if cacheable {
            if let Ok(serialized) = serde_json::to_string(&summaries) {
                let _ = self
                    .cache
                    .set_json(&key, &serialized, Some(LIST_CACHE_TTL))
                    .await;
            }
        }
        Ok(summaries)
    }

    async fn start(&self, job_id: &JobId) -> Result<bool> {
        let started = self.repo.mark_running(job_id).await?;
        if started {
            if let Some(tenant) = self.tenant_of(job_id).await {
                self.invalidate_list(tenant).await;
            }
        }
        Ok(started)
    }

    async fn progress(&self, job_id: &JobId, percent: f64, status_text: &str) -> Result<()> {
        // Conditional update: terminal rows are untouched, and progress
        // never decreases. A false return is expected after cancel.
        let applied = self
            .repo
            .update_progress(job_id, percent.min(100.0), Some(status_text))
            .await?;
        if applied {
            if let Some(tenant) = self.tenant_of(job_id).await {
                self.invalidate_list(tenant).await;
            }
        }
        Ok(())
    }

    async fn complete(&self, job_id: &JobId, result: &Value) -> Result<bool> {
        let applied = self.repo.complete(job_id, result).await?;
        if applied {
            info!(%job_id, "job completed");
        } else {
            warn!(%job_id, "complete skipped: job not in running state");
        }
        if let Some(tenant) = self.tenant_of(job_id).await {
            self.invalidate_list(tenant).await;
        }
        Ok(applied)
    }

    async fn fail(&self, job_id: &JobId, error: &str) -> Result<()> {
        let Some(job) = self.repo.get(job_id).await? else {
            return Ok(());
        };
        if job.status.is_terminal() {
            // Cancelled (or already settled) jobs are left alone; in
            // particular a cancelled job does not refund.
            debug!(%job_id, status = job.status.as_str(), "fail skipped: already terminal");
            return Ok(());
        }

        // Refund before the row becomes observably failed, so a reader
        // reconciling balances never sees a failed job without its refund.
        // The (job, kind) natural key makes a crash-retry duplicate a no-op.
        if job.credits_deducted > 0 {
            self.billing
                .refund(
                    job.tenant,
                    job.credits_deducted,
                    REFUND_REASON,
                    Some(*job_id),
                    "Refund: processing failed",
                )
                .await?;
            info!(%job_id, credits = job.credits_deducted, "refunded credits for failed job");
        }

        let applied = self.repo.fail(job_id, error).await?;
        if !applied {
            warn!(%job_id, "fail update lost a race with another terminal transition");
        }
        self.invalidate_list(job.tenant).await;
        Ok(())
    }

    async fn cancel(&self, job_id: &JobId, tenant: TenantId) -> Result<bool> {
        let cancelled = self.repo.cancel(job_id, tenant).await?;
        if cancelled {
            info!(%job_id, "job cancelled");
            self.invalidate_list(tenant).await;
        }
        Ok(cancelled)
    }

    async fn delete(&self, job_id: &JobId, tenant: TenantId) -> Result<bool> {
        let deleted = self.repo.delete(job_id, tenant).await?;
        if deleted {
            self.invalidate_list(tenant).await;
        }
        Ok(deleted)
    }

    async fn record_deduction(&self, job_id: &JobId, credits: i64) -> Result<()> {
        self.repo.set_credits_deducted(job_id, credits).await
    }
}
