//! Application service interfaces.
//!
//! The worker pipeline and the binary depend on these traits, never on the
//! concrete services, so every stage can be exercised against fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::{
    ContentExtract, ContentSummary, DurationCheck, IngestJob, IngestMode, JobSettings, JobStatus,
    JobSummary, ScoredContent, StorageCheck, Subscription,
};
use crate::error::Result;
use crate::value_objects::{CollectionId, CollectionInfo, ContentId, JobId, TenantId};

// ============================================================================
// Job controller
// ============================================================================

/// The conductor: job lifecycle plus queue coupling.
#[async_trait]
pub trait JobControllerInterface: Send + Sync {
    /// Create a queued job and hand it to the dispatcher. Returns
    /// immediately with the durable job id.
    async fn enqueue(
        &self,
        tenant: TenantId,
        source: &str,
        mode: IngestMode,
        settings: JobSettings,
    ) -> Result<JobId>;

    /// Load a full job row.
    async fn get(&self, job_id: &JobId) -> Result<Option<IngestJob>>;

    /// Lightweight list projection, newest first.
    async fn list(
        &self,
        tenant: TenantId,
        limit: usize,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobSummary>>;

    /// Transition `queued → running` at worker pickup.
    async fn start(&self, job_id: &JobId) -> Result<bool>;

    /// Progress write with terminal-state protection: a no-op when the job
    /// already reached a terminal status.
    async fn progress(&self, job_id: &JobId, percent: f64, status_text: &str) -> Result<()>;

    /// Mark completed with the result payload. Guarded: only applies from
    /// `running` (a cancelled job stays cancelled). Returns whether the
    /// transition happened.
    async fn complete(&self, job_id: &JobId, result: &Value) -> Result<bool>;

    /// Mark failed. When the job has credits deducted, the refund is issued
    /// before this returns.
    async fn fail(&self, job_id: &JobId, error: &str) -> Result<()>;

    /// Atomic cancel; `false` when the job was already terminal. Does not
    /// refund; the in-flight worker observes the cancellation at its
    /// commit checkpoint and discards output.
    async fn cancel(&self, job_id: &JobId, tenant: TenantId) -> Result<bool>;

    /// Remove a terminal job from the list.
    async fn delete(&self, job_id: &JobId, tenant: TenantId) -> Result<bool>;

    /// Record the credits deducted on the job row (at most once per job).
    async fn record_deduction(&self, job_id: &JobId, credits: i64) -> Result<()>;
}

// ============================================================================
// Billing
// ============================================================================

/// Credit/quota controller: the authoritative source of truth for balances
/// and tier-derived limits.
#[async_trait]
pub trait BillingInterface: Send + Sync {
    /// Lazily create the default free-tier subscription when absent.
    async fn ensure_subscription(&self, tenant: TenantId) -> Result<Subscription>;

    /// Spendable balance: monthly remaining plus top-up.
    async fn balance(&self, tenant: TenantId) -> Result<i64>;

    /// Duration feature gate for the tenant's tier.
    async fn check_duration(&self, tenant: TenantId, minutes: f64) -> Result<DurationCheck>;

    /// Storage quota gate for the tenant's tier.
    async fn check_storage(&self, tenant: TenantId, additional_bytes: i64)
        -> Result<StorageCheck>;

    /// Deterministic published pricing.
    fn video_cost(&self, duration_minutes: f64, analyze_frames: bool) -> i64 {
        crate::constants::credits::video_cost(duration_minutes, analyze_frames)
    }

    /// Deduct credits (monthly first, then top-up), appending one ledger
    /// row. Fails with `Error::InsufficientCredits` without touching
    /// balances when the combined balance is short.
    async fn deduct(
        &self,
        tenant: TenantId,
        amount: i64,
        reason: &str,
        job_id: Option<JobId>,
        description: &str,
    ) -> Result<()>;

    /// Refund credits (monthly up to its cap, remainder to top-up),
    /// appending one ledger row. Idempotent per `(job_id, kind)`: a
    /// duplicate refund is silently suppressed.
    async fn refund(
        &self,
        tenant: TenantId,
        amount: i64,
        reason: &str,
        job_id: Option<JobId>,
        description: &str,
    ) -> Result<()>;

    /// Add purchased top-up credits.
    async fn topup(&self, tenant: TenantId, credits: i64, description: &str) -> Result<()>;

    /// Reset the monthly allocation when the period has lapsed. Driven by a
    /// periodic task, never by ingest.
    async fn monthly_reset(&self, tenant: TenantId) -> Result<()>;
}

// ============================================================================
// Vector memory
// ============================================================================

/// Multi-tenant vector memory over extracted contents.
#[async_trait]
pub trait VectorMemoryInterface: Send + Sync {
    /// Upsert a content: embed its searchable text, write the row, replace
    /// its entity vectors. Returns the stored id.
    async fn add(&self, tenant: TenantId, content: &ContentExtract) -> Result<ContentId>;

    /// Load a content by id.
    async fn get(&self, tenant: TenantId, content_id: &ContentId)
        -> Result<Option<ContentExtract>>;

    /// All contents for a tenant, newest first.
    async fn list(&self, tenant: TenantId) -> Result<Vec<ContentExtract>>;

    /// Cosine similarity search, optionally scoped to a content type and/or
    /// a collection.
    async fn search(
        &self,
        tenant: TenantId,
        query: &str,
        n_results: usize,
        content_type: Option<&str>,
        collection_id: Option<&CollectionId>,
    ) -> Result<Vec<ScoredContent>>;

    /// Find contents mentioning the given entities (entity-vector search).
    async fn search_by_entity(
        &self,
        tenant: TenantId,
        entity_names: &[String],
        n_results: usize,
    ) -> Result<Vec<ContentExtract>>;

    /// Find contents covering the given topics.
    async fn search_by_topic(
        &self,
        tenant: TenantId,
        topics: &[String],
        n_results: usize,
    ) -> Result<Vec<ScoredContent>>;

    /// Dedup probe: the newest content matching this source URL by natural
    /// identifier, else verbatim.
    async fn find_by_source_url(&self, tenant: TenantId, url: &str)
        -> Result<Option<ContentId>>;

    /// Replace the stored blob (out-of-band repair/backfill); does not
    /// re-embed.
    async fn update(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        content: &ContentExtract,
    ) -> Result<bool>;

    /// Delete a content and its entity vectors.
    async fn delete(&self, tenant: TenantId, content_id: &ContentId) -> Result<bool>;

    // ---- collections ----

    async fn create_collection(
        &self,
        tenant: TenantId,
        name: &str,
        description: &str,
    ) -> Result<CollectionId>;

    async fn collections(&self, tenant: TenantId) -> Result<Vec<CollectionInfo>>;

    async fn delete_collection(&self, tenant: TenantId, id: &CollectionId) -> Result<bool>;

    async fn add_to_collection(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collection_id: &CollectionId,
    ) -> Result<bool>;

    async fn remove_from_collection(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collection_id: &CollectionId,
    ) -> Result<bool>;

    /// Lightweight membership listing.
    async fn collection_contents(
        &self,
        tenant: TenantId,
        collection_id: &CollectionId,
    ) -> Result<Vec<ContentSummary>>;

    /// Full contents of a collection (chat-context use).
    async fn collection_contents_full(
        &self,
        tenant: TenantId,
        collection_id: &CollectionId,
    ) -> Result<Vec<ContentExtract>>;
}
