//! Repository ports over the relational store.
//!
//! All writes that race with other writers (progress vs. cancel, complete
//! vs. fail) are expressed as conditional updates returning whether a row
//! changed, so terminal-state protection lives in one place.

use async_trait::async_trait;
use serde_json::Value;

use crate::entities::{
    CreditTransaction, IngestJob, JobStatus, JobSummary, Subscription, TransactionKind,
};
use crate::error::Result;
use crate::value_objects::{CollectionId, CollectionInfo, ContentId, JobId, TenantId};

// ============================================================================
// Jobs
// ============================================================================

/// Persistence port for ingestion jobs.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Insert a freshly created job row.
    async fn create(&self, job: &IngestJob) -> Result<()>;

    /// Load a full job row (including result and settings).
    async fn get(&self, job_id: &JobId) -> Result<Option<IngestJob>>;

    /// Lightweight projection for list views, newest first. Must not load
    /// the heavy columns (result, settings).
    async fn list(
        &self,
        tenant: TenantId,
        limit: usize,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobSummary>>;

    /// Transition `queued → running` and stamp `started_at`. Re-claiming a
    /// job already in `running` succeeds (a queue re-delivery after a
    /// worker crash re-enters the job); terminal jobs return `false`.
    async fn mark_running(&self, job_id: &JobId) -> Result<bool>;

    /// Write progress and stage text. The update is conditional on the
    /// status not being terminal, and progress never decreases; returns
    /// whether a row changed.
    async fn update_progress(
        &self,
        job_id: &JobId,
        progress: f64,
        status_text: Option<&str>,
    ) -> Result<bool>;

    /// Transition `running → completed` with the result payload. Conditional
    /// on the current status being `running`.
    async fn complete(&self, job_id: &JobId, result: &Value) -> Result<bool>;

    /// Transition to `failed` with an error message. Conditional on the
    /// current status not being terminal.
    async fn fail(&self, job_id: &JobId, error: &str) -> Result<bool>;

    /// Atomically cancel: conditional on the current status not being
    /// terminal. Returns `false` when the job was already terminal.
    async fn cancel(&self, job_id: &JobId, tenant: TenantId) -> Result<bool>;

    /// Remove a job row; only terminal jobs may be deleted.
    async fn delete(&self, job_id: &JobId, tenant: TenantId) -> Result<bool>;

    /// Record the credits deducted for this job (set at most once).
    async fn set_credits_deducted(&self, job_id: &JobId, credits: i64) -> Result<()>;
}

// ============================================================================
// Contents
// ============================================================================

/// The projected columns written alongside the full content JSON.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub id: ContentId,
    pub tenant: TenantId,
    pub title: String,
    pub content_type: String,
    pub mode: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub tags: Vec<String>,
    pub collections: Vec<CollectionId>,
    pub source_url: String,
    pub has_transcript: bool,
    /// The whole `ContentExtract` as JSON
    pub full_content: Value,
    /// Deterministic searchable-text concatenation the embedding was
    /// computed from
    pub searchable_text: String,
    /// Content embedding (fixed process-wide dimension)
    pub embedding: Vec<f32>,
    pub file_size_bytes: i64,
}

/// A stored embedding row loaded for in-process similarity ranking.
#[derive(Debug, Clone)]
pub struct StoredVector {
    pub id: ContentId,
    pub content_type: String,
    pub collections: Vec<CollectionId>,
    pub embedding: Vec<f32>,
    pub full_content: Value,
}

/// One entity vector row (replaced wholesale with its parent content).
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub content_id: ContentId,
    pub entity_name: String,
    pub entity_type: String,
    pub embedding: Vec<f32>,
}

/// Persistence port for content vectors, entity vectors, and collections.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert or overwrite a content row by `(tenant, id)`.
    async fn upsert(&self, record: &ContentRecord) -> Result<()>;

    /// Replace every entity vector belonging to a content.
    async fn replace_entities(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        entities: &[EntityRecord],
    ) -> Result<()>;

    /// Load the full content JSON by id.
    async fn get(&self, tenant: TenantId, content_id: &ContentId) -> Result<Option<Value>>;

    /// All contents for a tenant, newest first.
    async fn list(&self, tenant: TenantId) -> Result<Vec<Value>>;

    /// Load candidate vectors for similarity ranking, optionally filtered
    /// by content type.
    async fn vectors(
        &self,
        tenant: TenantId,
        content_type: Option<&str>,
    ) -> Result<Vec<StoredVector>>;

    /// All entity vectors for a tenant.
    async fn entity_vectors(&self, tenant: TenantId) -> Result<Vec<EntityRecord>>;

    /// Newest content id whose source URL contains the given fragment
    /// (natural-identifier match).
    async fn find_by_source_fragment(
        &self,
        tenant: TenantId,
        fragment: &str,
    ) -> Result<Option<ContentId>>;

    /// Newest content id whose source URL matches verbatim.
    async fn find_by_source_exact(
        &self,
        tenant: TenantId,
        url: &str,
    ) -> Result<Option<ContentId>>;

    /// Replace the stored JSON blob without touching the embedding.
    async fn update_full_content(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        content: &Value,
    ) -> Result<bool>;

    /// Replace the collections membership column.
    async fn set_collections(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collections: &[CollectionId],
    ) -> Result<bool>;

    /// Current collections membership for one content.
    async fn get_collections_of(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
    ) -> Result<Option<Vec<CollectionId>>>;

    /// Delete a content row and its entity vectors.
    async fn delete(&self, tenant: TenantId, content_id: &ContentId) -> Result<bool>;

    /// Total stored media bytes for a tenant (storage quota accounting).
    async fn storage_used_bytes(&self, tenant: TenantId) -> Result<i64>;

    // ---- collections ----

    /// Create a collection row.
    async fn create_collection(&self, tenant: TenantId, info: &CollectionInfo) -> Result<()>;

    /// List collections, newest first.
    async fn list_collections(&self, tenant: TenantId) -> Result<Vec<CollectionInfo>>;

    /// Delete a collection row (contents remain, just unlinked).
    async fn delete_collection(&self, tenant: TenantId, id: &CollectionId) -> Result<bool>;
}

// ============================================================================
// Credits
// ============================================================================

/// Persistence port for subscriptions and the credit ledger.
#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Load a tenant's subscription row.
    async fn get_subscription(&self, tenant: TenantId) -> Result<Option<Subscription>>;

    /// Insert a new subscription row.
    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Overwrite tier, balances, and period start.
    async fn update_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Atomically decrement balances, monthly first then top-up. The update
    /// is conditional on `monthly + topup >= amount`; returns whether it
    /// applied.
    async fn try_deduct(&self, tenant: TenantId, amount: i64) -> Result<bool>;

    /// Atomically credit balances back: monthly up to `monthly_cap`, the
    /// remainder to top-up. Returns whether a subscription row existed.
    async fn credit_back(&self, tenant: TenantId, amount: i64, monthly_cap: i64) -> Result<bool>;

    /// Append one ledger row (`id` and `created_at` are server-assigned).
    async fn append_transaction(&self, tx: &CreditTransaction) -> Result<()>;

    /// Whether a ledger row already exists for `(job, kind)`, the natural
    /// key that makes refunds idempotent.
    async fn has_transaction(
        &self,
        tenant: TenantId,
        job_id: &JobId,
        kind: TransactionKind,
    ) -> Result<bool>;

    /// Recent ledger rows, newest first.
    async fn list_transactions(
        &self,
        tenant: TenantId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>>;
}
