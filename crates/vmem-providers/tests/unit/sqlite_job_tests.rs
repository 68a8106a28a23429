//! Job repository semantics at the SQL level, against in-memory SQLite.

use vmem_domain::entities::{IngestJob, IngestMode, JobSettings, JobSource, JobStatus};
use vmem_domain::ports::JobRepository;
use vmem_domain::value_objects::TenantId;
use vmem_providers::{SqliteExecutor, SqliteJobRepository};

const TENANT: TenantId = TenantId::new(42);

async fn repo() -> SqliteJobRepository {
    let executor = SqliteExecutor::connect_in_memory().await.unwrap();
    SqliteJobRepository::new(executor)
}

fn new_job() -> IngestJob {
    IngestJob::new(
        TENANT,
        JobSource::from_raw("https://example.com/video?id=ABC"),
        IngestMode::General,
        JobSettings::default(),
    )
}

#[tokio::test]
async fn create_then_get_round_trips_the_row() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();

    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, job.id);
    assert_eq!(loaded.tenant, TENANT);
    assert_eq!(loaded.status, JobStatus::Queued);
    assert_eq!(loaded.source.as_str(), job.source.as_str());
    assert!(loaded.source.is_url());
    assert_eq!(loaded.settings.analyze_frames, job.settings.analyze_frames);
    assert_eq!(loaded.credits_deducted, 0);
    assert!(loaded.result.is_none());
}

#[tokio::test]
async fn mark_running_claims_queued_and_reclaims_running_jobs() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();

    assert!(repo.mark_running(&job.id).await.unwrap());
    let first_start = repo.get(&job.id).await.unwrap().unwrap().started_at;

    // A queue re-delivery after a worker crash re-enters the job; the
    // original start time is preserved.
    assert!(repo.mark_running(&job.id).await.unwrap());
    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Running);
    assert_eq!(loaded.started_at, first_start);

    // Terminal jobs refuse the claim.
    repo.cancel(&job.id, TENANT).await.unwrap();
    assert!(!repo.mark_running(&job.id).await.unwrap());
}

#[tokio::test]
async fn progress_is_monotonic_and_respects_terminal_states() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();
    repo.mark_running(&job.id).await.unwrap();

    assert!(repo.update_progress(&job.id, 45.0, Some("Extracting frames...")).await.unwrap());
    assert!(repo.update_progress(&job.id, 30.0, Some("late writer")).await.unwrap());
    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.progress, 45.0);

    repo.cancel(&job.id, TENANT).await.unwrap();
    assert!(!repo.update_progress(&job.id, 85.0, Some("Analyzing frame 12/20")).await.unwrap());
    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Cancelled);
    assert_eq!(loaded.progress, 45.0);
}

#[tokio::test]
async fn complete_only_applies_from_running() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();

    // Not yet running.
    assert!(!repo.complete(&job.id, &serde_json::json!({})).await.unwrap());

    repo.mark_running(&job.id).await.unwrap();
    repo.cancel(&job.id, TENANT).await.unwrap();
    assert!(!repo.complete(&job.id, &serde_json::json!({})).await.unwrap());

    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn completed_row_stores_the_result_payload() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();
    repo.mark_running(&job.id).await.unwrap();

    let result = serde_json::json!({"id": "content_abc", "title": "T"});
    assert!(repo.complete(&job.id, &result).await.unwrap());

    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Completed);
    assert_eq!(loaded.progress, 100.0);
    assert_eq!(loaded.result, Some(result));
    assert!(loaded.completed_at.is_some());
}

#[tokio::test]
async fn fail_is_blocked_on_terminal_rows() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();
    repo.mark_running(&job.id).await.unwrap();
    repo.cancel(&job.id, TENANT).await.unwrap();

    assert!(!repo.fail(&job.id, "late error").await.unwrap());
    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, JobStatus::Cancelled);
    assert!(loaded.error.is_none());
}

#[tokio::test]
async fn cancel_requires_the_owning_tenant() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();

    assert!(!repo.cancel(&job.id, TenantId::new(999)).await.unwrap());
    assert!(repo.cancel(&job.id, TENANT).await.unwrap());
    // Terminal now: a second cancel reports false.
    assert!(!repo.cancel(&job.id, TENANT).await.unwrap());
}

#[tokio::test]
async fn delete_only_removes_terminal_rows() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();

    assert!(!repo.delete(&job.id, TENANT).await.unwrap());
    repo.mark_running(&job.id).await.unwrap();
    repo.fail(&job.id, "boom").await.unwrap();
    assert!(repo.delete(&job.id, TENANT).await.unwrap());
    assert!(repo.get(&job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn credits_deducted_is_set_at_most_once() {
    let repo = repo().await;
    let job = new_job();
    repo.create(&job).await.unwrap();

    repo.set_credits_deducted(&job.id, 5).await.unwrap();
    repo.set_credits_deducted(&job.id, 99).await.unwrap();

    let loaded = repo.get(&job.id).await.unwrap().unwrap();
    assert_eq!(loaded.credits_deducted, 5);
}

#[tokio::test]
async fn list_filters_by_status_and_limits() {
    let repo = repo().await;
    let a = new_job();
    let b = new_job();
    let c = new_job();
    for job in [&a, &b, &c] {
        repo.create(job).await.unwrap();
    }
    repo.mark_running(&a.id).await.unwrap();
    repo.fail(&a.id, "x").await.unwrap();

    let all = repo.list(TENANT, 50, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let failed = repo.list(TENANT, 50, Some(JobStatus::Failed)).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, a.id);
    assert_eq!(failed[0].error.as_deref(), Some("x"));

    let limited = repo.list(TENANT, 2, None).await.unwrap();
    assert_eq!(limited.len(), 2);

    // Other tenants see nothing.
    assert!(repo.list(TenantId::new(999), 50, None).await.unwrap().is_empty());
}
