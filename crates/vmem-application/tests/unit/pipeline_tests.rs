//! End-to-end pipeline scenarios over in-memory ports: happy path,
//! quota denials, cancellation, dedup, retry safety.

use std::sync::Arc;

use vmem_application::pipeline::{IngestPipeline, PipelineConfig};
use vmem_application::use_cases::{BillingService, JobController, VectorMemory};
use vmem_application::{ContentExtractor, TranscriptionEngine, Translator};
use vmem_domain::entities::{IngestMode, JobSettings, JobStatus, TimelineEntry, TransactionKind};
use vmem_domain::ports::{
    BillingInterface, JobControllerInterface, VectorMemoryInterface,
};
use vmem_domain::value_objects::{JobId, TenantId};

use crate::test_utils::{
    FakeBlobStorage, FakeChatProvider, FakeContentRepository, FakeCreditRepository,
    FakeDownloader, FakeJobRepository, FakeSpeechProvider, FakeToolkit, FakeVisionProvider,
    NullCache, RecordingDispatcher,
};

const TENANT: TenantId = TenantId::new(42);
const URL: &str = "https://www.youtube.com/watch?v=XYZabc12345";

struct Harness {
    pipeline: IngestPipeline,
    controller: Arc<JobController>,
    billing: Arc<BillingService>,
    memory: Arc<VectorMemory>,
    jobs: Arc<FakeJobRepository>,
    credits: Arc<FakeCreditRepository>,
    contents: Arc<FakeContentRepository>,
    vision: Arc<FakeVisionProvider>,
    _tmp: tempfile::TempDir,
}

fn harness(duration_seconds: f64) -> Harness {
    let tmp = tempfile::tempdir().unwrap();

    let jobs = Arc::new(FakeJobRepository::default());
    let credits = Arc::new(FakeCreditRepository::default());
    let contents = Arc::new(FakeContentRepository::default());

    let billing = Arc::new(BillingService::new(credits.clone(), contents.clone()));
    let controller = Arc::new(JobController::new(
        jobs.clone(),
        Arc::new(RecordingDispatcher::default()),
        billing.clone(),
        Arc::new(NullCache),
    ));
    let memory = Arc::new(VectorMemory::new(
        contents.clone(),
        Arc::new(crate::test_utils::FakeEmbeddingProvider),
    ));

    let speech = Arc::new(FakeSpeechProvider::default());
    let toolkit = Arc::new(FakeToolkit {
        duration_seconds,
        frames: 4,
    });
    let downloader = Arc::new(FakeDownloader {
        dir: tmp.path().to_path_buf(),
        duration_seconds,
        media_id: "XYZabc12345".to_owned(),
    });
    let vision = Arc::new(FakeVisionProvider::default());
    let chat = Arc::new(FakeChatProvider::default());

    let pipeline = IngestPipeline::new(
        controller.clone(),
        billing.clone(),
        memory.clone(),
        downloader,
        toolkit.clone(),
        TranscriptionEngine::new(speech, toolkit),
        None,
        vision.clone(),
        Translator::new(chat.clone()),
        ContentExtractor::new(chat),
        Arc::new(FakeBlobStorage::default()),
        None,
        PipelineConfig {
            detect_speakers: false,
            api_base_url: "https://api.test".to_owned(),
            thumbnails_dir: tmp.path().join("thumbnails"),
            frame_interval_seconds: 30.0,
            max_frames: 20,
        },
    );

    Harness {
        pipeline,
        controller,
        billing,
        memory,
        jobs,
        credits,
        contents,
        vision,
        _tmp: tmp,
    }
}

async fn enqueue(h: &Harness, source: &str, settings: JobSettings) -> JobId {
    h.controller
        .enqueue(TENANT, source, IngestMode::General, settings)
        .await
        .unwrap()
}

#[tokio::test]
async fn happy_path_url_produces_content_and_charges_credits() {
    // 180 s video, frames on: cost 5.
    let h = harness(180.0);
    let start_balance = h.billing.balance(TENANT).await.unwrap();
    let job_id = enqueue(&h, URL, JobSettings::default()).await;

    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress, 100.0);
    assert!(job.result.is_some());
    assert_eq!(job.credits_deducted, 5);

    assert_eq!(h.billing.balance(TENANT).await.unwrap(), start_balance - 5);

    let stored = h.memory.list(TENANT).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].source_url.as_deref(), Some(URL));

    // Timeline carries at least one transcript paragraph and one vision entry.
    let timeline = stored[0].timeline.as_ref().unwrap();
    assert!(timeline.iter().any(|e| matches!(e, TimelineEntry::Transcript { .. })));
    assert!(timeline.iter().any(|e| matches!(e, TimelineEntry::Vision { .. })));

    // One entity vector per extracted entity.
    assert_eq!(h.contents.entities.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn duration_deny_fails_without_touching_the_ledger() {
    // 240 min video against the free tier's 60 min ceiling.
    let h = harness(240.0 * 60.0);
    let start_balance = h.billing.balance(TENANT).await.unwrap();
    let job_id = enqueue(&h, URL, JobSettings::default()).await;

    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.contains("240"), "error was: {error}");
    assert!(error.contains("60"), "error was: {error}");
    assert!(error.contains("Pro"), "error was: {error}");

    assert_eq!(h.billing.balance(TENANT).await.unwrap(), start_balance);
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Deduct), 0);
    assert!(h.memory.list(TENANT).await.unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_credits_fail_with_required_and_available() {
    let h = harness(180.0);
    // Drain the balance to 2 credits.
    let balance = h.billing.balance(TENANT).await.unwrap();
    h.billing
        .deduct(TENANT, balance - 2, "video_processing", None, "drain")
        .await
        .unwrap();

    let job_id = enqueue(&h, URL, JobSettings::default()).await;
    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.contains("need 5"), "error was: {error}");
    assert!(error.contains("have 2"), "error was: {error}");
    assert_eq!(job.credits_deducted, 0);
}

#[tokio::test]
async fn cancel_mid_vision_discards_output_and_keeps_the_deduction() {
    let h = harness(180.0);
    let start_balance = h.billing.balance(TENANT).await.unwrap();
    let job_id = enqueue(&h, URL, JobSettings::default()).await;

    // The first vision call flips the row to cancelled, as a user would
    // mid-processing. In-flight stages run to completion; the commit
    // checkpoint discards their output.
    {
        let jobs = h.jobs.clone();
        *h.vision.on_first_call.lock().unwrap() = Some(Box::new(move || {
            if let Some(job) = jobs.jobs.lock().unwrap().get_mut(&job_id) {
                job.status = JobStatus::Cancelled;
            }
        }));
    }

    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.result.is_none());
    assert!(h.memory.list(TENANT).await.unwrap().is_empty());

    // Credits remain deducted: cancellation does not refund.
    assert_eq!(h.billing.balance(TENANT).await.unwrap(), start_balance - 5);
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Refund), 0);
}

#[tokio::test]
async fn storage_deny_after_extraction_refunds_the_deduction() {
    use vmem_domain::ports::{ContentRecord, ContentRepository};
    use vmem_domain::value_objects::ContentId;

    let h = harness(180.0);
    // Fill storage to the brim before the job runs.
    let limit_mb = vmem_domain::constants::credits::tier_limits(
        vmem_domain::entities::Tier::Free,
    )
    .storage_limit_mb;
    h.contents
        .upsert(&ContentRecord {
            id: ContentId::new("content_existing"),
            tenant: TENANT,
            title: String::new(),
            content_type: "video".to_owned(),
            mode: "general".to_owned(),
            summary: String::new(),
            topics: vec![],
            tags: vec![],
            collections: vec![],
            source_url: String::new(),
            has_transcript: false,
            full_content: serde_json::json!({"id": "content_existing"}),
            searchable_text: String::new(),
            embedding: vec![],
            file_size_bytes: limit_mb * 1024 * 1024,
        })
        .await
        .unwrap();

    let start_balance = h.billing.balance(TENANT).await.unwrap();
    let job_id = enqueue(&h, URL, JobSettings::default()).await;
    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("Storage full"));

    // Deducted in step 3, refunded on the deny: net zero.
    assert_eq!(h.billing.balance(TENANT).await.unwrap(), start_balance);
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Deduct), 1);
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Refund), 1);

    // Only the pre-existing row remains.
    assert_eq!(h.contents.contents.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_url_overwrites_the_existing_content_row() {
    let h = harness(180.0);

    let first = enqueue(&h, "https://www.youtube.com/watch?v=XYZabc12345", JobSettings::default()).await;
    h.pipeline.run(first).await;
    let first_id = h.memory.list(TENANT).await.unwrap()[0].id.clone();

    // Same video, different surface form.
    let second = enqueue(&h, "https://youtu.be/XYZabc12345", JobSettings::default()).await;
    h.pipeline.run(second).await;

    let stored = h.memory.list(TENANT).await.unwrap();
    assert_eq!(stored.len(), 1, "one row per tenant+identifier");
    assert_eq!(stored[0].id, first_id, "the retained row keeps its id");
    assert_eq!(
        stored[0].source_url.as_deref(),
        Some("https://youtu.be/XYZabc12345"),
        "the row carries the second processing's data"
    );

    // Two deductions, no refunds.
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Deduct), 2);
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Refund), 0);
}

#[tokio::test]
async fn analyze_frames_off_skips_the_vision_track() {
    let h = harness(180.0);
    let start_balance = h.billing.balance(TENANT).await.unwrap();
    let settings = JobSettings {
        analyze_frames: false,
        ..JobSettings::default()
    };
    let job_id = enqueue(&h, URL, settings).await;

    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    // Audio-only price for 3 minutes.
    assert_eq!(job.credits_deducted, 1);
    assert_eq!(h.billing.balance(TENANT).await.unwrap(), start_balance - 1);

    let stored = h.memory.list(TENANT).await.unwrap();
    assert!(stored[0].frame_descriptions.is_empty());
    assert!(stored[0].timeline.is_none());
}

#[tokio::test]
async fn retried_job_with_existing_deduction_does_not_double_debit() {
    let h = harness(180.0);
    let job_id = enqueue(&h, URL, JobSettings::default()).await;

    // Simulate a prior attempt that paid and then crashed before finishing.
    h.controller.record_deduction(&job_id, 5).await.unwrap();

    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.credits_deducted, 5);
    assert_eq!(h.credits.count_kind(TENANT, TransactionKind::Deduct), 0);
}

#[tokio::test]
async fn local_upload_is_ingested_without_a_source_url() {
    let h = harness(120.0);
    let media = h._tmp.path().join("upload.mp4");
    tokio::fs::write(&media, vec![0u8; 2048]).await.unwrap();

    let job_id = enqueue(&h, media.to_str().unwrap(), JobSettings::default()).await;
    h.pipeline.run(job_id).await;

    let job = h.controller.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);

    let stored = h.memory.list(TENANT).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].source_url, None);
    assert_eq!(stored[0].file_size_bytes, 2048);
}
