//! Shared in-memory fakes for vmem-application tests.
//!
//! The fakes mirror the SQL semantics the real repositories implement
//! (conditional lifecycle updates in particular), so service tests exercise
//! the same contracts the production stack relies on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use vmem_domain::entities::{
    CreditTransaction, DownloadMetadata, IngestJob, JobStatus, JobSummary, MediaInfo,
    SampledFrame, SpeechTask, Subscription, Transcription, TranscriptSegment, TransactionKind,
};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{
    CacheProvider, ContentRecord, ContentRepository, CreditRepository, Dispatcher,
    EmbeddingProvider, EntityRecord, JobRepository, MediaDownloader, MediaToolkit,
    SpeechProvider, StoredVector, VisionProvider,
};
use vmem_domain::value_objects::{
    CollectionId, CollectionInfo, ContentId, Embedding, JobId, TenantId,
};

// ============================================================================
// Jobs
// ============================================================================

/// In-memory job repository with the production conditional-update rules.
#[derive(Default)]
pub struct FakeJobRepository {
    pub jobs: Mutex<HashMap<JobId, IngestJob>>,
}

#[async_trait]
impl JobRepository for FakeJobRepository {
    async fn create(&self, job: &IngestJob) -> Result<()> {
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<IngestJob>> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn list(
        &self,
        tenant: TenantId,
        limit: usize,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobSummary>> {
        let jobs = self.jobs.lock().unwrap();
        let mut rows: Vec<&IngestJob> = jobs
            .values()
            .filter(|j| j.tenant == tenant)
            .filter(|j| status.is_none_or(|s| j.status == s))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|j| JobSummary {
                id: j.id,
                status: j.status,
                progress: j.progress,
                title: j.title.clone(),
                source: j.source.as_str().to_owned(),
                mode: j.mode,
                error: j.error.clone(),
                started_at: j.started_at,
                completed_at: j.completed_at,
            })
            .collect())
    }

    async fn mark_running(&self, job_id: &JobId) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id) {
            Some(job) if matches!(job.status, JobStatus::Queued | JobStatus::Running) => {
                job.status = JobStatus::Running;
                if job.started_at.is_none() {
                    job.started_at = Some(chrono::Utc::now());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_progress(
        &self,
        job_id: &JobId,
        progress: f64,
        status_text: Option<&str>,
    ) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id) {
            Some(job) if !job.status.is_terminal() => {
                job.progress = job.progress.max(progress.min(100.0));
                if let Some(text) = status_text {
                    job.status_text = Some(text.to_owned());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete(&self, job_id: &JobId, result: &serde_json::Value) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.status = JobStatus::Completed;
                job.progress = 100.0;
                job.completed_at = Some(chrono::Utc::now());
                job.result = Some(result.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail(&self, job_id: &JobId, error: &str) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id) {
            Some(job) if !job.status.is_terminal() => {
                job.status = JobStatus::Failed;
                job.error = Some(error.to_owned());
                job.completed_at = Some(chrono::Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn cancel(&self, job_id: &JobId, tenant: TenantId) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(job_id) {
            Some(job) if job.tenant == tenant && !job.status.is_terminal() => {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(chrono::Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, job_id: &JobId, tenant: TenantId) -> Result<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get(job_id) {
            Some(job) if job.tenant == tenant && job.status.is_terminal() => {
                jobs.remove(job_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_credits_deducted(&self, job_id: &JobId, credits: i64) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id) {
            job.credits_deducted = credits;
        }
        Ok(())
    }
}

// ============================================================================
// Credits
// ============================================================================

#[derive(Default)]
pub struct FakeCreditRepository {
    pub subscriptions: Mutex<HashMap<TenantId, Subscription>>,
    pub transactions: Mutex<Vec<CreditTransaction>>,
}

impl FakeCreditRepository {
    /// Ledger-derived balance, for invariant assertions.
    pub fn ledger_sum(&self, tenant: TenantId) -> i64 {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.tenant == tenant)
            .map(|t| t.delta)
            .sum()
    }

    pub fn count_kind(&self, tenant: TenantId, kind: TransactionKind) -> usize {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.tenant == tenant && t.kind == kind)
            .count()
    }
}

#[async_trait]
impl CreditRepository for FakeCreditRepository {
    async fn get_subscription(&self, tenant: TenantId) -> Result<Option<Subscription>> {
        Ok(self.subscriptions.lock().unwrap().get(&tenant).cloned())
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.tenant, subscription.clone());
        Ok(())
    }

    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.tenant, subscription.clone());
        Ok(())
    }

    async fn try_deduct(&self, tenant: TenantId, amount: i64) -> Result<bool> {
        let mut subs = self.subscriptions.lock().unwrap();
        let Some(sub) = subs.get_mut(&tenant) else {
            return Ok(false);
        };
        if sub.monthly_remaining + sub.topup_balance < amount {
            return Ok(false);
        }
        let from_monthly = amount.min(sub.monthly_remaining);
        sub.monthly_remaining -= from_monthly;
        sub.topup_balance -= amount - from_monthly;
        Ok(true)
    }

    async fn credit_back(&self, tenant: TenantId, amount: i64, monthly_cap: i64) -> Result<bool> {
        let mut subs = self.subscriptions.lock().unwrap();
        let Some(sub) = subs.get_mut(&tenant) else {
            return Ok(false);
        };
        let to_monthly = amount.min((monthly_cap - sub.monthly_remaining).max(0));
        sub.monthly_remaining += to_monthly;
        sub.topup_balance += amount - to_monthly;
        Ok(true)
    }

    async fn append_transaction(&self, tx: &CreditTransaction) -> Result<()> {
        let mut transactions = self.transactions.lock().unwrap();
        let mut row = tx.clone();
        row.id = transactions.len() as i64 + 1;
        transactions.push(row);
        Ok(())
    }

    async fn has_transaction(
        &self,
        tenant: TenantId,
        job_id: &JobId,
        kind: TransactionKind,
    ) -> Result<bool> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .any(|t| t.tenant == tenant && t.job_id.as_ref() == Some(job_id) && t.kind == kind))
    }

    async fn list_transactions(
        &self,
        tenant: TenantId,
        limit: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let transactions = self.transactions.lock().unwrap();
        Ok(transactions
            .iter()
            .rev()
            .filter(|t| t.tenant == tenant)
            .take(limit)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Contents
// ============================================================================

#[derive(Default)]
pub struct FakeContentRepository {
    /// Insertion-ordered (tenant, record) rows; later upserts replace in place.
    pub contents: Mutex<Vec<ContentRecord>>,
    pub entities: Mutex<Vec<(TenantId, EntityRecord)>>,
    pub collections: Mutex<Vec<(TenantId, CollectionInfo)>>,
}

#[async_trait]
impl ContentRepository for FakeContentRepository {
    async fn upsert(&self, record: &ContentRecord) -> Result<()> {
        let mut contents = self.contents.lock().unwrap();
        if let Some(existing) = contents
            .iter_mut()
            .find(|c| c.tenant == record.tenant && c.id == record.id)
        {
            *existing = record.clone();
        } else {
            contents.push(record.clone());
        }
        Ok(())
    }

    async fn replace_entities(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        entities: &[EntityRecord],
    ) -> Result<()> {
        let mut rows = self.entities.lock().unwrap();
        rows.retain(|(t, e)| !(*t == tenant && &e.content_id == content_id));
        rows.extend(entities.iter().map(|e| (tenant, e.clone())));
        Ok(())
    }

    async fn get(&self, tenant: TenantId, content_id: &ContentId) -> Result<Option<serde_json::Value>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.tenant == tenant && &c.id == content_id)
            .map(|c| c.full_content.clone()))
    }

    async fn list(&self, tenant: TenantId) -> Result<Vec<serde_json::Value>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|c| c.tenant == tenant)
            .map(|c| c.full_content.clone())
            .collect())
    }

    async fn vectors(
        &self,
        tenant: TenantId,
        content_type: Option<&str>,
    ) -> Result<Vec<StoredVector>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tenant == tenant)
            .filter(|c| content_type.is_none_or(|t| c.content_type == t))
            .map(|c| StoredVector {
                id: c.id.clone(),
                content_type: c.content_type.clone(),
                collections: c.collections.clone(),
                embedding: c.embedding.clone(),
                full_content: c.full_content.clone(),
            })
            .collect())
    }

    async fn entity_vectors(&self, tenant: TenantId) -> Result<Vec<EntityRecord>> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == tenant)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn find_by_source_fragment(
        &self,
        tenant: TenantId,
        fragment: &str,
    ) -> Result<Option<ContentId>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.tenant == tenant && c.source_url.contains(fragment))
            .map(|c| c.id.clone()))
    }

    async fn find_by_source_exact(
        &self,
        tenant: TenantId,
        url: &str,
    ) -> Result<Option<ContentId>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|c| c.tenant == tenant && c.source_url == url)
            .map(|c| c.id.clone()))
    }

    async fn update_full_content(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        content: &serde_json::Value,
    ) -> Result<bool> {
        let mut contents = self.contents.lock().unwrap();
        match contents
            .iter_mut()
            .find(|c| c.tenant == tenant && &c.id == content_id)
        {
            Some(row) => {
                row.full_content = content.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_collections(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collections: &[CollectionId],
    ) -> Result<bool> {
        let mut contents = self.contents.lock().unwrap();
        match contents
            .iter_mut()
            .find(|c| c.tenant == tenant && &c.id == content_id)
        {
            Some(row) => {
                row.collections = collections.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_collections_of(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
    ) -> Result<Option<Vec<CollectionId>>> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.tenant == tenant && &c.id == content_id)
            .map(|c| c.collections.clone()))
    }

    async fn delete(&self, tenant: TenantId, content_id: &ContentId) -> Result<bool> {
        let mut contents = self.contents.lock().unwrap();
        let before = contents.len();
        contents.retain(|c| !(c.tenant == tenant && &c.id == content_id));
        self.entities
            .lock()
            .unwrap()
            .retain(|(t, e)| !(*t == tenant && &e.content_id == content_id));
        Ok(contents.len() < before)
    }

    async fn storage_used_bytes(&self, tenant: TenantId) -> Result<i64> {
        Ok(self
            .contents
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.tenant == tenant)
            .map(|c| c.file_size_bytes)
            .sum())
    }

    async fn create_collection(&self, tenant: TenantId, info: &CollectionInfo) -> Result<()> {
        self.collections.lock().unwrap().push((tenant, info.clone()));
        Ok(())
    }

    async fn list_collections(&self, tenant: TenantId) -> Result<Vec<CollectionInfo>> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|(t, _)| *t == tenant)
            .map(|(_, info)| info.clone())
            .collect())
    }

    async fn delete_collection(&self, tenant: TenantId, id: &CollectionId) -> Result<bool> {
        let mut collections = self.collections.lock().unwrap();
        let before = collections.len();
        collections.retain(|(t, info)| !(*t == tenant && &info.id == id));
        Ok(collections.len() < before)
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Deterministic embedding fake: the vector is derived from letter counts,
/// so lexically similar texts land near each other and tests can reason
/// about ranking.
pub struct FakeEmbeddingProvider;

impl FakeEmbeddingProvider {
    fn vector_for(text: &str) -> Vec<f32> {
        let mut v = [1.0f32; 8];
        for (i, letter) in ['a', 'b', 'c', 'd', 'e', 'r', 's', 't'].iter().enumerate() {
            v[i] += text.chars().filter(|c| c == letter).count() as f32;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        v.iter().map(|x| x / norm).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|t| Embedding {
                vector: Self::vector_for(t),
                model: "fake-8d".to_owned(),
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn provider_name(&self) -> &str {
        "fake-embedding"
    }
}

/// No-op cache.
pub struct NullCache;

#[async_trait]
impl CacheProvider for NullCache {
    async fn get_json(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }
    async fn set_json(
        &self,
        _key: &str,
        _value: &str,
        _ttl: Option<std::time::Duration>,
    ) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }
    fn provider_name(&self) -> &str {
        "null"
    }
}

/// Dispatcher that records dispatches without running anything.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub dispatched: Mutex<Vec<JobId>>,
}

#[async_trait]
impl Dispatcher for RecordingDispatcher {
    async fn dispatch(&self, job: &IngestJob) -> Result<()> {
        self.dispatched.lock().unwrap().push(job.id);
        Ok(())
    }
}

/// Speech fake: fixed segments, configurable language.
pub struct FakeSpeechProvider {
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
}

impl Default for FakeSpeechProvider {
    fn default() -> Self {
        Self {
            language: "en".to_owned(),
            segments: vec![
                TranscriptSegment {
                    start: 0.0,
                    end: 8.0,
                    text: "Welcome to the tutorial.".to_owned(),
                    speaker: None,
                },
                TranscriptSegment {
                    start: 8.0,
                    end: 20.0,
                    text: "Today we build an ingestion pipeline.".to_owned(),
                    speaker: None,
                },
            ],
        }
    }
}

#[async_trait]
impl SpeechProvider for FakeSpeechProvider {
    async fn transcribe_file(
        &self,
        _path: &Path,
        _language: Option<&str>,
        _task: SpeechTask,
    ) -> Result<Transcription> {
        Ok(Transcription {
            text: self
                .segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            language: self.language.clone(),
            segments: self.segments.clone(),
        })
    }

    fn max_upload_bytes(&self) -> u64 {
        25 * 1024 * 1024
    }

    fn accepted_extensions(&self) -> &[&str] {
        &[".mp3", ".mp4", ".m4a", ".wav", ".webm"]
    }

    fn provider_name(&self) -> &str {
        "fake-speech"
    }
}

/// Media toolkit fake backed by real temp files where needed.
pub struct FakeToolkit {
    pub duration_seconds: f64,
    pub frames: usize,
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let file_size_bytes = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0) as i64;
        Ok(MediaInfo {
            duration_seconds: self.duration_seconds,
            width: 1280,
            height: 720,
            file_size_bytes,
        })
    }

    async fn strip_to_audio(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    async fn cut_audio_chunk(
        &self,
        path: &Path,
        _start_seconds: f64,
        _duration_seconds: f64,
        chunk_index: usize,
    ) -> Result<PathBuf> {
        let chunk = path.with_extension(format!("chunk{chunk_index}.m4a"));
        tokio::fs::copy(path, &chunk)
            .await
            .map_err(|e| Error::media_with_source("copy chunk", e))?;
        Ok(chunk)
    }

    async fn sample_frames(
        &self,
        _path: &Path,
        interval_seconds: f64,
        max_frames: usize,
    ) -> Result<Vec<SampledFrame>> {
        let count = self.frames.min(max_frames);
        Ok((0..count)
            .map(|i| SampledFrame {
                timestamp: i as f64 * interval_seconds,
                jpeg: vec![0xFF, 0xD8, 0xFF],
            })
            .collect())
    }

    async fn make_thumbnail(&self, jpeg: &[u8], _target_width: u32) -> Result<Vec<u8>> {
        Ok(jpeg.to_vec())
    }
}

/// Downloader fake that materializes a small file on disk (the pipeline
/// stats it for sizes).
pub struct FakeDownloader {
    pub dir: PathBuf,
    pub duration_seconds: f64,
    pub media_id: String,
}

#[async_trait]
impl MediaDownloader for FakeDownloader {
    async fn download_audio_with_metadata(
        &self,
        _url: &str,
        _cookies_file: Option<&Path>,
    ) -> Result<(PathBuf, DownloadMetadata)> {
        let path = self.dir.join(format!("{}.m4a", self.media_id));
        tokio::fs::write(&path, b"fake-audio-bytes")
            .await
            .map_err(|e| Error::media_with_source("write fake audio", e))?;
        Ok((
            path,
            DownloadMetadata {
                duration_seconds: self.duration_seconds,
                title: "Fake Video".to_owned(),
                media_id: self.media_id.clone(),
                stats: None,
            },
        ))
    }

    async fn download_video(&self, _url: &str, _cookies_file: Option<&Path>) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.mp4", self.media_id));
        tokio::fs::write(&path, vec![0u8; 4096])
            .await
            .map_err(|e| Error::media_with_source("write fake video", e))?;
        Ok(path)
    }
}

/// Vision fake with an optional side effect hook on the first call.
pub struct FakeVisionProvider {
    pub on_first_call: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Default for FakeVisionProvider {
    fn default() -> Self {
        Self {
            on_first_call: Mutex::new(None),
        }
    }
}

#[async_trait]
impl VisionProvider for FakeVisionProvider {
    async fn describe_frame(&self, _jpeg: &[u8], _prompt: &str) -> Result<String> {
        if let Some(hook) = self.on_first_call.lock().unwrap().take() {
            hook();
        }
        Ok("A presenter in front of a slide deck.".to_owned())
    }

    fn provider_name(&self) -> &str {
        "fake-vision"
    }
}

/// Chat fake returning a canned extraction payload.
pub struct FakeChatProvider {
    pub response: String,
}

impl Default for FakeChatProvider {
    fn default() -> Self {
        Self {
            response: serde_json::json!({
                "title": "Building an Ingestion Pipeline",
                "summary": "A walkthrough of an asynchronous media pipeline.",
                "content_type": "tutorial",
                "topics": ["pipelines", "async"],
                "key_points": [{"point": "Use a queue", "details": ""}],
                "entities": [
                    {"name": "Redis", "type": "product", "description": "queue backend"},
                    {"name": "Whisper", "type": "product", "description": "speech model"}
                ],
                "action_items": ["Try the pipeline"],
                "quotes": [],
                "resources": [],
                "tags": ["video", "tutorial"]
            })
            .to_string(),
        }
    }
}

#[async_trait]
impl vmem_domain::ports::ChatProvider for FakeChatProvider {
    async fn chat_json(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }

    async fn chat_text(&self, prompt: &str) -> Result<String> {
        // Echo the tail of the prompt, which is the text being translated.
        Ok(prompt
            .rsplit("\n\n")
            .next()
            .unwrap_or_default()
            .to_owned())
    }

    fn provider_name(&self) -> &str {
        "fake-chat"
    }
}

/// Blob fake storing uploads in memory.
#[derive(Default)]
pub struct FakeBlobStorage {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl vmem_domain::ports::BlobStorage for FakeBlobStorage {
    async fn put(&self, bytes: &[u8], logical_path: &str) -> Result<String> {
        let url = format!("mem://{logical_path}");
        self.objects
            .lock()
            .unwrap()
            .insert(url.clone(), bytes.to_vec());
        Ok(url)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::not_found(url))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(url);
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "fake-blob"
    }
}
