//! The per-job worker plan: acquire → gate → debit → (transcribe ∥ vision)
//! → translate → extract → assemble → checkpoint → persist → complete.
//!
//! Execution is at-least-once: the credit debit is skipped when the job row
//! already carries a deduction, and content writes are idempotent for URL
//! sources through dedup by natural identifier. Cancellation is observed at
//! exactly one commit point; in-flight stages run to completion and their
//! outputs are discarded.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use vmem_domain::constants::lang::language_name;
use vmem_domain::entities::{
    ContentExtract, IngestJob, JobSource, JobStatus, SampledFrame, SourceStats, SpeechTask,
    Transcription,
};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{
    BillingInterface, BlobStorage, JobControllerInterface, MediaDownloader, MediaToolkit,
    SpeakerLabeler, VectorMemoryInterface, VisionProvider,
};
use vmem_domain::utils::{extract_youtube_id, is_youtube_url};
use vmem_domain::value_objects::JobId;

use crate::extractor::{ContentExtractor, ExtractRequest};
use crate::thumbnails::{rewrite_manifest_ids, save_thumbnails};
use crate::timeline::build_timeline;
use crate::transcriber::TranscriptionEngine;
use crate::transcript::{format_transcript, merge_speaker_turns};
use crate::translator::Translator;
use crate::vision::analyze_frames;

use super::progress::{ProgressSender, ProgressWriter};

const DEBIT_REASON: &str = "video_processing";

/// Pipeline tuning shared by every job one worker runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Whether to run the speaker labeler (off on small instances)
    pub detect_speakers: bool,
    /// Base URL thumbnails are served from (timeline entries link here)
    pub api_base_url: String,
    /// Local thumbnail root (dedup renames per-content directories here)
    pub thumbnails_dir: PathBuf,
    /// Seconds between sampled frames
    pub frame_interval_seconds: f64,
    /// Hard cap on sampled frames
    pub max_frames: usize,
}

/// How a pipeline run ended (errors are mapped to `fail()` by the caller).
#[derive(Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    /// The cancellation checkpoint observed a user cancel; all artifacts
    /// were discarded.
    Cancelled,
}

struct AcquiredMedia {
    audio: PathBuf,
    video: PathBuf,
    duration_minutes: f64,
    stats: Option<SourceStats>,
    source_url: Option<String>,
}

/// One worker's ingestion pipeline over the injected ports.
pub struct IngestPipeline {
    jobs: Arc<dyn JobControllerInterface>,
    billing: Arc<dyn BillingInterface>,
    memory: Arc<dyn VectorMemoryInterface>,
    downloader: Arc<dyn MediaDownloader>,
    toolkit: Arc<dyn MediaToolkit>,
    engine: TranscriptionEngine,
    labeler: Option<Arc<dyn SpeakerLabeler>>,
    vision: Arc<dyn VisionProvider>,
    translator: Translator,
    extractor: ContentExtractor,
    blob: Arc<dyn BlobStorage>,
    blob_fallback: Option<Arc<dyn BlobStorage>>,
    config: PipelineConfig,
}

impl IngestPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn JobControllerInterface>,
        billing: Arc<dyn BillingInterface>,
        memory: Arc<dyn VectorMemoryInterface>,
        downloader: Arc<dyn MediaDownloader>,
        toolkit: Arc<dyn MediaToolkit>,
        engine: TranscriptionEngine,
        labeler: Option<Arc<dyn SpeakerLabeler>>,
        vision: Arc<dyn VisionProvider>,
        translator: Translator,
        extractor: ContentExtractor,
        blob: Arc<dyn BlobStorage>,
        blob_fallback: Option<Arc<dyn BlobStorage>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            jobs,
            billing,
            memory,
            downloader,
            toolkit,
            engine,
            labeler,
            vision,
            translator,
            extractor,
            blob,
            blob_fallback,
            config,
        }
    }

    /// Entry point for one dequeued job. Never returns an error: every
    /// failure is translated to `fail()` (which refunds when credits were
    /// deducted) so the queue layer sees a settled job either way.
    pub async fn run(&self, job_id: JobId) {
        let job = match self.jobs.get(&job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(%job_id, "dequeued job row no longer exists");
                return;
            }
            Err(e) => {
                error!(%job_id, error = %e, "could not load job row");
                return;
            }
        };

        match self.jobs.start(&job_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(%job_id, "job no longer queued (cancelled before pickup)");
                return;
            }
            Err(e) => {
                error!(%job_id, error = %e, "could not mark job running");
                return;
            }
        }

        match self.execute(&job).await {
            Ok(PipelineOutcome::Completed) => info!(%job_id, "job completed"),
            Ok(PipelineOutcome::Cancelled) => info!(%job_id, "job cancelled, output discarded"),
            Err(e) => {
                error!(%job_id, error = %e, "job failed");
                if let Err(fail_err) = self.jobs.fail(&job_id, &e.to_string()).await {
                    error!(%job_id, error = %fail_err, "could not record job failure");
                }
            }
        }
    }

    async fn execute(&self, job: &IngestJob) -> Result<PipelineOutcome> {
        let writer = ProgressWriter::spawn(Arc::clone(&self.jobs), job.id);
        let progress = writer.sender();

        let result = self.execute_inner(job, &progress).await;

        writer.finish().await;
        result
    }

    async fn execute_inner(
        &self,
        job: &IngestJob,
        progress: &ProgressSender,
    ) -> Result<PipelineOutcome> {
        // Cookies live in a scope-bound temp file, removed on every exit
        // path (including errors) when this guard drops.
        let cookie_file = self.write_cookie_file(job)?;
        let cookie_path = cookie_file.as_ref().map(tempfile::NamedTempFile::path);

        // 1. Acquire source.
        let media = self.acquire(job, cookie_path, progress).await?;

        // 2. Duration gate. No credits have been deducted yet, so a deny
        // fails the job without touching the ledger.
        if media.duration_minutes > 0.0 {
            let check = self
                .billing
                .check_duration(job.tenant, media.duration_minutes)
                .await?;
            if !check.allowed {
                let upgrade = check
                    .required_tier
                    .map(|t| format!(" Upgrade to {} for longer videos.", t.display_name()))
                    .unwrap_or_default();
                return Err(Error::quota_denied(format!(
                    "Video is {} min. Your plan allows up to {} min.{upgrade}",
                    media.duration_minutes as i64, check.max_duration_minutes,
                )));
            }
        }

        // 3. Credit debit, guarded for at-least-once execution: a retry of
        // a job that already paid must not pay again.
        if job.credits_deducted == 0 {
            let cost = self
                .billing
                .video_cost(media.duration_minutes, job.settings.analyze_frames);
            self.billing
                .deduct(
                    job.tenant,
                    cost,
                    DEBIT_REASON,
                    Some(job.id),
                    &format!("Video processing ({} min)", media.duration_minutes as i64),
                )
                .await?;
            self.jobs.record_deduction(&job.id, cost).await?;
            debug!(job_id = %job.id, cost, "credits deducted");
        } else {
            debug!(job_id = %job.id, "credits already deducted, skipping debit (retry)");
        }

        // 4. Parallel stage: audio and vision tracks advance independently,
        // publishing through the shared serialized progress writer. Either
        // failing fails the whole stage.
        let audio_track = self.audio_track(&media.audio, job, progress);
        let vision_track = self.vision_track(&media.video, job, progress);
        let (transcription, (frames, frame_descriptions, frame_analyses)) =
            tokio::try_join!(audio_track, vision_track)?;

        let segments = transcription.segments;
        let mut transcript_text = transcription.text;
        let mut formatted_transcript = format_transcript(&segments);

        let detected_lang = if transcription.language.is_empty() {
            "en".to_owned()
        } else {
            transcription.language
        };
        let detected_lang_name = language_name(&detected_lang).to_owned();

        // 5. Optional translation. A target equal to the detected language
        // is a no-op; an "en" target was already handled by the speech
        // service's translate task.
        let requested = job.settings.language.as_deref();
        let mut translated_to: Option<String> = None;
        if requested == Some("en") && detected_lang != "en" {
            translated_to = Some("en".to_owned());
            debug!("speech service already translated to English during transcription");
        } else if let Some(target) = requested {
            if target != "auto" && target != detected_lang {
                progress.send(85.0, format!("Translating from {detected_lang_name}"));
                let (raw, formatted) = self
                    .translator
                    .translate_transcript(&transcript_text, &formatted_transcript, target)
                    .await;
                transcript_text = raw;
                formatted_transcript = formatted;
                translated_to = Some(target.to_owned());
            }
        }

        // 6. Extraction.
        progress.send(86.0, "Extracting information");
        let request = ExtractRequest {
            transcript: &transcript_text,
            frame_descriptions: &frame_descriptions,
            duration_seconds: if media.duration_minutes > 0.0 {
                Some((media.duration_minutes * 60.0) as i64)
            } else {
                None
            },
            mode: job.mode,
            source_url: media.source_url.as_deref(),
            source_video: media.video.to_str(),
            stats: media.stats.as_ref(),
            formatted_transcript: &formatted_transcript,
            language: job.settings.language.as_deref(),
        };
        let mut content = self.extractor.extract(&request).await?;
        content.segments = segments.clone();

        // Thumbnails (cache-tier artifacts; may be garbage-collected).
        if !frames.is_empty() {
            let manifest = save_thumbnails(
                &frames,
                &content.id,
                self.toolkit.as_ref(),
                self.blob.as_ref(),
                self.blob_fallback.as_ref(),
            )
            .await?;
            if !manifest.is_empty() {
                content.set_thumbnails(&manifest);
            }
        }

        if let Some(url) = &media.source_url {
            if let Some(video_id) = extract_youtube_id(url) {
                content.metadata.insert(
                    "youtube_thumbnail".to_owned(),
                    serde_json::Value::String(format!(
                        "https://img.youtube.com/vi/{video_id}/mqdefault.jpg"
                    )),
                );
            }
        }

        // 7. Timeline assembly.
        if !content.segments.is_empty() && !frame_descriptions.is_empty() {
            content.timeline = Some(build_timeline(
                &content.segments,
                &frame_descriptions,
                Some(&frame_analyses),
                Some(content.id.as_str()),
                &self.config.api_base_url,
            ));
        }
        if !frame_analyses.is_empty() {
            content.frame_analyses = Some(frame_analyses);
        }

        content.set_detected_language(&detected_lang, &detected_lang_name);
        if let Some(target) = &translated_to {
            content.set_translated_to(target, language_name(target));
        }

        progress.send(95.0, "Saving");

        // 8. Cancellation checkpoint, the unique commit point. Everything
        // before this line is discardable work.
        if let Some(fresh) = self.jobs.get(&job.id).await? {
            if fresh.status == JobStatus::Cancelled {
                info!(job_id = %job.id, "cancelled by user, skipping save");
                return Ok(PipelineOutcome::Cancelled);
            }
        }

        // 9. Storage gate. Credits were deducted in step 3, so the deny
        // error routes through fail(), which refunds automatically.
        content.file_size_bytes = file_size_of(&media.video).await;
        if content.file_size_bytes > 0 {
            let check = self
                .billing
                .check_storage(job.tenant, content.file_size_bytes)
                .await?;
            if !check.allowed {
                return Err(Error::quota_denied(format!(
                    "Storage full: using {:.0} MB of {} MB. Upgrade your plan for more storage.",
                    check.used_mb, check.limit_mb,
                )));
            }
        }

        // 10. Dedup by source identity: the retained row keeps its id, and
        // thumbnail ownership transfers to it.
        if let Some(url) = &media.source_url {
            if let Some(existing) = self.memory.find_by_source_url(job.tenant, url).await? {
                if existing != content.id {
                    info!(job_id = %job.id, retained = %existing, abandoned = %content.id,
                        "dedup: overwriting existing content for the same source");
                    self.transfer_thumbnails(&content, &existing).await;
                    let mut manifest = content.thumbnails();
                    rewrite_manifest_ids(&mut manifest, &content.id, &existing);
                    content.set_thumbnails(&manifest);
                    content.id = existing;
                }
            }
        }

        // 11. Persist content, entity vectors, and collection membership.
        let stored_id = self.memory.add(job.tenant, &content).await?;
        if let Some(collection) = &job.settings.collection_id {
            self.memory
                .add_to_collection(job.tenant, &stored_id, collection)
                .await?;
            debug!(job_id = %job.id, %collection, "added to collection");
        }

        // 12. Complete.
        let result = serde_json::to_value(&content)?;
        if !self.jobs.complete(&job.id, &result).await? {
            // A cancel slipped in between the checkpoint and this write;
            // the job stays cancelled.
            warn!(job_id = %job.id, "complete lost a race with cancellation");
            return Ok(PipelineOutcome::Cancelled);
        }
        Ok(PipelineOutcome::Completed)
    }

    fn write_cookie_file(&self, job: &IngestJob) -> Result<Option<tempfile::NamedTempFile>> {
        let Some(cookies) = &job.settings.cookies else {
            return Ok(None);
        };
        if !is_youtube_url(job.source.as_str()) {
            return Ok(None);
        }
        let mut file = tempfile::Builder::new()
            .prefix("vmem_cookies_")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| Error::media_with_source("create cookies temp file", e))?;
        file.write_all(cookies.as_bytes())
            .map_err(|e| Error::media_with_source("write cookies temp file", e))?;
        Ok(Some(file))
    }

    async fn acquire(
        &self,
        job: &IngestJob,
        cookies: Option<&Path>,
        progress: &ProgressSender,
    ) -> Result<AcquiredMedia> {
        match &job.source {
            JobSource::Url(url) => {
                progress.send(2.0, "Downloading audio & metadata...");
                let (audio, metadata) = self
                    .downloader
                    .download_audio_with_metadata(url, cookies)
                    .await?;
                debug!(job_id = %job.id, audio = %audio.display(),
                    duration_min = metadata.duration_seconds / 60.0, "audio downloaded");

                let video = if job.settings.analyze_frames {
                    progress.send(8.0, "Downloading video...");
                    self.downloader.download_video(url, cookies).await?
                } else {
                    audio.clone()
                };
                progress.send(15.0, "Downloaded");

                let stats = metadata.stats.filter(SourceStats::is_meaningful);
                Ok(AcquiredMedia {
                    audio,
                    video,
                    duration_minutes: metadata.duration_seconds / 60.0,
                    stats,
                    source_url: Some(url.clone()),
                })
            }
            JobSource::Upload(path) => {
                let path = PathBuf::from(path);
                // A failed probe is non-fatal; the duration gate simply
                // does not run for media of unknown length.
                let duration_minutes = match self.toolkit.probe(&path).await {
                    Ok(info) => info.duration_seconds / 60.0,
                    Err(e) => {
                        warn!(job_id = %job.id, error = %e, "duration probe failed, proceeding");
                        0.0
                    }
                };
                Ok(AcquiredMedia {
                    audio: path.clone(),
                    video: path,
                    duration_minutes,
                    stats: None,
                    source_url: None,
                })
            }
        }
    }

    /// Audio track: transcribe, optionally label speakers.
    async fn audio_track(
        &self,
        audio: &Path,
        job: &IngestJob,
        progress: &ProgressSender,
    ) -> Result<Transcription> {
        progress.send(15.0, "Transcribing audio...");

        // An English target uses the speech service's translate task
        // directly instead of a second LLM pass.
        let task = if job.settings.language.as_deref() == Some("en") {
            SpeechTask::Translate
        } else {
            SpeechTask::Transcribe
        };

        let mut transcription = self.engine.transcribe(audio, None, task).await?;
        progress.send(30.0, "Transcribed");

        if self.config.detect_speakers {
            if let Some(labeler) = &self.labeler {
                progress.send(30.0, "Detecting speakers...");
                match labeler.diarize(audio).await {
                    Ok(turns) => {
                        transcription.segments =
                            merge_speaker_turns(&transcription.segments, &turns);
                    }
                    Err(e) => warn!(job_id = %job.id, error = %e, "speaker detection skipped"),
                }
            }
        }

        progress.send(40.0, "Transcript ready");
        Ok(transcription)
    }

    /// Vision track: sample frames, caption them with bounded parallelism.
    /// Skipped entirely when frame analysis is off.
    async fn vision_track(
        &self,
        video: &Path,
        job: &IngestJob,
        progress: &ProgressSender,
    ) -> Result<(
        Vec<SampledFrame>,
        Vec<String>,
        Vec<vmem_domain::entities::FrameAnalysis>,
    )> {
        if !job.settings.analyze_frames {
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }

        progress.send(42.0, "Extracting frames...");
        let frames = self
            .toolkit
            .sample_frames(
                video,
                self.config.frame_interval_seconds,
                self.config.max_frames,
            )
            .await?;
        progress.send(45.0, format!("Extracted {} frames", frames.len()));

        let frame_progress = progress.clone();
        let (descriptions, analyses) =
            analyze_frames(&frames, Arc::clone(&self.vision), move |done, total| {
                let pct = 45.0 + (done as f64 / total.max(1) as f64) * 40.0;
                frame_progress.send(pct, format!("Analyzing frame {done}/{total}"));
            })
            .await?;

        progress.send(85.0, "Frames analyzed");
        Ok((frames, descriptions, analyses))
    }

    /// Move the local thumbnail directory from the abandoned id to the
    /// retained id. Best-effort: blob-stored thumbnails keep working via
    /// the rewritten manifest.
    async fn transfer_thumbnails(
        &self,
        content: &ContentExtract,
        retained: &vmem_domain::value_objects::ContentId,
    ) {
        let new_dir = self.config.thumbnails_dir.join(content.id.as_str());
        let old_dir = self.config.thumbnails_dir.join(retained.as_str());
        if tokio::fs::metadata(&new_dir).await.is_ok() {
            let _ = tokio::fs::remove_dir_all(&old_dir).await;
            if let Err(e) = tokio::fs::rename(&new_dir, &old_dir).await {
                warn!(error = %e, "thumbnail directory transfer failed");
            }
        }
    }
}

async fn file_size_of(path: &Path) -> i64 {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() as i64)
        .unwrap_or(0)
}
