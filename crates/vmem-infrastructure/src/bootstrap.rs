//! Composition root: config → providers → services → pipeline.
//!
//! Wiring is explicit factory code. The only subtlety is the dispatcher
//! cycle in thread-fallback mode (controller → dispatcher → pipeline →
//! controller), broken by installing the pipeline into the dispatcher
//! after construction.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use vmem_application::pipeline::{IngestPipeline, PipelineConfig};
use vmem_application::use_cases::{BillingService, JobController, VectorMemory};
use vmem_application::{ContentExtractor, TranscriptionEngine, Translator};
use vmem_domain::error::Result;
use vmem_domain::ports::{
    BillingInterface, BlobStorage, JobControllerInterface, JobQueue, VectorMemoryInterface,
};
use vmem_providers::{
    FastEmbedProvider, HttpSpeakerLabeler, LocalBlobStorage, MokaCacheProvider,
    OpenAiChatProvider, OpenAiSpeechProvider, OpenAiVisionProvider, RestBlobStorage,
    SqliteContentRepository, SqliteCreditRepository, SqliteExecutor, SqliteJobRepository,
};

use crate::config::{ensure_directories, AppConfig};
use crate::media::{FfmpegToolkit, YtDlpDownloader};
use crate::queue::{InProcessDispatcher, QueueDispatcher, RedisJobQueue};

const JOB_LIST_CACHE_ENTRIES: u64 = 10_000;

/// Everything a process (API side or worker side) needs.
pub struct AppContext {
    pub config: AppConfig,
    pub controller: Arc<dyn JobControllerInterface>,
    pub billing: Arc<dyn BillingInterface>,
    pub memory: Arc<dyn VectorMemoryInterface>,
    pub pipeline: Arc<IngestPipeline>,
    /// Present unless thread-fallback is active.
    pub queue: Option<Arc<dyn JobQueue>>,
}

/// Build the full object graph from configuration.
pub async fn bootstrap(config: AppConfig) -> Result<AppContext> {
    ensure_directories(&config)?;

    // Persistence.
    let database_path = sqlite_path(&config.database.url);
    let executor = SqliteExecutor::connect(&database_path).await?;
    let job_repo = Arc::new(SqliteJobRepository::new(Arc::clone(&executor)));
    let content_repo = Arc::new(SqliteContentRepository::new(Arc::clone(&executor)));
    let credit_repo = Arc::new(SqliteCreditRepository::new(executor));

    // Providers.
    let embedder = Arc::new(FastEmbedProvider::new(config.embedding.model.clone()));
    let speech = Arc::new(OpenAiSpeechProvider::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        config.openai.speech_model.clone(),
    ));
    let vision = Arc::new(OpenAiVisionProvider::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        config.openai.vision_model.clone(),
    ));
    let chat: Arc<OpenAiChatProvider> = Arc::new(OpenAiChatProvider::new(
        config.openai.api_key.clone(),
        config.openai.base_url.clone(),
        config.openai.chat_model.clone(),
    ));
    let cache = Arc::new(MokaCacheProvider::new(JOB_LIST_CACHE_ENTRIES));

    let local_blob: Arc<dyn BlobStorage> = Arc::new(LocalBlobStorage::new(config.thumbnails_dir()));
    let (blob, blob_fallback): (Arc<dyn BlobStorage>, Option<Arc<dyn BlobStorage>>) =
        if config.blob.token.is_empty() {
            (local_blob, None)
        } else {
            (
                Arc::new(RestBlobStorage::new(
                    config.blob.token.clone(),
                    config.blob.api_url.clone(),
                )),
                Some(local_blob),
            )
        };

    let labeler: Option<Arc<dyn vmem_domain::ports::SpeakerLabeler>> =
        if config.media.diarization_url.is_empty() {
            None
        } else {
            Some(Arc::new(HttpSpeakerLabeler::new(
                config.media.diarization_url.clone(),
            )))
        };

    let downloader = Arc::new(YtDlpDownloader::new(
        config.media.ytdlp_bin.clone(),
        config.videos_dir(),
    ));
    let toolkit = Arc::new(FfmpegToolkit::new(
        config.media.ffmpeg_bin.clone(),
        config.media.ffprobe_bin.clone(),
    ));

    // Services.
    let billing: Arc<BillingService> = Arc::new(BillingService::new(
        credit_repo,
        Arc::clone(&content_repo) as _,
    ));
    let memory: Arc<VectorMemory> = Arc::new(VectorMemory::new(content_repo, embedder));

    // Queue or in-process dispatch, invisible to callers either way.
    let (queue, dispatcher, fallback_dispatcher): (
        Option<Arc<dyn JobQueue>>,
        Arc<dyn vmem_domain::ports::Dispatcher>,
        Option<Arc<InProcessDispatcher>>,
    ) = if config.queue.thread_fallback {
        let fallback = Arc::new(InProcessDispatcher::new());
        (None, Arc::clone(&fallback) as _, Some(fallback))
    } else {
        let queue: Arc<dyn JobQueue> =
            Arc::new(RedisJobQueue::connect(&config.queue.url, &config.queue.name).await?);
        let dispatcher = Arc::new(QueueDispatcher::new(
            Arc::clone(&queue),
            config.queue.job_timeout_seconds,
        ));
        (Some(queue), dispatcher as _, None)
    };

    let controller: Arc<JobController> = Arc::new(JobController::new(
        job_repo,
        dispatcher,
        Arc::clone(&billing) as _,
        cache,
    ));

    let pipeline = Arc::new(IngestPipeline::new(
        Arc::clone(&controller) as _,
        Arc::clone(&billing) as _,
        Arc::clone(&memory) as _,
        downloader,
        Arc::clone(&toolkit) as _,
        TranscriptionEngine::new(speech, toolkit),
        labeler,
        vision,
        Translator::new(Arc::clone(&chat) as _),
        ContentExtractor::new(chat),
        blob,
        blob_fallback,
        PipelineConfig {
            detect_speakers: config.media.detect_speakers,
            api_base_url: config.api_base_url.clone(),
            thumbnails_dir: config.thumbnails_dir(),
            frame_interval_seconds: config.media.frame_interval_seconds,
            max_frames: config.media.max_frames,
        },
    ));

    if let Some(fallback) = fallback_dispatcher {
        fallback.install_pipeline(Arc::clone(&pipeline));
    }

    info!(
        thread_fallback = config.queue.thread_fallback,
        database = %database_path.display(),
        "application context ready"
    );

    Ok(AppContext {
        config,
        controller,
        billing,
        memory,
        pipeline,
        queue,
    })
}

/// Accept both `sqlite://path` URLs and bare paths.
fn sqlite_path(url: &str) -> PathBuf {
    let stripped = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    PathBuf::from(stripped)
}
