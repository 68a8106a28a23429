//! Vision track: bounded-parallel frame captioning.
//!
//! Each sampled frame gets one vision call; at most
//! [`VISION_MAX_CONCURRENCY`] calls are in flight. Output order follows
//! frame order regardless of completion order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::sync::Semaphore;
use tracing::debug;

use vmem_domain::constants::media::VISION_MAX_CONCURRENCY;
use vmem_domain::entities::{FrameAnalysis, SampledFrame};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::VisionProvider;

/// Maximum caption length derived from a description's first sentence.
const CAPTION_MAX_CHARS: usize = 80;

/// Caption every frame with bounded parallelism.
///
/// Returns `[Ns] description` lines (frame order) plus structured analyses.
/// `on_progress` is invoked with `(completed, total)` after each frame.
pub async fn analyze_frames<F>(
    frames: &[SampledFrame],
    vision: Arc<dyn VisionProvider>,
    on_progress: F,
) -> Result<(Vec<String>, Vec<FrameAnalysis>)>
where
    F: Fn(usize, usize) + Send + Sync,
{
    if frames.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let semaphore = Arc::new(Semaphore::new(VISION_MAX_CONCURRENCY));
    let completed = AtomicUsize::new(0);
    let total = frames.len();

    let tasks = frames.iter().map(|frame| {
        let vision = Arc::clone(&vision);
        let semaphore = Arc::clone(&semaphore);
        let completed = &completed;
        let on_progress = &on_progress;
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| Error::vision(format!("vision semaphore closed: {e}")))?;

            let prompt = frame_prompt(frame.timestamp);
            let description = vision.describe_frame(&frame.jpeg, &prompt).await?;

            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_progress(done, total);
            debug!(timestamp = frame.timestamp, done, total, "frame analyzed");

            Ok::<FrameAnalysis, Error>(FrameAnalysis {
                timestamp: frame.timestamp,
                caption: derive_caption(&description),
                description: description.trim().to_owned(),
            })
        }
    });

    let analyses = try_join_all(tasks).await?;

    let descriptions = analyses
        .iter()
        .map(|a| format!("[{}s] {}", a.timestamp as i64, a.description))
        .collect();

    Ok((descriptions, analyses))
}

fn frame_prompt(timestamp: f64) -> String {
    format!(
        "This is a frame from a video at {} seconds. Briefly describe what is shown: \
         people, objects, on-screen text, actions, and setting. One or two sentences.",
        timestamp as i64
    )
}

/// Short caption: the description's first sentence, truncated.
fn derive_caption(description: &str) -> String {
    let first = description
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(description)
        .trim();
    if first.chars().count() <= CAPTION_MAX_CHARS {
        first.to_owned()
    } else {
        let truncated: String = first.chars().take(CAPTION_MAX_CHARS - 1).collect();
        format!("{}…", truncated.trim_end())
    }
}
