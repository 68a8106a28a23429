//! Job dispatch: queue-backed or in-process, selected by configuration.
//!
//! Both implementations honor the same contract: the job row is already
//! durable when `dispatch` runs, and the job's observable lifecycle is
//! identical either way, so callers cannot tell which one is wired in.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::{error, info};

use vmem_application::pipeline::IngestPipeline;
use vmem_domain::entities::IngestJob;
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{Dispatcher, JobQueue, QueuedJob};

/// Dispatch through the durable queue; a separate worker process picks the
/// job up.
pub struct QueueDispatcher {
    queue: Arc<dyn JobQueue>,
    job_timeout_seconds: u64,
}

impl QueueDispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, job_timeout_seconds: u64) -> Self {
        Self {
            queue,
            job_timeout_seconds,
        }
    }
}

#[async_trait]
impl Dispatcher for QueueDispatcher {
    async fn dispatch(&self, job: &IngestJob) -> Result<()> {
        self.queue
            .push(&QueuedJob {
                job_id: job.id,
                tenant: job.tenant,
                attempt: 0,
                timeout_seconds: self.job_timeout_seconds,
            })
            .await
    }
}

/// Single-node fallback: run the pipeline in a background task of this
/// process. Selected by `queue.thread_fallback`.
///
/// The pipeline itself depends on the job controller, which depends on the
/// dispatcher; the cycle is broken by installing the pipeline after
/// construction.
#[derive(Default)]
pub struct InProcessDispatcher {
    pipeline: OnceCell<Arc<IngestPipeline>>,
}

impl InProcessDispatcher {
    pub fn new() -> Self {
        Self {
            pipeline: OnceCell::new(),
        }
    }

    /// Install the pipeline once wiring is complete. Later calls are
    /// ignored.
    pub fn install_pipeline(&self, pipeline: Arc<IngestPipeline>) {
        let _ = self.pipeline.set(pipeline);
    }
}

#[async_trait]
impl Dispatcher for InProcessDispatcher {
    async fn dispatch(&self, job: &IngestJob) -> Result<()> {
        let pipeline = self
            .pipeline
            .get()
            .ok_or_else(|| Error::internal("in-process dispatcher has no pipeline installed"))?
            .clone();

        let job_id = job.id;
        info!(%job_id, "running job in-process (thread fallback)");
        tokio::spawn(async move {
            pipeline.run(job_id).await;
        });
        Ok(())
    }
}

/// Worker loop: pull from the queue and run jobs one at a time until the
/// shutdown signal fires.
pub async fn run_worker_loop(
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<IngestPipeline>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    info!("worker loop started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("worker loop shutting down");
                    return;
                }
            }
            popped = queue.pop(5) => {
                match popped {
                    Ok(Some(entry)) => {
                        info!(job_id = %entry.job_id, attempt = entry.attempt, "picked up job");
                        pipeline.run(entry.job_id).await;
                    }
                    Ok(None) => {} // poll timeout, loop again
                    Err(e) => {
                        error!(error = %e, "queue pop failed, backing off");
                        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    }
                }
            }
        }
    }
}
