//! Serialized progress writer shared by the parallel tracks.
//!
//! Both tracks publish `(percent, status)` updates into one channel; a
//! single drain task writes them through the job controller. Writes are
//! therefore serialized per job, and terminal-state protection is enforced
//! by the controller's conditional update, not by the tracks.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use vmem_domain::ports::JobControllerInterface;
use vmem_domain::value_objects::JobId;

/// Cloneable, synchronous handle the tracks report through.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<(f64, String)>,
}

impl ProgressSender {
    /// Queue a progress update. Never blocks; updates after the writer shut
    /// down are silently dropped (the job is terminal by then anyway).
    pub fn send(&self, percent: f64, status: impl Into<String>) {
        let _ = self.tx.send((percent, status.into()));
    }
}

/// Owns the drain task for one job's progress stream.
pub struct ProgressWriter {
    tx: mpsc::UnboundedSender<(f64, String)>,
    handle: JoinHandle<()>,
}

impl ProgressWriter {
    /// Spawn the drain task.
    pub fn spawn(jobs: Arc<dyn JobControllerInterface>, job_id: JobId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(f64, String)>();
        let handle = tokio::spawn(async move {
            while let Some((percent, status)) = rx.recv().await {
                if let Err(e) = jobs.progress(&job_id, percent, &status).await {
                    warn!(%job_id, error = %e, "progress write failed");
                }
            }
        });
        Self { tx, handle }
    }

    /// A sender handle for a track.
    pub fn sender(&self) -> ProgressSender {
        ProgressSender {
            tx: self.tx.clone(),
        }
    }

    /// Close the channel and wait for queued updates to land.
    pub async fn finish(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}
