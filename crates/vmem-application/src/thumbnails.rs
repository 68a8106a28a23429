//! Thumbnail persistence: resized JPEGs in blob storage with a per-content
//! manifest.
//!
//! Upload failures fall back to the secondary store per file, so a blob
//! outage degrades to local thumbnails instead of losing them.

use std::sync::Arc;

use tracing::warn;

use vmem_domain::constants::media::THUMBNAIL_WIDTH;
use vmem_domain::entities::{SampledFrame, ThumbnailEntry};
use vmem_domain::error::Result;
use vmem_domain::ports::{BlobStorage, MediaToolkit};
use vmem_domain::value_objects::ContentId;

/// Resize and store one thumbnail per sampled frame. Returns the manifest
/// persisted under `content.metadata.thumbnails`.
pub async fn save_thumbnails(
    frames: &[SampledFrame],
    content_id: &ContentId,
    toolkit: &dyn MediaToolkit,
    blob: &dyn BlobStorage,
    fallback: Option<&Arc<dyn BlobStorage>>,
) -> Result<Vec<ThumbnailEntry>> {
    let mut manifest = Vec::with_capacity(frames.len());

    for frame in frames {
        let thumb = match toolkit.make_thumbnail(&frame.jpeg, THUMBNAIL_WIDTH).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(timestamp = frame.timestamp, error = %e, "thumbnail resize failed, skipping frame");
                continue;
            }
        };

        let filename = format!("{}.jpg", frame.timestamp.round() as i64);
        let logical_path = format!("thumbnails/{}/{}", content_id.as_str(), filename);

        match blob.put(&thumb, &logical_path).await {
            Ok(url) => manifest.push(ThumbnailEntry {
                timestamp: frame.timestamp,
                filename,
                url: Some(url),
            }),
            Err(e) => {
                warn!(%logical_path, error = %e, "blob upload failed, using fallback store");
                match fallback {
                    Some(store) => match store.put(&thumb, &logical_path).await {
                        Ok(_) => manifest.push(ThumbnailEntry {
                            timestamp: frame.timestamp,
                            filename,
                            url: None,
                        }),
                        Err(fe) => {
                            warn!(%logical_path, error = %fe, "fallback store failed, dropping thumbnail");
                        }
                    },
                    None => {
                        warn!(%logical_path, "no fallback store configured, dropping thumbnail");
                    }
                }
            }
        }
    }

    Ok(manifest)
}

/// Rewrite a manifest after dedup replaced the content id: any URL carrying
/// the abandoned id points at the retained id instead.
pub fn rewrite_manifest_ids(
    manifest: &mut [ThumbnailEntry],
    abandoned_id: &ContentId,
    retained_id: &ContentId,
) {
    for entry in manifest.iter_mut() {
        if let Some(url) = &entry.url {
            if url.contains(abandoned_id.as_str()) {
                entry.url = Some(url.replace(abandoned_id.as_str(), retained_id.as_str()));
            }
        }
    }
}
