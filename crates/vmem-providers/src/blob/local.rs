//! Local-disk blob store: the fallback when no blob token is configured.
//!
//! Objects live under the thumbnails root; the returned "URL" is the
//! logical path itself, which the API surface serves from disk.

use std::path::PathBuf;

use async_trait::async_trait;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::BlobStorage;

/// Filesystem-backed [`BlobStorage`].
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, logical_path: &str) -> PathBuf {
        // Strip any path traversal; logical paths are server-generated but
        // cheap to sanitise.
        let clean: PathBuf = logical_path
            .split('/')
            .filter(|part| !part.is_empty() && *part != "..")
            .collect();
        self.root.join(clean)
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(&self, bytes: &[u8], logical_path: &str) -> Result<String> {
        let path = self.resolve(logical_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::blob_with_source("create blob directory", e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::blob_with_source("write blob file", e))?;
        Ok(logical_path.to_owned())
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        tokio::fs::read(self.resolve(url))
            .await
            .map_err(|e| Error::blob_with_source(format!("read blob {url}"), e))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        match tokio::fs::remove_file(self.resolve(url)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::blob_with_source(format!("delete blob {url}"), e)),
        }
    }

    fn provider_name(&self) -> &str {
        "local-blob"
    }
}
