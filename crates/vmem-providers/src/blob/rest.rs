//! REST blob store for thumbnails (Vercel-Blob-shaped API).
//!
//! `PUT {api}/{pathname}` with a bearer token stores an object and returns
//! its public URL; deletion posts the URL list to `{api}/delete`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::BlobStorage;

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
}

/// Token-authenticated REST [`BlobStorage`].
pub struct RestBlobStorage {
    client: reqwest::Client,
    token: String,
    api_url: String,
}

impl RestBlobStorage {
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            token: token.into(),
            api_url: api_url.into(),
        }
    }
}

#[async_trait]
impl BlobStorage for RestBlobStorage {
    async fn put(&self, bytes: &[u8], logical_path: &str) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::blob("blob store is not configured (missing token)"));
        }

        let response = self
            .client
            .put(format!("{}/{logical_path}", self.api_url))
            .bearer_auth(&self.token)
            .header("x-content-type", "image/jpeg")
            .header("x-cache-control-max-age", "31536000")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| Error::blob_with_source("blob upload failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::blob(format!("blob upload returned {status}")));
        }

        let payload: PutResponse = response
            .json()
            .await
            .map_err(|e| Error::blob_with_source("unparseable blob response", e))?;
        Ok(payload.url)
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::blob_with_source("blob download failed", e))?;
        if !response.status().is_success() {
            return Err(Error::blob(format!(
                "blob download returned {}",
                response.status()
            )));
        }
        Ok(response
            .bytes()
            .await
            .map_err(|e| Error::blob_with_source("blob body read failed", e))?
            .to_vec())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        if self.token.is_empty() {
            return Ok(());
        }
        let _ = self
            .client
            .post(format!("{}/delete", self.api_url))
            .bearer_auth(&self.token)
            .json(&json!({ "urls": [url] }))
            .send()
            .await
            .map_err(|e| Error::blob_with_source("blob delete failed", e))?;
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "rest-blob"
    }
}
