//! Local embedding provider over fastembed.
//!
//! The model is heavyweight: one instance per process, initialised the
//! first time any tenant needs it, never released. Inference runs on a
//! blocking thread so the async workers stay responsive.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use once_cell::sync::OnceCell;
use tracing::info;

use vmem_domain::error::{Error, Result};
use vmem_domain::ports::EmbeddingProvider;
use vmem_domain::value_objects::Embedding;

/// Dimension of the default MiniLM model, reported before first use.
const DEFAULT_DIMENSIONS: usize = 384;

struct LoadedModel {
    model: Mutex<TextEmbedding>,
    dimensions: usize,
}

/// Process-global fastembed provider.
#[derive(Clone)]
pub struct FastEmbedProvider {
    model_name: String,
    loaded: Arc<OnceCell<LoadedModel>>,
}

impl FastEmbedProvider {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            loaded: Arc::new(OnceCell::new()),
        }
    }

    fn resolve_model(name: &str) -> EmbeddingModel {
        // Map the configured sentence-transformers name onto the fastembed
        // catalogue; unknown names fall back to the MiniLM default.
        if name.contains("bge-small") {
            EmbeddingModel::BGESmallENV15
        } else if name.contains("bge-base") {
            EmbeddingModel::BGEBaseENV15
        } else {
            EmbeddingModel::AllMiniLML6V2
        }
    }

    fn load(&self) -> Result<&LoadedModel> {
        self.loaded.get_or_try_init(|| {
            info!(model = %self.model_name, "loading embedding model");
            let model = TextEmbedding::try_new(
                InitOptions::new(Self::resolve_model(&self.model_name))
                    .with_show_download_progress(false),
            )
            .map_err(|e| Error::embedding(format!("could not load embedding model: {e}")))?;

            // Fix the dimension at load time; every vector this process
            // writes shares it.
            let probe = model
                .embed(vec!["dimension probe"], None)
                .map_err(|e| Error::embedding(format!("embedding probe failed: {e}")))?;
            let dimensions = probe.first().map_or(DEFAULT_DIMENSIONS, Vec::len);

            Ok(LoadedModel {
                model: Mutex::new(model),
                dimensions,
            })
        })
    }

    fn embed_sync(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let loaded = self.load()?;
        let vectors = {
            let model = loaded
                .model
                .lock()
                .map_err(|_| Error::embedding("embedding model lock poisoned"))?;
            model
                .embed(texts.to_vec(), None)
                .map_err(|e| Error::embedding(format!("embedding failed: {e}")))?
        };

        Ok(vectors
            .into_iter()
            .map(|v| Embedding {
                vector: normalize(v),
                model: self.model_name.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let this = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || this.embed_sync(&texts))
            .await
            .map_err(|e| Error::embedding(format!("embedding task panicked: {e}")))?
    }

    fn dimensions(&self) -> usize {
        self.loaded
            .get()
            .map_or(DEFAULT_DIMENSIONS, |m| m.dimensions)
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}

/// Unit-normalize a vector (idempotent for already-normalized output).
fn normalize(v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return v;
    }
    v.into_iter().map(|x| x / norm).collect()
}
