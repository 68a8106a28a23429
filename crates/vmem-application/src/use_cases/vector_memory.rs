//! Vector memory: embedding-backed content storage and similarity search.
//!
//! Similarity ranking happens in-process over the tenant's candidate
//! vectors; a full scan is fine at the per-tenant scale this system
//! targets, and keeps the store portable across SQL backends without a
//! vector column type.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use vmem_domain::constants::media::SEARCHABLE_TRANSCRIPT_CHARS;
use vmem_domain::entities::{ContentExtract, ContentSummary, ScoredContent};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::{
    ContentRecord, ContentRepository, EmbeddingProvider, EntityRecord, VectorMemoryInterface,
};
use vmem_domain::utils::{extract_youtube_id, new_collection_id};
use vmem_domain::value_objects::{
    cosine_similarity, CollectionId, CollectionInfo, ContentId, TenantId,
};

/// Concrete vector memory over the content repository and the embedding
/// provider.
pub struct VectorMemory {
    contents: Arc<dyn ContentRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorMemory {
    pub fn new(contents: Arc<dyn ContentRepository>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { contents, embedder }
    }

    /// The deterministic searchable-text concatenation the content
    /// embedding is computed from. Search quality depends on this exact
    /// shape staying stable across writes.
    pub fn searchable_text(content: &ContentExtract) -> String {
        let key_points: Vec<&str> = content.key_points.iter().map(|kp| kp.point.as_str()).collect();
        let entities: Vec<&str> = content.entities.iter().map(|e| e.name.as_str()).collect();

        let mut parts = vec![
            format!("Title: {}", content.title),
            format!("Summary: {}", content.summary),
            format!("Type: {}", content.content_type),
            format!("Topics: {}", content.topics.join(", ")),
            format!("Key Points: {}", key_points.join(" ")),
            format!("Entities: {}", entities.join(", ")),
            format!("Action Items: {}", content.action_items.join(" ")),
            format!("Tags: {}", content.tags.join(", ")),
        ];

        let transcript_prefix: String = content
            .transcript
            .chars()
            .take(SEARCHABLE_TRANSCRIPT_CHARS)
            .collect();
        if !transcript_prefix.is_empty() {
            parts.push(transcript_prefix);
        }

        parts.join("\n")
    }

    fn entity_text(entity: &vmem_domain::entities::EntityMention) -> String {
        format!("{} {} {}", entity.name, entity.entity_type, entity.description)
    }

    fn record_from(
        content: &ContentExtract,
        tenant: TenantId,
        searchable_text: String,
        embedding: Vec<f32>,
    ) -> Result<ContentRecord> {
        Ok(ContentRecord {
            id: content.id.clone(),
            tenant,
            title: content.title.clone(),
            content_type: content.content_type.clone(),
            mode: content.mode.clone(),
            summary: content.summary.clone(),
            topics: content.topics.clone(),
            tags: content.tags.clone(),
            collections: content.collections.clone(),
            source_url: content.source_url.clone().unwrap_or_default(),
            has_transcript: !content.transcript.is_empty(),
            full_content: serde_json::to_value(content)?,
            searchable_text,
            embedding,
            file_size_bytes: content.file_size_bytes,
        })
    }

    fn parse_content(value: &serde_json::Value) -> Result<ContentExtract> {
        serde_json::from_value(value.clone())
            .map_err(|e| Error::vector_memory(format!("stored content is not parseable: {e}")))
    }
}

#[async_trait]
impl VectorMemoryInterface for VectorMemory {
    async fn add(&self, tenant: TenantId, content: &ContentExtract) -> Result<ContentId> {
        let searchable = Self::searchable_text(content);
        let embedding = self.embedder.embed(&searchable).await?;

        let record = Self::record_from(content, tenant, searchable, embedding.vector)?;
        self.contents.upsert(&record).await?;

        // Entity vectors are replaced wholesale with their parent.
        if content.entities.is_empty() {
            self.contents
                .replace_entities(tenant, &content.id, &[])
                .await?;
        } else {
            let texts: Vec<String> = content.entities.iter().map(Self::entity_text).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            let records: Vec<EntityRecord> = content
                .entities
                .iter()
                .zip(embeddings)
                .map(|(entity, emb)| EntityRecord {
                    content_id: content.id.clone(),
                    entity_name: entity.name.clone(),
                    entity_type: entity.entity_type.clone(),
                    embedding: emb.vector,
                })
                .collect();
            self.contents
                .replace_entities(tenant, &content.id, &records)
                .await?;
        }

        info!(content_id = %content.id, %tenant, title = %content.title, "content stored");
        Ok(content.id.clone())
    }

    async fn get(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
    ) -> Result<Option<ContentExtract>> {
        match self.contents.get(tenant, content_id).await? {
            Some(value) => Ok(Some(Self::parse_content(&value)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, tenant: TenantId) -> Result<Vec<ContentExtract>> {
        let values = self.contents.list(tenant).await?;
        values.iter().map(Self::parse_content).collect()
    }

    async fn search(
        &self,
        tenant: TenantId,
        query: &str,
        n_results: usize,
        content_type: Option<&str>,
        collection_id: Option<&CollectionId>,
    ) -> Result<Vec<ScoredContent>> {
        let query_embedding = self.embedder.embed(query).await?;
        let candidates = self.contents.vectors(tenant, content_type).await?;

        let mut scored: Vec<(f32, &_)> = candidates
            .iter()
            // Collection scoping is a membership filter applied before ranking.
            .filter(|v| collection_id.is_none_or(|c| v.collections.contains(c)))
            .map(|v| (cosine_similarity(&v.embedding, &query_embedding.vector), v))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        scored
            .into_iter()
            .map(|(similarity, vector)| {
                Ok(ScoredContent {
                    content: Self::parse_content(&vector.full_content)?,
                    similarity,
                })
            })
            .collect()
    }

    async fn search_by_entity(
        &self,
        tenant: TenantId,
        entity_names: &[String],
        n_results: usize,
    ) -> Result<Vec<ContentExtract>> {
        let query = entity_names.join(", ");
        let query_embedding = self.embedder.embed(&query).await?;

        let entities = self.contents.entity_vectors(tenant).await?;
        let mut scored: Vec<(f32, &EntityRecord)> = entities
            .iter()
            .map(|e| (cosine_similarity(&e.embedding, &query_embedding.vector), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);

        let mut results = Vec::new();
        let mut seen: Vec<&ContentId> = Vec::new();
        for (_, entity) in scored {
            if seen.contains(&&entity.content_id) {
                continue;
            }
            seen.push(&entity.content_id);
            if let Some(content) = self.get(tenant, &entity.content_id).await? {
                results.push(content);
            }
        }
        Ok(results)
    }

    async fn search_by_topic(
        &self,
        tenant: TenantId,
        topics: &[String],
        n_results: usize,
    ) -> Result<Vec<ScoredContent>> {
        let query = topics.join(", ");
        self.search(tenant, &query, n_results, None, None).await
    }

    async fn find_by_source_url(
        &self,
        tenant: TenantId,
        url: &str,
    ) -> Result<Option<ContentId>> {
        if url.is_empty() {
            return Ok(None);
        }
        match extract_youtube_id(url) {
            // Natural identifier: match any row whose source URL carries
            // the same video id, regardless of URL surface form.
            Some(video_id) => self.contents.find_by_source_fragment(tenant, video_id).await,
            None => self.contents.find_by_source_exact(tenant, url).await,
        }
    }

    async fn update(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        content: &ContentExtract,
    ) -> Result<bool> {
        // Re-embed only when the searchable text actually changed;
        // backfills that touch thumbnails or captions skip the model.
        let old_searchable = match self.get(tenant, content_id).await? {
            Some(old) => Self::searchable_text(&old),
            None => return Ok(false),
        };
        let new_searchable = Self::searchable_text(content);

        if new_searchable != old_searchable {
            debug!(%content_id, "searchable text changed, re-embedding");
            self.add(tenant, content).await?;
            return Ok(true);
        }

        self.contents
            .update_full_content(tenant, content_id, &serde_json::to_value(content)?)
            .await
    }

    async fn delete(&self, tenant: TenantId, content_id: &ContentId) -> Result<bool> {
        self.contents.delete(tenant, content_id).await
    }

    async fn create_collection(
        &self,
        tenant: TenantId,
        name: &str,
        description: &str,
    ) -> Result<CollectionId> {
        let info = CollectionInfo {
            id: new_collection_id(),
            name: name.to_owned(),
            description: description.to_owned(),
            created_at: Utc::now().timestamp(),
        };
        self.contents.create_collection(tenant, &info).await?;
        Ok(info.id)
    }

    async fn collections(&self, tenant: TenantId) -> Result<Vec<CollectionInfo>> {
        self.contents.list_collections(tenant).await
    }

    async fn delete_collection(&self, tenant: TenantId, id: &CollectionId) -> Result<bool> {
        self.contents.delete_collection(tenant, id).await
    }

    async fn add_to_collection(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collection_id: &CollectionId,
    ) -> Result<bool> {
        let Some(mut memberships) = self.contents.get_collections_of(tenant, content_id).await?
        else {
            return Ok(false);
        };
        if !memberships.contains(collection_id) {
            memberships.push(collection_id.clone());
            self.contents
                .set_collections(tenant, content_id, &memberships)
                .await?;
        }
        Ok(true)
    }

    async fn remove_from_collection(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collection_id: &CollectionId,
    ) -> Result<bool> {
        let Some(mut memberships) = self.contents.get_collections_of(tenant, content_id).await?
        else {
            return Ok(false);
        };
        let before = memberships.len();
        memberships.retain(|c| c != collection_id);
        if memberships.len() == before {
            return Ok(false);
        }
        self.contents
            .set_collections(tenant, content_id, &memberships)
            .await?;
        Ok(true)
    }

    async fn collection_contents(
        &self,
        tenant: TenantId,
        collection_id: &CollectionId,
    ) -> Result<Vec<ContentSummary>> {
        let vectors = self.contents.vectors(tenant, None).await?;
        let mut summaries = Vec::new();
        for v in vectors
            .iter()
            .filter(|v| v.collections.contains(collection_id))
        {
            let content = Self::parse_content(&v.full_content)?;
            summaries.push(ContentSummary {
                id: content.id,
                title: if content.title.is_empty() {
                    "Untitled".to_owned()
                } else {
                    content.title
                },
                summary: content.summary,
                content_type: content.content_type,
                tags: content.tags,
                topics: content.topics,
            });
        }
        Ok(summaries)
    }

    async fn collection_contents_full(
        &self,
        tenant: TenantId,
        collection_id: &CollectionId,
    ) -> Result<Vec<ContentExtract>> {
        let vectors = self.contents.vectors(tenant, None).await?;
        vectors
            .iter()
            .filter(|v| v.collections.contains(collection_id))
            .map(|v| Self::parse_content(&v.full_content))
            .collect()
    }
}
