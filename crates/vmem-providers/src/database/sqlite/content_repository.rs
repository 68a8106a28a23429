//! SQLite content repository: content vectors, entity vectors, collections.
//!
//! Embeddings live in JSON-encoded TEXT columns; similarity ranking
//! happens in the application layer over [`StoredVector`] scans.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use vmem_domain::error::Result;
use vmem_domain::ports::{
    ContentRecord, ContentRepository, DatabaseExecutor, EntityRecord, SqlParam, SqlRow,
    StoredVector,
};
use vmem_domain::utils::epoch_secs;
use vmem_domain::value_objects::{CollectionId, CollectionInfo, ContentId, TenantId};

use super::row_helpers::{json_column, required_i64, required_string, to_json_text};

/// SQLite-backed [`ContentRepository`].
pub struct SqliteContentRepository {
    executor: Arc<dyn DatabaseExecutor>,
}

impl SqliteContentRepository {
    pub fn new(executor: Arc<dyn DatabaseExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ContentRepository for SqliteContentRepository {
    async fn upsert(&self, record: &ContentRecord) -> Result<()> {
        let now = epoch_secs();
        let params = [
            SqlParam::String(record.id.as_str().to_owned()),
            SqlParam::I64(record.tenant.as_i64()),
            SqlParam::String(record.title.clone()),
            SqlParam::String(record.content_type.clone()),
            SqlParam::String(record.mode.clone()),
            SqlParam::String(record.summary.clone()),
            SqlParam::String(to_json_text(&record.topics)?),
            SqlParam::String(to_json_text(&record.tags)?),
            SqlParam::String(to_json_text(&record.collections)?),
            SqlParam::String(record.source_url.clone()),
            SqlParam::Bool(record.has_transcript),
            SqlParam::String(to_json_text(&record.full_content)?),
            SqlParam::String(record.searchable_text.clone()),
            SqlParam::String(to_json_text(&record.embedding)?),
            SqlParam::I64(record.file_size_bytes),
            SqlParam::I64(now),
            SqlParam::I64(now),
        ];
        self.executor
            .execute(
                r"
                INSERT INTO content_vectors
                    (id, tenant_id, title, content_type, mode, summary, topics, tags,
                     collections, source_url, has_transcript, full_content,
                     searchable_text, embedding, file_size_bytes, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(tenant_id, id) DO UPDATE SET
                    title = excluded.title,
                    content_type = excluded.content_type,
                    mode = excluded.mode,
                    summary = excluded.summary,
                    topics = excluded.topics,
                    tags = excluded.tags,
                    collections = excluded.collections,
                    source_url = excluded.source_url,
                    has_transcript = excluded.has_transcript,
                    full_content = excluded.full_content,
                    searchable_text = excluded.searchable_text,
                    embedding = excluded.embedding,
                    file_size_bytes = excluded.file_size_bytes,
                    updated_at = excluded.updated_at
                ",
                &params,
            )
            .await?;
        debug!(content_id = %record.id, "content row upserted");
        Ok(())
    }

    async fn replace_entities(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        entities: &[EntityRecord],
    ) -> Result<()> {
        self.executor
            .execute(
                "DELETE FROM entity_vectors WHERE tenant_id = ? AND content_id = ?",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;

        for entity in entities {
            self.executor
                .execute(
                    r"
                    INSERT INTO entity_vectors
                        (tenant_id, content_id, entity_name, entity_type, embedding)
                    VALUES (?, ?, ?, ?, ?)
                    ",
                    &[
                        SqlParam::I64(tenant.as_i64()),
                        SqlParam::String(entity.content_id.as_str().to_owned()),
                        SqlParam::String(entity.entity_name.clone()),
                        SqlParam::String(entity.entity_type.clone()),
                        SqlParam::String(to_json_text(&entity.embedding)?),
                    ],
                )
                .await?;
        }
        Ok(())
    }

    async fn get(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
    ) -> Result<Option<serde_json::Value>> {
        let row = self
            .executor
            .query_one(
                "SELECT full_content FROM content_vectors WHERE tenant_id = ? AND id = ?",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;
        row.map(|r| json_column(r.as_ref(), "full_content"))
            .transpose()
    }

    async fn list(&self, tenant: TenantId) -> Result<Vec<serde_json::Value>> {
        let rows = self
            .executor
            .query_all(
                "SELECT full_content FROM content_vectors
                 WHERE tenant_id = ? ORDER BY created_at DESC, rowid DESC",
                &[SqlParam::I64(tenant.as_i64())],
            )
            .await?;
        rows.iter()
            .map(|r| json_column(r.as_ref(), "full_content"))
            .collect()
    }

    async fn vectors(
        &self,
        tenant: TenantId,
        content_type: Option<&str>,
    ) -> Result<Vec<StoredVector>> {
        let rows = match content_type {
            Some(content_type) => {
                self.executor
                    .query_all(
                        "SELECT id, content_type, collections, embedding, full_content
                         FROM content_vectors WHERE tenant_id = ? AND content_type = ?",
                        &[
                            SqlParam::I64(tenant.as_i64()),
                            SqlParam::String(content_type.to_owned()),
                        ],
                    )
                    .await?
            }
            None => {
                self.executor
                    .query_all(
                        "SELECT id, content_type, collections, embedding, full_content
                         FROM content_vectors WHERE tenant_id = ?",
                        &[SqlParam::I64(tenant.as_i64())],
                    )
                    .await?
            }
        };

        rows.iter().map(|r| row_to_vector(r.as_ref())).collect()
    }

    async fn entity_vectors(&self, tenant: TenantId) -> Result<Vec<EntityRecord>> {
        let rows = self
            .executor
            .query_all(
                "SELECT content_id, entity_name, entity_type, embedding
                 FROM entity_vectors WHERE tenant_id = ?",
                &[SqlParam::I64(tenant.as_i64())],
            )
            .await?;
        rows.iter()
            .map(|r| {
                Ok(EntityRecord {
                    content_id: ContentId::new(required_string(r.as_ref(), "content_id")?),
                    entity_name: required_string(r.as_ref(), "entity_name")?,
                    entity_type: required_string(r.as_ref(), "entity_type")?,
                    embedding: json_column(r.as_ref(), "embedding")?,
                })
            })
            .collect()
    }

    async fn find_by_source_fragment(
        &self,
        tenant: TenantId,
        fragment: &str,
    ) -> Result<Option<ContentId>> {
        let row = self
            .executor
            .query_one(
                "SELECT id FROM content_vectors
                 WHERE tenant_id = ? AND instr(source_url, ?) > 0
                 ORDER BY created_at DESC LIMIT 1",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(fragment.to_owned()),
                ],
            )
            .await?;
        row.map(|r| Ok(ContentId::new(required_string(r.as_ref(), "id")?)))
            .transpose()
    }

    async fn find_by_source_exact(
        &self,
        tenant: TenantId,
        url: &str,
    ) -> Result<Option<ContentId>> {
        let row = self
            .executor
            .query_one(
                "SELECT id FROM content_vectors
                 WHERE tenant_id = ? AND source_url = ?
                 ORDER BY created_at DESC LIMIT 1",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(url.to_owned()),
                ],
            )
            .await?;
        row.map(|r| Ok(ContentId::new(required_string(r.as_ref(), "id")?)))
            .transpose()
    }

    async fn update_full_content(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        content: &serde_json::Value,
    ) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                "UPDATE content_vectors SET full_content = ?, updated_at = ?
                 WHERE tenant_id = ? AND id = ?",
                &[
                    SqlParam::String(to_json_text(content)?),
                    SqlParam::I64(epoch_secs()),
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn set_collections(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
        collections: &[CollectionId],
    ) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                "UPDATE content_vectors SET collections = ?, updated_at = ?
                 WHERE tenant_id = ? AND id = ?",
                &[
                    SqlParam::String(to_json_text(&collections)?),
                    SqlParam::I64(epoch_secs()),
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn get_collections_of(
        &self,
        tenant: TenantId,
        content_id: &ContentId,
    ) -> Result<Option<Vec<CollectionId>>> {
        let row = self
            .executor
            .query_one(
                "SELECT collections FROM content_vectors WHERE tenant_id = ? AND id = ?",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;
        row.map(|r| json_column(r.as_ref(), "collections")).transpose()
    }

    async fn delete(&self, tenant: TenantId, content_id: &ContentId) -> Result<bool> {
        self.executor
            .execute(
                "DELETE FROM entity_vectors WHERE tenant_id = ? AND content_id = ?",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;
        let affected = self
            .executor
            .execute(
                "DELETE FROM content_vectors WHERE tenant_id = ? AND id = ?",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(content_id.as_str().to_owned()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }

    async fn storage_used_bytes(&self, tenant: TenantId) -> Result<i64> {
        let row = self
            .executor
            .query_one(
                "SELECT COALESCE(SUM(file_size_bytes), 0) AS total
                 FROM content_vectors WHERE tenant_id = ?",
                &[SqlParam::I64(tenant.as_i64())],
            )
            .await?;
        Ok(row
            .map(|r| required_i64(r.as_ref(), "total"))
            .transpose()?
            .unwrap_or(0))
    }

    async fn create_collection(&self, tenant: TenantId, info: &CollectionInfo) -> Result<()> {
        self.executor
            .execute(
                "INSERT INTO collections (id, tenant_id, name, description, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    SqlParam::String(info.id.as_str().to_owned()),
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(info.name.clone()),
                    SqlParam::String(info.description.clone()),
                    SqlParam::I64(info.created_at),
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_collections(&self, tenant: TenantId) -> Result<Vec<CollectionInfo>> {
        let rows = self
            .executor
            .query_all(
                "SELECT id, name, description, created_at FROM collections
                 WHERE tenant_id = ? ORDER BY created_at DESC",
                &[SqlParam::I64(tenant.as_i64())],
            )
            .await?;
        rows.iter().map(|r| row_to_collection(r.as_ref())).collect()
    }

    async fn delete_collection(&self, tenant: TenantId, id: &CollectionId) -> Result<bool> {
        let affected = self
            .executor
            .execute(
                "DELETE FROM collections WHERE tenant_id = ? AND id = ?",
                &[
                    SqlParam::I64(tenant.as_i64()),
                    SqlParam::String(id.as_str().to_owned()),
                ],
            )
            .await?;
        Ok(affected > 0)
    }
}

fn row_to_vector(row: &dyn SqlRow) -> Result<StoredVector> {
    Ok(StoredVector {
        id: ContentId::new(required_string(row, "id")?),
        content_type: required_string(row, "content_type")?,
        collections: json_column(row, "collections")?,
        embedding: json_column(row, "embedding")?,
        full_content: json_column(row, "full_content")?,
    })
}

fn row_to_collection(row: &dyn SqlRow) -> Result<CollectionInfo> {
    Ok(CollectionInfo {
        id: CollectionId::new(required_string(row, "id")?),
        name: required_string(row, "name")?,
        description: required_string(row, "description")?,
        created_at: required_i64(row, "created_at")?,
    })
}
