//! Content repository semantics: upserts, source lookups, entity vectors,
//! collections, storage accounting.

use vmem_domain::ports::{ContentRecord, ContentRepository, EntityRecord};
use vmem_domain::value_objects::{CollectionId, CollectionInfo, ContentId, TenantId};
use vmem_providers::{SqliteContentRepository, SqliteExecutor};

const TENANT: TenantId = TenantId::new(7);

async fn repo() -> SqliteContentRepository {
    let executor = SqliteExecutor::connect_in_memory().await.unwrap();
    SqliteContentRepository::new(executor)
}

fn record(id: &str, source_url: &str, file_size: i64) -> ContentRecord {
    ContentRecord {
        id: ContentId::new(id),
        tenant: TENANT,
        title: format!("Title of {id}"),
        content_type: "tutorial".to_owned(),
        mode: "general".to_owned(),
        summary: "summary".to_owned(),
        topics: vec!["topic".to_owned()],
        tags: vec!["tag".to_owned()],
        collections: vec![],
        source_url: source_url.to_owned(),
        has_transcript: true,
        full_content: serde_json::json!({"id": id, "title": format!("Title of {id}")}),
        searchable_text: "Title: ...".to_owned(),
        embedding: vec![0.1, 0.2, 0.3],
        file_size_bytes: file_size,
    }
}

#[tokio::test]
async fn upsert_overwrites_by_tenant_and_id() {
    let repo = repo().await;
    repo.upsert(&record("content_a", "https://u", 100)).await.unwrap();

    let mut updated = record("content_a", "https://u2", 200);
    updated.title = "New".to_owned();
    repo.upsert(&updated).await.unwrap();

    let vectors = repo.vectors(TENANT, None).await.unwrap();
    assert_eq!(vectors.len(), 1);

    let loaded = repo.get(TENANT, &ContentId::new("content_a")).await.unwrap();
    assert!(loaded.is_some());
    assert_eq!(repo.storage_used_bytes(TENANT).await.unwrap(), 200);
}

#[tokio::test]
async fn embeddings_round_trip_through_the_json_column() {
    let repo = repo().await;
    repo.upsert(&record("content_e", "", 0)).await.unwrap();

    let vectors = repo.vectors(TENANT, None).await.unwrap();
    assert_eq!(vectors[0].embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn vectors_filter_by_content_type() {
    let repo = repo().await;
    repo.upsert(&record("content_a", "", 0)).await.unwrap();
    let mut lecture = record("content_b", "", 0);
    lecture.content_type = "lecture".to_owned();
    repo.upsert(&lecture).await.unwrap();

    let lectures = repo.vectors(TENANT, Some("lecture")).await.unwrap();
    assert_eq!(lectures.len(), 1);
    assert_eq!(lectures[0].id, ContentId::new("content_b"));
}

#[tokio::test]
async fn source_fragment_lookup_finds_the_newest_match() {
    let repo = repo().await;
    repo.upsert(&record(
        "content_yt",
        "https://www.youtube.com/watch?v=XYZabc12345",
        0,
    ))
    .await
    .unwrap();

    let found = repo
        .find_by_source_fragment(TENANT, "XYZabc12345")
        .await
        .unwrap();
    assert_eq!(found, Some(ContentId::new("content_yt")));

    assert_eq!(
        repo.find_by_source_fragment(TENANT, "missing").await.unwrap(),
        None
    );
    assert_eq!(
        repo.find_by_source_fragment(TenantId::new(99), "XYZabc12345")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn exact_source_lookup_requires_a_verbatim_match() {
    let repo = repo().await;
    repo.upsert(&record("content_v", "https://vimeo.com/1", 0)).await.unwrap();

    assert_eq!(
        repo.find_by_source_exact(TENANT, "https://vimeo.com/1").await.unwrap(),
        Some(ContentId::new("content_v"))
    );
    assert_eq!(
        repo.find_by_source_exact(TENANT, "https://vimeo.com/12").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn entity_vectors_are_replaced_with_their_parent() {
    let repo = repo().await;
    let id = ContentId::new("content_ent");
    repo.upsert(&record("content_ent", "", 0)).await.unwrap();

    let entity = |name: &str| EntityRecord {
        content_id: id.clone(),
        entity_name: name.to_owned(),
        entity_type: "concept".to_owned(),
        embedding: vec![1.0, 0.0],
    };
    repo.replace_entities(TENANT, &id, &[entity("A"), entity("B")])
        .await
        .unwrap();
    assert_eq!(repo.entity_vectors(TENANT).await.unwrap().len(), 2);

    repo.replace_entities(TENANT, &id, &[entity("C")]).await.unwrap();
    let entities = repo.entity_vectors(TENANT).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].entity_name, "C");
    assert_eq!(entities[0].embedding, vec![1.0, 0.0]);
}

#[tokio::test]
async fn delete_removes_the_row_and_its_entities() {
    let repo = repo().await;
    let id = ContentId::new("content_d");
    repo.upsert(&record("content_d", "", 10)).await.unwrap();
    repo.replace_entities(
        TENANT,
        &id,
        &[EntityRecord {
            content_id: id.clone(),
            entity_name: "X".to_owned(),
            entity_type: "".to_owned(),
            embedding: vec![],
        }],
    )
    .await
    .unwrap();

    assert!(repo.delete(TENANT, &id).await.unwrap());
    assert!(repo.get(TENANT, &id).await.unwrap().is_none());
    assert!(repo.entity_vectors(TENANT).await.unwrap().is_empty());
    assert!(!repo.delete(TENANT, &id).await.unwrap());
}

#[tokio::test]
async fn collection_rows_and_membership_round_trip() {
    let repo = repo().await;
    let id = ContentId::new("content_c");
    repo.upsert(&record("content_c", "", 0)).await.unwrap();

    let coll = CollectionId::new("coll_abcd1234");
    repo.create_collection(
        TENANT,
        &CollectionInfo {
            id: coll.clone(),
            name: "Course".to_owned(),
            description: "desc".to_owned(),
            created_at: 1,
        },
    )
    .await
    .unwrap();

    let listed = repo.list_collections(TENANT).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Course");

    assert!(repo.set_collections(TENANT, &id, &[coll.clone()]).await.unwrap());
    assert_eq!(
        repo.get_collections_of(TENANT, &id).await.unwrap(),
        Some(vec![coll.clone()])
    );

    assert!(repo.delete_collection(TENANT, &coll).await.unwrap());
    assert!(repo.list_collections(TENANT).await.unwrap().is_empty());
    // Contents remain, just unlinked from the deleted collection row.
    assert!(repo.get(TENANT, &id).await.unwrap().is_some());
}

#[tokio::test]
async fn storage_sum_is_scoped_to_the_tenant() {
    let repo = repo().await;
    repo.upsert(&record("content_a", "", 100)).await.unwrap();
    repo.upsert(&record("content_b", "", 250)).await.unwrap();
    let mut other = record("content_other", "", 999);
    other.tenant = TenantId::new(99);
    repo.upsert(&other).await.unwrap();

    assert_eq!(repo.storage_used_bytes(TENANT).await.unwrap(), 350);
    assert_eq!(repo.storage_used_bytes(TenantId::new(99)).await.unwrap(), 999);
    assert_eq!(repo.storage_used_bytes(TenantId::new(1)).await.unwrap(), 0);
}
