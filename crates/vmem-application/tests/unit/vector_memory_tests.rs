//! Vector memory semantics: round-trips, dedup by natural identifier,
//! similarity ranking, entity replacement, collections.

use std::sync::Arc;

use vmem_application::use_cases::VectorMemory;
use vmem_domain::entities::{ContentExtract, EntityMention};
use vmem_domain::ports::VectorMemoryInterface;
use vmem_domain::value_objects::{ContentId, TenantId};

use crate::test_utils::{FakeContentRepository, FakeEmbeddingProvider};

const TENANT: TenantId = TenantId::new(7);
const OTHER_TENANT: TenantId = TenantId::new(8);

fn memory() -> (VectorMemory, Arc<FakeContentRepository>) {
    let contents = Arc::new(FakeContentRepository::default());
    (
        VectorMemory::new(contents.clone(), Arc::new(FakeEmbeddingProvider)),
        contents,
    )
}

fn content(id: &str, title: &str, source_url: Option<&str>) -> ContentExtract {
    ContentExtract {
        id: ContentId::new(id),
        title: title.to_owned(),
        summary: format!("{title} summary"),
        content_type: "tutorial".to_owned(),
        mode: "general".to_owned(),
        speaker: String::new(),
        topics: vec!["testing".to_owned()],
        key_points: vec![],
        entities: vec![],
        action_items: vec![],
        quotes: vec![],
        resources: vec![],
        tags: vec![],
        transcript: "some spoken words".to_owned(),
        segments: vec![],
        frame_descriptions: vec![],
        frame_analyses: None,
        timeline: None,
        duration_seconds: Some(180),
        source_url: source_url.map(str::to_owned),
        source_video: None,
        collections: vec![],
        file_size_bytes: 1024,
        created_at: "2026-01-01T00:00:00Z".to_owned(),
        metadata: serde_json::Map::new(),
        recipe: None,
        learn: None,
        creator: None,
        meeting: None,
    }
}

#[tokio::test]
async fn add_then_get_round_trips_the_content() {
    let (memory, _) = memory();
    let original = content("content_rt", "Round Trip", Some("https://example.com/v"));
    memory.add(TENANT, &original).await.unwrap();

    let loaded = memory
        .get(TENANT, &ContentId::new("content_rt"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, original.id);
    assert_eq!(loaded.title, original.title);
    assert_eq!(loaded.transcript, original.transcript);
    assert_eq!(loaded.source_url, original.source_url);
}

#[tokio::test]
async fn tenants_are_isolated() {
    let (memory, _) = memory();
    memory
        .add(TENANT, &content("content_a", "Mine", None))
        .await
        .unwrap();

    assert!(memory
        .get(OTHER_TENANT, &ContentId::new("content_a"))
        .await
        .unwrap()
        .is_none());
    assert!(memory.list(OTHER_TENANT).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_returns_newest_first() {
    let (memory, _) = memory();
    memory.add(TENANT, &content("content_1", "First", None)).await.unwrap();
    memory.add(TENANT, &content("content_2", "Second", None)).await.unwrap();

    let listed = memory.list(TENANT).await.unwrap();
    assert_eq!(listed[0].id, ContentId::new("content_2"));
    assert_eq!(listed[1].id, ContentId::new("content_1"));
}

#[tokio::test]
async fn find_by_source_url_matches_across_surface_forms() {
    let (memory, _) = memory();
    memory
        .add(
            TENANT,
            &content(
                "content_yt",
                "Video",
                Some("https://www.youtube.com/watch?v=XYZabc12345"),
            ),
        )
        .await
        .unwrap();

    let found = memory
        .find_by_source_url(TENANT, "https://youtu.be/XYZabc12345")
        .await
        .unwrap();
    assert_eq!(found, Some(ContentId::new("content_yt")));

    // A different video id does not match.
    let other = memory
        .find_by_source_url(TENANT, "https://youtu.be/AAAABBBBCCC")
        .await
        .unwrap();
    assert_eq!(other, None);
}

#[tokio::test]
async fn find_by_source_url_is_verbatim_for_urls_without_identifiers() {
    let (memory, _) = memory();
    memory
        .add(
            TENANT,
            &content("content_v", "Vimeo", Some("https://vimeo.com/987654321")),
        )
        .await
        .unwrap();

    assert_eq!(
        memory
            .find_by_source_url(TENANT, "https://vimeo.com/987654321")
            .await
            .unwrap(),
        Some(ContentId::new("content_v"))
    );
    assert_eq!(
        memory
            .find_by_source_url(TENANT, "https://vimeo.com/987654321?autoplay=1")
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn reprocessing_the_same_id_overwrites_the_row() {
    let (memory, contents) = memory();
    memory.add(TENANT, &content("content_dup", "Old Title", None)).await.unwrap();
    memory.add(TENANT, &content("content_dup", "New Title", None)).await.unwrap();

    assert_eq!(contents.contents.lock().unwrap().len(), 1);
    let loaded = memory
        .get(TENANT, &ContentId::new("content_dup"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.title, "New Title");
}

#[tokio::test]
async fn search_ranks_by_cosine_similarity() {
    let (memory, _) = memory();
    // The fake embedding counts letters, so a query full of 'a's lands
    // nearest the 'a'-heavy content.
    memory.add(TENANT, &content("content_a", "aaaa aaaa aaaa", None)).await.unwrap();
    memory.add(TENANT, &content("content_b", "bbbb bbbb bbbb", None)).await.unwrap();

    let results = memory
        .search(TENANT, "aaaa aaaa", 5, None, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content.id, ContentId::new("content_a"));
    assert!(results[0].similarity >= results[1].similarity);
    assert!(results.iter().all(|r| r.similarity >= -1.0 && r.similarity <= 1.0));
}

#[tokio::test]
async fn search_filters_by_content_type_and_collection() {
    let (memory, _) = memory();
    let mut tutorial = content("content_t", "aaaa", None);
    tutorial.content_type = "tutorial".to_owned();
    let mut lecture = content("content_l", "aaaa", None);
    lecture.content_type = "lecture".to_owned();
    memory.add(TENANT, &tutorial).await.unwrap();
    memory.add(TENANT, &lecture).await.unwrap();

    let only_lectures = memory
        .search(TENANT, "aaaa", 5, Some("lecture"), None)
        .await
        .unwrap();
    assert_eq!(only_lectures.len(), 1);
    assert_eq!(only_lectures[0].content.id, ContentId::new("content_l"));

    let coll = memory.create_collection(TENANT, "Course", "").await.unwrap();
    memory
        .add_to_collection(TENANT, &ContentId::new("content_t"), &coll)
        .await
        .unwrap();
    let scoped = memory.search(TENANT, "aaaa", 5, None, Some(&coll)).await.unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].content.id, ContentId::new("content_t"));
}

#[tokio::test]
async fn entity_vectors_are_replaced_wholesale() {
    let (memory, contents) = memory();
    let mut with_two = content("content_e", "Entities", None);
    with_two.entities = vec![
        EntityMention {
            name: "Alpha".to_owned(),
            entity_type: "concept".to_owned(),
            description: String::new(),
        },
        EntityMention {
            name: "Beta".to_owned(),
            entity_type: "concept".to_owned(),
            description: String::new(),
        },
    ];
    memory.add(TENANT, &with_two).await.unwrap();
    assert_eq!(contents.entities.lock().unwrap().len(), 2);

    let mut with_one = with_two.clone();
    with_one.entities.truncate(1);
    memory.add(TENANT, &with_one).await.unwrap();

    let entities = contents.entities.lock().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].1.entity_name, "Alpha");
}

#[tokio::test]
async fn search_by_entity_returns_parent_contents_once() {
    let (memory, _) = memory();
    let mut c = content("content_ent", "Parent", None);
    c.entities = vec![
        EntityMention {
            name: "Redis".to_owned(),
            entity_type: "product".to_owned(),
            description: "queue".to_owned(),
        },
        EntityMention {
            name: "Redis Cluster".to_owned(),
            entity_type: "product".to_owned(),
            description: "scaling".to_owned(),
        },
    ];
    memory.add(TENANT, &c).await.unwrap();

    let found = memory
        .search_by_entity(TENANT, &["Redis".to_owned()], 5)
        .await
        .unwrap();
    // Both entity vectors point at the same parent; it appears once.
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ContentId::new("content_ent"));
}

#[tokio::test]
async fn delete_removes_content_and_its_entities() {
    let (memory, contents) = memory();
    let mut c = content("content_d", "Doomed", None);
    c.entities = vec![EntityMention {
        name: "X".to_owned(),
        entity_type: "concept".to_owned(),
        description: String::new(),
    }];
    memory.add(TENANT, &c).await.unwrap();

    assert!(memory.delete(TENANT, &ContentId::new("content_d")).await.unwrap());
    assert!(memory.get(TENANT, &ContentId::new("content_d")).await.unwrap().is_none());
    assert!(contents.entities.lock().unwrap().is_empty());
}

#[tokio::test]
async fn collection_membership_round_trips() {
    let (memory, _) = memory();
    memory.add(TENANT, &content("content_c", "In Course", None)).await.unwrap();
    let coll = memory.create_collection(TENANT, "Course", "desc").await.unwrap();
    let id = ContentId::new("content_c");

    assert!(memory.add_to_collection(TENANT, &id, &coll).await.unwrap());
    // Adding twice keeps a single membership.
    assert!(memory.add_to_collection(TENANT, &id, &coll).await.unwrap());

    let listed = memory.collection_contents(TENANT, &coll).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);

    assert!(memory.remove_from_collection(TENANT, &id, &coll).await.unwrap());
    assert!(!memory.remove_from_collection(TENANT, &id, &coll).await.unwrap());
    assert!(memory.collection_contents(TENANT, &coll).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_without_searchable_change_keeps_the_embedding() {
    let (memory, contents) = memory();
    let mut c = content("content_u", "Stable", None);
    memory.add(TENANT, &c).await.unwrap();
    let embedding_before = contents.contents.lock().unwrap()[0].embedding.clone();

    // Thumbnails live in metadata, which is outside the searchable text.
    c.metadata.insert(
        "thumbnails".to_owned(),
        serde_json::json!([{"timestamp": 0.0, "filename": "0.jpg"}]),
    );
    assert!(memory.update(TENANT, &c.id.clone(), &c).await.unwrap());

    let row = &contents.contents.lock().unwrap()[0];
    assert_eq!(row.embedding, embedding_before);
    assert!(row.full_content.get("metadata").unwrap().get("thumbnails").is_some());
}
