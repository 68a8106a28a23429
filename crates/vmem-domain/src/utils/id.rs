//! Identifier generation for contents and collections.

use chrono::Utc;

use crate::value_objects::{CollectionId, ContentId};

/// Generate a fresh content id (`content_YYYYMMDD_HHMMSS_xxxx`).
///
/// The timestamp keeps ids human-sortable; the short random suffix avoids
/// collisions when two workers persist in the same second.
#[must_use]
pub fn new_content_id() -> ContentId {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = &uuid::Uuid::new_v4().simple().to_string()[..4];
    ContentId::new(format!("content_{stamp}_{suffix}"))
}

/// Generate a fresh collection id (`coll_<hex8>`).
#[must_use]
pub fn new_collection_id() -> CollectionId {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    CollectionId::new(format!("coll_{}", &hex[..8]))
}
