//! Pure helper functions with no infrastructure dependencies.

pub mod id;
pub mod time;
pub mod url;

pub use id::{new_collection_id, new_content_id};
pub use time::{epoch_secs, format_timestamp};
pub use url::{extract_youtube_id, is_youtube_url};
