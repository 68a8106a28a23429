//! Blob storage providers (thumbnails).

pub mod local;
pub mod rest;

pub use local::LocalBlobStorage;
pub use rest::RestBlobStorage;
