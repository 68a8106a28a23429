//! Embedding providers.

pub mod fastembed;

pub use fastembed::FastEmbedProvider;
