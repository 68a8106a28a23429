//! Value objects: strong-typed identifiers and embedding vectors.

use serde::{Deserialize, Serialize};

define_id!(JobId, "Strong typed identifier for an ingestion job");

/// Tenant identifier: a logical owner of jobs, contents, and credits.
///
/// Integer-keyed for compatibility with the relational schema; every query
/// in the system is scoped by this value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    Serialize,
    Deserialize,
)]
#[display("{_0}")]
pub struct TenantId(i64);

impl TenantId {
    /// Wrap a raw tenant key.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Access the raw tenant key.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

/// Opaque content identifier (`content_<timestamp>` shape, server-assigned).
///
/// Deliberately a string: dedup by source URL can substitute an existing id
/// for a freshly generated one (spec: the retained row keeps its id).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    Serialize,
    Deserialize,
)]
#[display("{_0}")]
pub struct ContentId(String);

impl ContentId {
    /// Wrap an existing identifier string.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque collection identifier (`coll_<hex8>` shape, server-assigned).
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
    Serialize,
    Deserialize,
)]
#[display("{_0}")]
pub struct CollectionId(String);

impl CollectionId {
    /// Wrap an existing identifier string.
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CollectionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A dense embedding vector plus the model that produced it.
///
/// Vectors are normalized by the provider; the dimension is fixed at model
/// load time and identical for every vector written in one process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// Normalized vector components
    pub vector: Vec<f32>,
    /// Name of the model that produced this vector
    pub model: String,
}

impl Embedding {
    /// Number of dimensions in this vector.
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Cosine similarity against another vector of the same dimension.
    ///
    /// Returns 0.0 when either vector has zero magnitude.
    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        cosine_similarity(&self.vector, other)
    }
}

/// Cosine similarity between two raw vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Lightweight collection descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection identifier
    pub id: CollectionId,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: String,
    /// Creation time (Unix epoch seconds)
    pub created_at: i64,
}
