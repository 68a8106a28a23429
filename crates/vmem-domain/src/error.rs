//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the vmem ingestion pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {source}")]
    IoSimple {
        /// The underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Resource not found error
    #[error("Not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Invalid argument provided to a function
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument
        message: String,
    },

    /// Media acquisition error (download, probe, frame extraction)
    #[error("Media error: {message}")]
    Media {
        /// Description of the media error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Speech-to-text service error
    #[error("Transcription error: {message}")]
    Transcription {
        /// Description of the transcription error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vision captioning error
    #[error("Vision error: {message}")]
    Vision {
        /// Description of the vision error
        message: String,
    },

    /// Content extraction (LLM) error
    #[error("Extraction error: {message}")]
    Extraction {
        /// Description of the extraction error
        message: String,
    },

    /// Embedding provider operation error
    #[error("Embedding provider error: {message}")]
    Embedding {
        /// Description of the embedding provider error
        message: String,
    },

    /// Vector memory operation error
    #[error("Vector memory error: {message}")]
    VectorMemory {
        /// Description of the vector memory error
        message: String,
    },

    /// Job lifecycle error
    #[error("Job error: {message}")]
    Job {
        /// Description of the job error
        message: String,
    },

    /// Insufficient credit balance for a deduction
    #[error("Insufficient credits: need {required}, have {available}. Upgrade for more credits.")]
    InsufficientCredits {
        /// Credits required by the operation
        required: i64,
        /// Credits currently available
        available: i64,
    },

    /// Tier quota denied the operation (duration or storage)
    #[error("{message}")]
    QuotaDenied {
        /// User-facing denial message including the limits
        message: String,
    },

    /// Queue operation error
    #[error("Queue error: {message}")]
    Queue {
        /// Description of the queue error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blob storage operation error
    #[error("Blob storage error: {message}")]
    Blob {
        /// Description of the blob error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// Missing configuration field
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    /// Network-related error
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database-related error
    #[error("Database error: {message}")]
    Database {
        /// Description of the database error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cache operation error
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache error
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Basic error creation methods
impl Error {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a media error
    pub fn media<S: Into<String>>(message: S) -> Self {
        Self::Media {
            message: message.into(),
            source: None,
        }
    }

    /// Create a media error with source
    pub fn media_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Media {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a transcription error
    pub fn transcription<S: Into<String>>(message: S) -> Self {
        Self::Transcription {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transcription error with source
    pub fn transcription_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Transcription {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a vision error
    pub fn vision<S: Into<String>>(message: S) -> Self {
        Self::Vision {
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction<S: Into<String>>(message: S) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    /// Create an embedding provider error
    pub fn embedding<S: Into<String>>(message: S) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a vector memory error
    pub fn vector_memory<S: Into<String>>(message: S) -> Self {
        Self::VectorMemory {
            message: message.into(),
        }
    }

    /// Create a job error
    pub fn job<S: Into<String>>(message: S) -> Self {
        Self::Job {
            message: message.into(),
        }
    }

    /// Create a quota denied error
    pub fn quota_denied<S: Into<String>>(message: S) -> Self {
        Self::QuotaDenied {
            message: message.into(),
        }
    }
}

// Infrastructure error creation methods
impl Error {
    /// Create a queue error
    pub fn queue<S: Into<String>>(message: S) -> Self {
        Self::Queue {
            message: message.into(),
            source: None,
        }
    }

    /// Create a queue error with source
    pub fn queue_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Queue {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a blob storage error
    pub fn blob<S: Into<String>>(message: S) -> Self {
        Self::Blob {
            message: message.into(),
            source: None,
        }
    }

    /// Create a blob storage error with source
    pub fn blob_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Blob {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source
    pub fn network_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a database error
    pub fn database<S: Into<String>>(message: S) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Create a database error with source
    pub fn database_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

// Note: driver and HTTP client error conversions are excluded for domain purity.
// The infrastructure layer is responsible for these conversions.
