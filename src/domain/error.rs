//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the code-context engine
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {source}")]
    Io {
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

    /// Codebase path does not exist
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found
        path: String,
    },

    /// Codebase path exists but is not a directory
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path
        path: String,
    },

    /// An indexing task is already running for this codebase
    #[error("already indexing: {path}")]
    AlreadyIndexing {
        /// The codebase being indexed
        path: String,
    },

    /// The codebase has never been indexed; callers should index it first
    #[error("codebase not indexed: {path}; run index_codebase before searching")]
    NotIndexed {
        /// The codebase that has no index
        path: String,
    },

    /// Generic resource-not-found error (collections, manifests)
    #[error("not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// Vector length does not match the collection dimension
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed at collection creation
        expected: usize,
        /// Dimension of the rejected vector
        actual: usize,
    },

    /// Store-side collection quota exhausted; non-retryable and user-visible
    #[error("collection limit reached: {message}")]
    CollectionLimitReached {
        /// Store-provided detail
        message: String,
    },

    /// Vector store cannot be reached or is not initialized
    #[error("vector store unavailable: {message}")]
    Unavailable {
        /// Transport- or storage-level detail
        message: String,
    },

    /// Embedding provider could not be reached
    #[error("embedding provider unavailable: {message}")]
    ProviderUnavailable {
        /// Transport-level detail
        message: String,
    },

    /// Embedding provider rejected the configured credentials
    #[error("embedding provider authentication failed: {message}")]
    ProviderAuthFailure {
        /// Provider-supplied detail
        message: String,
    },

    /// Embedding provider returned a payload without the expected vectors
    #[error("invalid provider response: {message}")]
    InvalidResponse {
        /// What was missing or malformed
        message: String,
    },

    /// Filter expression referenced an unknown field or failed to parse
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// Parser or evaluator detail
        message: String,
    },

    /// Snapshot verification could not determine collection state
    #[error("verification inconclusive: {message}")]
    VerificationInconclusive {
        /// Underlying store error detail
        message: String,
    },

    /// Operation was cancelled via its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Internal system error
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl Error {
    /// Create a path-not-found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    /// Create a not-a-directory error
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory { path: path.into() }
    }

    /// Create an already-indexing error
    pub fn already_indexing(path: impl Into<String>) -> Self {
        Self::AlreadyIndexing { path: path.into() }
    }

    /// Create a not-indexed error
    pub fn not_indexed(path: impl Into<String>) -> Self {
        Self::NotIndexed { path: path.into() }
    }

    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a collection-limit error
    pub fn collection_limit(message: impl Into<String>) -> Self {
        Self::CollectionLimitReached {
            message: message.into(),
        }
    }

    /// Create a store-unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a provider-unavailable error
    pub fn provider_unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            message: message.into(),
        }
    }

    /// Create a provider-auth error
    pub fn provider_auth(message: impl Into<String>) -> Self {
        Self::ProviderAuthFailure {
            message: message.into(),
        }
    }

    /// Create an invalid-response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create an invalid-filter error
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create a verification-inconclusive error
    pub fn verification_inconclusive(message: impl Into<String>) -> Self {
        Self::VerificationInconclusive {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when retrying the same operation cannot succeed.
    ///
    /// Batch retry loops consult this to avoid hammering a provider that
    /// rejected credentials or a store that ran out of collection quota.
    pub fn is_non_retryable(&self) -> bool {
        matches!(
            self,
            Self::CollectionLimitReached { .. }
                | Self::ProviderAuthFailure { .. }
                | Self::DimensionMismatch { .. }
                | Self::InvalidFilter { .. }
                | Self::Cancelled
        )
    }
}
