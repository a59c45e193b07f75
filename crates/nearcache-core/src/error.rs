use thiserror::Error;

/// Errors surfaced by cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key is absent from both the local tier and the backend.
    #[error("cache miss")]
    Miss,

    /// Any transport, pool, or script failure from the shared backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// Value/destination shape mismatch in the payload codec.
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// An invalidation payload of the wrong length. Logged and dropped by the
    /// listener; never surfaced to callers.
    #[error("invalid invalidation payload: expected {expected} bytes, got {len}")]
    Protocol { expected: usize, len: usize },

    /// Invalid or missing construction-time configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CacheError {
    /// Create a new Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Create a new Configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check whether this error is a plain cache miss
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }
}

/// Errors produced by the payload codec.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The value could not be encoded to bytes.
    #[error("encode error: {0}")]
    Encode(String),

    /// The bytes could not be decoded into the destination.
    #[error("decode error: {0}")]
    Decode(String),
}

impl PayloadError {
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// Convenience result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
