use thiserror::Error;

/// Failure to reverse the opaque codec transform.
///
/// Decode failures never crash a caller: the store skips the affected
/// row and the cache layer reports the entry as a miss.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("token is not valid base58: {0}")]
    InvalidEncoding(String),
    #[error("decoded bytes are not valid utf-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// An active link with this original URL already exists.
    #[error("a link for this original url already exists")]
    DuplicateOriginalUrl,
    /// The candidate short code is already taken, in any state.
    /// Creation retries with a fresh candidate.
    #[error("short code is already taken")]
    CodeCollision,
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

impl From<DecodeError> for CacheError {
    fn from(value: DecodeError) -> Self {
        CacheError::InvalidData(value.to_string())
    }
}
