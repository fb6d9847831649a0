use lariat_core::StoreError;
use thiserror::Error;

/// Failures of the create operation.
///
/// Business outcomes keep their own variants so the boundary can map
/// them to distinct user-facing responses. Infrastructure failures all
/// collapse into [`Unavailable`](CreateError::Unavailable), whose
/// display deliberately says nothing about the cause; the source error
/// stays attached for logs.
#[derive(Debug, Clone, Error)]
pub enum CreateError {
    #[error("a short link for this url already exists")]
    DuplicateOriginalUrl,
    #[error("the pool of short codes with length {length} is exhausted")]
    PoolExhausted { length: u32 },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid code length: {0}")]
    InvalidLength(String),
    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),
    #[error("temporarily unavailable, please try again later")]
    Unavailable(#[source] StoreError),
}

/// Failures of the resolve operation.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("no short link with that code exists")]
    NotFound,
    #[error("temporarily unavailable, please try again later")]
    Unavailable(#[source] StoreError),
}
