use crate::error::CacheError;
use crate::link::CachedLink;
use async_trait::async_trait;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Write-through accelerator mapping short code to
/// (original URL, row id).
///
/// The cache is an optimization, never a correctness dependency: the
/// resolution service absorbs every error from this trait, treating a
/// failed `get` as a miss and a failed `put` as a no-op.
///
/// There is deliberately no removal surface. Entries for links that
/// become banned or expired after they were cached keep being served
/// until the next process restart rebuilds the cache from the store.
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Returns the cached entry for a short code, `Ok(None)` on miss.
    async fn get(&self, code: &str) -> Result<Option<CachedLink>>;

    /// Stores an entry, unconditionally overwriting any previous one.
    async fn put(&self, code: &str, link: &CachedLink) -> Result<()>;
}
