use crate::error::StoreError;
use crate::link::{ActiveLink, Link, NewLink};
use async_trait::async_trait;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Click metadata beyond this many characters is dropped so an
/// oversized descriptor can never fail the redirect that produced it.
pub const MAX_CLICK_METADATA_CHARS: usize = 2000;

/// Truncates click metadata to [`MAX_CLICK_METADATA_CHARS`].
pub fn clip_click_metadata(metadata: &str) -> String {
    metadata.chars().take(MAX_CLICK_METADATA_CHARS).collect()
}

/// Durable mapping of short code to original URL plus metadata.
///
/// The store is the single arbiter of both uniqueness invariants:
/// concurrent creators racing on the same original URL lose with
/// [`StoreError::DuplicateOriginalUrl`], and racing on the same short
/// code lose with [`StoreError::CodeCollision`]. Callers never
/// pre-check for duplicates outside the insert itself.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Inserts a new link and returns its row id.
    ///
    /// Fails with [`StoreError::CodeCollision`] when the short code is
    /// already taken by any row (active or not), and with
    /// [`StoreError::DuplicateOriginalUrl`] when a link for this
    /// original URL already exists.
    async fn insert(&self, link: NewLink) -> Result<i64>;

    /// Whether any row, in any state, holds this short code.
    async fn code_exists(&self, code: &str) -> Result<bool>;

    /// Looks up an active link by short code. Banned or expired rows
    /// are reported as `None` even though they remain present for
    /// audit.
    async fn find_active(&self, code: &str) -> Result<Option<Link>>;

    /// Number of rows with this code length, regardless of state.
    /// Feeds capacity accounting: banned and expired codes keep
    /// consuming capacity because their codes are never reissued.
    async fn count_with_length(&self, length: u32) -> Result<u64>;

    /// Appends a click event and increments the link's click count.
    /// Metadata longer than 2000 characters is truncated rather than
    /// rejected.
    async fn record_click(&self, link_id: i64, metadata: &str) -> Result<()>;

    /// All currently active links, for cache warmup. Applies the same
    /// visibility rule as [`find_active`](LinkStore::find_active).
    async fn list_active(&self) -> Result<Vec<ActiveLink>>;

    /// Marks a link as banned and stamps `banned_at`. Returns `false`
    /// if no non-banned row holds this code.
    async fn ban(&self, code: &str) -> Result<bool>;
}
