use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored short-link row, fully decoded.
///
/// Stores hand this out as one canonical typed entity: the opaque
/// codec is reversed exactly once at the store boundary, so business
/// logic never sees encoded values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Row id assigned by the store on insert.
    pub id: i64,
    /// The generated short code, unique for the lifetime of the system
    /// regardless of ban or expiry state.
    pub short_code: String,
    pub original_url: String,
    /// Number of resolved redirects. Never decreases.
    pub click_count: u64,
    /// The length class used for capacity accounting. Always equals
    /// the character length of `short_code`.
    pub code_length: u32,
    /// A banned link is never resolvable, but the row is kept for
    /// audit.
    pub banned: bool,
    pub banned_at: Option<Timestamp>,
    pub created_at: Timestamp,
    /// A link whose expiry lies in the past is treated as not found
    /// for resolution, but the row is kept for audit.
    pub expires_at: Option<Timestamp>,
}

impl Link {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// Not banned and not expired.
    pub fn is_active(&self, now: Timestamp) -> bool {
        !self.banned && !self.is_expired(now)
    }
}

/// Input for [`LinkStore::insert`](crate::store::LinkStore::insert).
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub short_code: String,
    pub original_url: String,
    pub code_length: u32,
    pub expires_at: Option<Timestamp>,
}

/// A warmup-feed projection of an active link.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveLink {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
}

/// The value side of a cache entry: just enough to serve a redirect
/// and attribute the click to the backing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLink {
    pub original_url: String,
    pub link_id: i64,
}
