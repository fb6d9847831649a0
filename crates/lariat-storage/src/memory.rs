use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use lariat_core::store::{clip_click_metadata, Result};
use lariat_core::{ActiveLink, Link, LinkStore, NewLink, StoreError};

/// A recorded click event.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickRecord {
    pub link_id: i64,
    pub metadata: String,
    pub created_at: Timestamp,
}

/// In-memory implementation of the link store, backed by DashMap.
///
/// Mirrors the SQLite store's semantics: original URLs are unique
/// across all rows, short codes are never reused, and banned or
/// expired rows stay in place (invisible to reads, still counted for
/// capacity). Values are held in cleartext since nothing is at rest.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    links: DashMap<String, Link>,
    url_index: DashMap<String, ()>,
    id_index: DashMap<i64, String>,
    clicks: DashMap<i64, Vec<ClickRecord>>,
    next_id: AtomicI64,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click events recorded for a link, in insertion order.
    pub fn clicks_for(&self, link_id: i64) -> Vec<ClickRecord> {
        self.clicks
            .get(&link_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Fetches a link by code regardless of ban/expiry state. Test and
    /// audit helper; resolution goes through `find_active`.
    pub fn get_any(&self, code: &str) -> Option<Link> {
        self.links.get(code).map(|entry| entry.clone())
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn insert(&self, link: NewLink) -> Result<i64> {
        if self.links.contains_key(&link.short_code) {
            return Err(StoreError::CodeCollision);
        }

        // Reserve the URL first so a racing creator of the same URL
        // loses with the business error, matching the database
        // constraint.
        match self.url_index.entry(link.original_url.clone()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateOriginalUrl),
            Entry::Vacant(vacant) => {
                vacant.insert(());
            }
        }

        match self.links.entry(link.short_code.clone()) {
            Entry::Occupied(_) => {
                self.url_index.remove(&link.original_url);
                Err(StoreError::CodeCollision)
            }
            Entry::Vacant(vacant) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                vacant.insert(Link {
                    id,
                    short_code: link.short_code.clone(),
                    original_url: link.original_url,
                    click_count: 0,
                    code_length: link.code_length,
                    banned: false,
                    banned_at: None,
                    created_at: Timestamp::now(),
                    expires_at: link.expires_at,
                });
                self.id_index.insert(id, link.short_code);
                Ok(id)
            }
        }
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        Ok(self.links.contains_key(code))
    }

    async fn find_active(&self, code: &str) -> Result<Option<Link>> {
        let now = Timestamp::now();
        Ok(self
            .links
            .get(code)
            .filter(|link| link.is_active(now))
            .map(|link| link.clone()))
    }

    async fn count_with_length(&self, length: u32) -> Result<u64> {
        let count = self
            .links
            .iter()
            .filter(|entry| entry.code_length == length)
            .count();
        Ok(count as u64)
    }

    async fn record_click(&self, link_id: i64, metadata: &str) -> Result<()> {
        let code = self
            .id_index
            .get(&link_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::Query(format!("no link with id {link_id}")))?;

        if let Some(mut link) = self.links.get_mut(&code) {
            link.click_count += 1;
        }

        self.clicks.entry(link_id).or_default().push(ClickRecord {
            link_id,
            metadata: clip_click_metadata(metadata),
            created_at: Timestamp::now(),
        });

        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<ActiveLink>> {
        let now = Timestamp::now();
        let mut active: Vec<ActiveLink> = self
            .links
            .iter()
            .filter(|entry| entry.is_active(now))
            .map(|entry| ActiveLink {
                id: entry.id,
                short_code: entry.short_code.clone(),
                original_url: entry.original_url.clone(),
            })
            .collect();
        active.sort_by_key(|link| link.id);
        Ok(active)
    }

    async fn ban(&self, code: &str) -> Result<bool> {
        match self.links.get_mut(code) {
            Some(mut link) if !link.banned => {
                link.banned = true;
                link.banned_at = Some(Timestamp::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
