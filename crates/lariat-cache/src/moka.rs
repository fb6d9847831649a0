use async_trait::async_trait;
use lariat_core::cache::Result;
use lariat_core::{CachedLink, LinkCache};
use moka::future::Cache;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

/// An in-memory cache implementation using Moka.
///
/// Suited to single-node deployments. Entries are evicted only under
/// capacity pressure: the trait exposes no removal and no TTL, so a
/// link that is banned after being cached keeps serving from here
/// until the next warmup rebuild.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<String, CachedLink>,
}

impl MokaLinkCache {
    /// Creates a cache with a default maximum capacity of 10,000
    /// entries.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Creates a cache holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache }
    }

    /// Returns a builder for a custom configuration.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfig::builder()
    }

    /// Number of entries currently cached. Eventually consistent.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Forces pending internal maintenance, so `entry_count` reflects
    /// completed inserts. Test helper.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get(&self, code: &str) -> Result<Option<CachedLink>> {
        match self.cache.get(code).await {
            Some(link) => {
                debug!(code, "cache hit in moka");
                Ok(Some(link))
            }
            None => {
                trace!(code, "cache miss in moka");
                Ok(None)
            }
        }
    }

    async fn put(&self, code: &str, link: &CachedLink) -> Result<()> {
        trace!(code, link_id = link.link_id, "storing entry in moka cache");
        self.cache.insert(code.to_string(), link.clone()).await;
        Ok(())
    }
}

/// Configuration for a [`MokaLinkCache`] with custom settings.
#[derive(Debug, TypedBuilder, Default)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold.
    #[builder(default, setter(strip_option))]
    max_capacity: Option<u64>,
}

impl From<CacheConfig> for MokaLinkCache {
    fn from(config: CacheConfig) -> Self {
        let mut builder = Cache::builder();

        if let Some(capacity) = config.max_capacity {
            builder = builder.max_capacity(capacity);
        }

        MokaLinkCache {
            cache: builder.build(),
        }
    }
}
