use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use lariat_core::{Alphabet, CachedLink, LinkCache, LinkStore, NewLink, StoreError};
use lariat_generator::CodeGenerator;
use tracing::{debug, info, trace, warn};

use crate::capacity::CapacityTracker;
use crate::error::{CreateError, ResolveError};

/// Expiration policy for a short link.
#[derive(Debug, Clone)]
pub enum ExpirationPolicy {
    /// The link never expires.
    Never,
    /// The link expires after a certain duration from now.
    AfterDuration(SignedDuration),
    /// The link expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

impl ExpirationPolicy {
    fn resolve_at(&self, now: Timestamp) -> Result<Option<Timestamp>, CreateError> {
        match self {
            ExpirationPolicy::Never => Ok(None),
            ExpirationPolicy::AfterDuration(duration) => now
                .checked_add(*duration)
                .map(Some)
                .map_err(|e| CreateError::InvalidExpiration(e.to_string())),
            ExpirationPolicy::AtTimestamp(timestamp) => Ok(Some(*timestamp)),
        }
    }
}

/// Parameters for creating a short link.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub original_url: String,
    /// Length class for the generated code.
    pub code_length: u32,
    pub expiration: ExpirationPolicy,
}

/// Outcome of a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedLink {
    pub id: i64,
    pub short_code: String,
}

/// Orchestrates creation and resolution of short links.
///
/// Creation walks capacity check, candidate generation with collision
/// retry, the store insert, and finally cache population. Resolution
/// consults the cache first, falls back to the store, and records a
/// click exactly once per successful lookup, whichever path supplied
/// the URL.
///
/// The store is the single arbiter of both uniqueness invariants;
/// races between concurrent creators are settled by the insert, never
/// by pre-checks. The cache is a pure accelerator: every cache failure
/// is absorbed here and degrades to store traffic.
#[derive(Debug, Clone)]
pub struct ResolutionService<S, C, G> {
    store: Arc<S>,
    cache: Arc<C>,
    generator: G,
    capacity: CapacityTracker<S>,
}

impl<S: LinkStore, C: LinkCache, G: CodeGenerator> ResolutionService<S, C, G> {
    /// Creates a service. The alphabet must be the one the generator
    /// draws from; it drives capacity accounting.
    pub fn new(store: S, cache: C, generator: G, alphabet: Alphabet) -> Self {
        let store = Arc::new(store);
        Self {
            capacity: CapacityTracker::new(Arc::clone(&store), alphabet),
            store,
            cache: Arc::new(cache),
            generator,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Validates that the URL has an http(s) scheme and a host.
    fn validate_url(url: &str) -> Result<(), CreateError> {
        if url.is_empty() {
            return Err(CreateError::InvalidUrl("url cannot be empty".to_string()));
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(CreateError::InvalidUrl(format!(
                "url must have a scheme and host: {url}"
            )));
        };

        if rest.is_empty() {
            return Err(CreateError::InvalidUrl(format!(
                "url must have a host: {url}"
            )));
        }

        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(CreateError::InvalidUrl(format!(
                "url scheme must be http or https: {scheme}"
            )));
        }

        Ok(())
    }

    /// Creates a new short link for `request.original_url`.
    ///
    /// Fails fast with [`CreateError::PoolExhausted`] before any
    /// generation attempt when the length's keyspace is fully issued;
    /// the same check is what makes the unbounded collision-retry loop
    /// safe. A failed insert never populates the cache.
    pub async fn create(&self, request: CreateRequest) -> Result<CreatedLink, CreateError> {
        Self::validate_url(&request.original_url)?;
        if request.code_length == 0 {
            return Err(CreateError::InvalidLength(
                "code length must be at least 1".to_string(),
            ));
        }
        let expires_at = request.expiration.resolve_at(Timestamp::now())?;

        if self
            .capacity
            .is_exhausted(request.code_length)
            .await
            .map_err(CreateError::Unavailable)?
        {
            return Err(CreateError::PoolExhausted {
                length: request.code_length,
            });
        }

        let (id, short_code) = loop {
            // A fresh, independent draw on every attempt; candidates
            // are never derived from a colliding predecessor.
            let candidate = self.generator.generate(request.code_length);
            if self
                .store
                .code_exists(&candidate)
                .await
                .map_err(CreateError::Unavailable)?
            {
                trace!(code = %candidate, "candidate already issued, regenerating");
                continue;
            }

            match self
                .store
                .insert(NewLink {
                    short_code: candidate.clone(),
                    original_url: request.original_url.clone(),
                    code_length: request.code_length,
                    expires_at,
                })
                .await
            {
                Ok(id) => break (id, candidate),
                // Lost a race on the code to a concurrent creator.
                Err(StoreError::CodeCollision) => {
                    trace!(code = %candidate, "lost code race, regenerating");
                    continue;
                }
                Err(StoreError::DuplicateOriginalUrl) => {
                    return Err(CreateError::DuplicateOriginalUrl)
                }
                Err(e) => return Err(CreateError::Unavailable(e)),
            }
        };

        let entry = CachedLink {
            original_url: request.original_url,
            link_id: id,
        };
        if let Err(e) = self.cache.put(&short_code, &entry).await {
            warn!(code = %short_code, error = %e, "failed to populate cache after insert");
        }

        debug!(code = %short_code, id, "created short link");
        Ok(CreatedLink { id, short_code })
    }

    /// Resolves a short code to its original URL and records the
    /// click.
    ///
    /// Cache errors count as misses. A store-fallback hit is written
    /// back to the cache so the next lookup is warm.
    pub async fn resolve(&self, code: &str, metadata: &str) -> Result<String, ResolveError> {
        let cached = match self.cache.get(code).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(code, error = %e, "cache error on lookup, treating as miss");
                None
            }
        };

        let (link_id, original_url) = match cached {
            Some(entry) => {
                debug!(code, "resolved from cache");
                (entry.link_id, entry.original_url)
            }
            None => {
                let link = self
                    .store
                    .find_active(code)
                    .await
                    .map_err(ResolveError::Unavailable)?
                    .ok_or(ResolveError::NotFound)?;
                debug!(code, "resolved from store");

                let entry = CachedLink {
                    original_url: link.original_url.clone(),
                    link_id: link.id,
                };
                if let Err(e) = self.cache.put(code, &entry).await {
                    warn!(code, error = %e, "failed to backfill cache after store lookup");
                }

                (link.id, link.original_url)
            }
        };

        self.store
            .record_click(link_id, metadata)
            .await
            .map_err(ResolveError::Unavailable)?;

        Ok(original_url)
    }

    /// Rebuilds the cache from every currently active link. Meant to
    /// run at process start, before traffic. Returns the number of
    /// entries loaded.
    pub async fn warm_cache(&self) -> Result<usize, StoreError> {
        let links = self.store.list_active().await?;
        let total = links.len();

        let mut loaded = 0;
        for link in links {
            let entry = CachedLink {
                original_url: link.original_url,
                link_id: link.id,
            };
            match self.cache.put(&link.short_code, &entry).await {
                Ok(()) => loaded += 1,
                Err(e) => {
                    warn!(code = %link.short_code, error = %e, "failed to warm cache entry");
                }
            }
        }

        info!(loaded, total, "cache warmup complete");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lariat_cache::MokaLinkCache;
    use lariat_core::store::Result as StoreResult;
    use lariat_core::{ActiveLink, Link};
    use lariat_generator::RandomCodeGenerator;
    use lariat_storage::MemoryLinkStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store decorator that counts lookups, to observe which path a
    /// resolve took.
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryLinkStore,
        find_active_calls: AtomicUsize,
    }

    impl CountingStore {
        fn find_active_calls(&self) -> usize {
            self.find_active_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LinkStore for CountingStore {
        async fn insert(&self, link: NewLink) -> StoreResult<i64> {
            self.inner.insert(link).await
        }

        async fn code_exists(&self, code: &str) -> StoreResult<bool> {
            self.inner.code_exists(code).await
        }

        async fn find_active(&self, code: &str) -> StoreResult<Option<Link>> {
            self.find_active_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_active(code).await
        }

        async fn count_with_length(&self, length: u32) -> StoreResult<u64> {
            self.inner.count_with_length(length).await
        }

        async fn record_click(&self, link_id: i64, metadata: &str) -> StoreResult<()> {
            self.inner.record_click(link_id, metadata).await
        }

        async fn list_active(&self) -> StoreResult<Vec<ActiveLink>> {
            self.inner.list_active().await
        }

        async fn ban(&self, code: &str) -> StoreResult<bool> {
            self.inner.ban(code).await
        }
    }

    /// Generator decorator that counts draws, to verify the exhaustion
    /// check short-circuits before any generation.
    #[derive(Debug)]
    struct CountingGenerator {
        inner: RandomCodeGenerator,
        calls: Arc<AtomicUsize>,
    }

    impl CodeGenerator for CountingGenerator {
        fn generate(&self, length: u32) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.generate(length)
        }
    }

    fn service() -> ResolutionService<CountingStore, MokaLinkCache, RandomCodeGenerator> {
        ResolutionService::new(
            CountingStore::default(),
            MokaLinkCache::new(),
            RandomCodeGenerator::new(),
            Alphabet::base62(),
        )
    }

    fn request(url: &str, length: u32) -> CreateRequest {
        CreateRequest {
            original_url: url.to_string(),
            code_length: length,
            expiration: ExpirationPolicy::Never,
        }
    }

    #[tokio::test]
    async fn create_issues_a_code_of_the_requested_length() {
        let service = service();

        let created = service
            .create(request("https://example.com", 7))
            .await
            .unwrap();
        assert_eq!(created.short_code.chars().count(), 7);

        let link = service
            .store()
            .find_active(&created.short_code)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(link.id, created.id);
        assert_eq!(link.code_length, 7);
    }

    #[tokio::test]
    async fn create_populates_the_cache() {
        let service = service();

        let created = service
            .create(request("https://example.com", 7))
            .await
            .unwrap();

        let entry = service
            .cache()
            .get(&created.short_code)
            .await
            .unwrap()
            .expect("cache entry after create");
        assert_eq!(entry.original_url, "https://example.com");
        assert_eq!(entry.link_id, created.id);
    }

    #[tokio::test]
    async fn create_rejects_invalid_urls() {
        let service = service();

        for url in ["", "example.com", "ftp://example.com", "https://"] {
            let err = service.create(request(url, 7)).await.unwrap_err();
            assert!(matches!(err, CreateError::InvalidUrl(_)), "url: {url}");
        }
    }

    #[tokio::test]
    async fn create_rejects_zero_length() {
        let service = service();
        let err = service
            .create(request("https://example.com", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::InvalidLength(_)));
    }

    #[tokio::test]
    async fn duplicate_url_fails_and_leaves_the_first_link_intact() {
        let service = service();

        let first = service
            .create(request("https://example.com", 7))
            .await
            .unwrap();
        let err = service
            .create(request("https://example.com", 7))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::DuplicateOriginalUrl));

        let url = service.resolve(&first.short_code, "ua=test").await.unwrap();
        assert_eq!(url, "https://example.com");
    }

    #[tokio::test]
    async fn failed_create_never_populates_the_cache() {
        let service = service();

        service
            .create(request("https://example.com", 7))
            .await
            .unwrap();
        let cache = service.cache();
        cache.sync().await;
        let entries_before = cache.entry_count();

        let err = service
            .create(request("https://example.com", 7))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::DuplicateOriginalUrl));

        cache.sync().await;
        assert_eq!(cache.entry_count(), entries_before);
    }

    #[tokio::test]
    async fn codes_never_collide_across_many_creations() {
        let service = service();
        let mut codes = std::collections::HashSet::new();

        for i in 0..500 {
            let created = service
                .create(request(&format!("https://example.com/{i}"), 5))
                .await
                .unwrap();
            assert!(codes.insert(created.short_code), "issued code twice");
        }
    }

    #[tokio::test]
    async fn small_pool_fills_up_then_rejects() {
        // Alphabet of two symbols, length 1: the pool holds exactly
        // two codes.
        let alphabet = Alphabet::new("ab");
        let calls = Arc::new(AtomicUsize::new(0));
        let generator = CountingGenerator {
            inner: RandomCodeGenerator::with_alphabet(alphabet.clone()),
            calls: Arc::clone(&calls),
        };
        let service = ResolutionService::new(
            CountingStore::default(),
            MokaLinkCache::new(),
            generator,
            alphabet,
        );

        service
            .create(request("https://a.example", 1))
            .await
            .unwrap();
        service
            .create(request("https://b.example", 1))
            .await
            .unwrap();

        let draws_before_exhaustion = calls.load(Ordering::SeqCst);
        let err = service
            .create(request("https://c.example", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateError::PoolExhausted { length: 1 }));
        // The exhaustion check fired before any generation attempt.
        assert_eq!(calls.load(Ordering::SeqCst), draws_before_exhaustion);

        // Both codes of the full pool were issued, none twice.
        let a = service.store().find_active("a").await.unwrap();
        let b = service.store().find_active("b").await.unwrap();
        assert!(a.is_some() && b.is_some());
    }

    #[tokio::test]
    async fn cold_resolve_falls_back_to_store_then_warms_the_cache() {
        let service = service();

        // Insert behind the service's back so the cache stays cold.
        service
            .store()
            .insert(NewLink {
                short_code: "abc1234".to_string(),
                original_url: "https://example.com".to_string(),
                code_length: 7,
                expires_at: None,
            })
            .await
            .unwrap();

        let url = service.resolve("abc1234", "ua=first").await.unwrap();
        assert_eq!(url, "https://example.com");
        assert_eq!(service.store().find_active_calls(), 1);

        // Second resolve is served from the cache.
        let url = service.resolve("abc1234", "ua=second").await.unwrap();
        assert_eq!(url, "https://example.com");
        assert_eq!(service.store().find_active_calls(), 1);

        // One click per resolution, regardless of the serving path.
        let link = service.store().inner.get_any("abc1234").unwrap();
        assert_eq!(link.click_count, 2);
    }

    #[tokio::test]
    async fn resolving_unknown_code_is_not_found_and_records_nothing() {
        let service = service();

        let err = service.resolve("missing", "ua=test").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
        assert!(service.store().inner.clicks_for(1).is_empty());
    }

    #[tokio::test]
    async fn resolving_banned_code_is_not_found() {
        let service = service();

        // Insert behind the service's back so the cache stays cold and
        // the store rule is what gets exercised.
        service
            .store()
            .insert(NewLink {
                short_code: "abc1234".to_string(),
                original_url: "https://example.com".to_string(),
                code_length: 7,
                expires_at: None,
            })
            .await
            .unwrap();
        service.store().ban("abc1234").await.unwrap();

        let err = service.resolve("abc1234", "ua=test").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
        assert!(service.store().inner.clicks_for(1).is_empty());
    }

    #[tokio::test]
    async fn resolving_expired_code_is_not_found() {
        let service = service();

        service
            .store()
            .insert(NewLink {
                short_code: "abc1234".to_string(),
                original_url: "https://example.com".to_string(),
                code_length: 7,
                expires_at: Some(Timestamp::now() - SignedDuration::from_secs(10)),
            })
            .await
            .unwrap();

        let err = service.resolve("abc1234", "ua=test").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
    }

    #[tokio::test]
    async fn stale_cache_entry_still_serves_after_ban() {
        // Known staleness window: entries are not evicted when a link
        // is banned after being cached.
        let service = service();
        let created = service
            .create(request("https://example.com", 7))
            .await
            .unwrap();

        service.store().ban(&created.short_code).await.unwrap();

        let url = service.resolve(&created.short_code, "ua=test").await.unwrap();
        assert_eq!(url, "https://example.com");
    }

    #[tokio::test]
    async fn warmup_loads_exactly_the_active_links() {
        let store = CountingStore::default();
        for (code, url) in [
            ("active1", "https://a.example"),
            ("active2", "https://b.example"),
            ("banned1", "https://c.example"),
        ] {
            store
                .insert(NewLink {
                    short_code: code.to_string(),
                    original_url: url.to_string(),
                    code_length: 7,
                    expires_at: None,
                })
                .await
                .unwrap();
        }
        store
            .insert(NewLink {
                short_code: "expire1".to_string(),
                original_url: "https://d.example".to_string(),
                code_length: 7,
                expires_at: Some(Timestamp::now() - SignedDuration::from_secs(1)),
            })
            .await
            .unwrap();
        store.ban("banned1").await.unwrap();

        let service = ResolutionService::new(
            store,
            MokaLinkCache::new(),
            RandomCodeGenerator::new(),
            Alphabet::base62(),
        );

        let loaded = service.warm_cache().await.unwrap();
        assert_eq!(loaded, 2);

        let cache = service.cache();
        assert!(cache.get("active1").await.unwrap().is_some());
        assert!(cache.get("active2").await.unwrap().is_some());
        assert!(cache.get("banned1").await.unwrap().is_none());
        assert!(cache.get("expire1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expiration_policies_convert_to_timestamps() {
        let now = Timestamp::now();

        assert_eq!(ExpirationPolicy::Never.resolve_at(now).unwrap(), None);

        let at = now + SignedDuration::from_hours(1);
        assert_eq!(
            ExpirationPolicy::AtTimestamp(at).resolve_at(now).unwrap(),
            Some(at)
        );
        assert_eq!(
            ExpirationPolicy::AfterDuration(SignedDuration::from_hours(1))
                .resolve_at(now)
                .unwrap(),
            Some(at)
        );
    }
}
