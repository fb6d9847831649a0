use std::sync::Arc;

use async_trait::async_trait;
use lariat_core::cache::Result;
use lariat_core::{CacheError, CachedLink, Codec, LinkCache};
use redis::AsyncCommands;
use tracing::{debug, trace, warn};

/// A Redis-backed implementation of [`LinkCache`].
///
/// Keys and stored URLs are run through the opaque codec so the cache
/// never holds cleartext; values use the `{encoded_url}_{link_id}`
/// layout. Callers treat every error from here as a miss, so a flaky
/// or corrupted cache degrades to store lookups instead of failing
/// redirects.
#[derive(Debug, Clone)]
pub struct RedisLinkCache {
    conn: redis::aio::MultiplexedConnection,
    codec: Arc<dyn Codec>,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        CacheError::Timeout(message)
    } else {
        CacheError::Operation(message)
    }
}

/// Renders the stored value for a cache entry.
pub(crate) fn encode_value(codec: &dyn Codec, link: &CachedLink) -> String {
    format!("{}_{}", codec.encode(&link.original_url), link.link_id)
}

/// Parses a stored value back into a [`CachedLink`].
pub(crate) fn decode_value(codec: &dyn Codec, value: &str) -> Result<CachedLink> {
    let (encoded_url, id) = value
        .rsplit_once('_')
        .ok_or_else(|| CacheError::InvalidData(format!("malformed cache value '{value}'")))?;
    let link_id: i64 = id
        .parse()
        .map_err(|_| CacheError::InvalidData(format!("malformed link id in cache value '{value}'")))?;
    let original_url = codec.decode(encoded_url)?;

    Ok(CachedLink {
        original_url,
        link_id,
    })
}

impl RedisLinkCache {
    pub fn new(conn: redis::aio::MultiplexedConnection, codec: Arc<dyn Codec>) -> Self {
        Self {
            conn,
            codec,
            key_prefix: "lariat:link:".to_string(),
        }
    }

    /// Creates a cache with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        codec: Arc<dyn Codec>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            codec,
            key_prefix: key_prefix.into(),
        }
    }

    fn cache_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, self.codec.encode(code))
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get(&self, code: &str) -> Result<Option<CachedLink>> {
        let key = self.cache_key(code);
        trace!(code, "fetching entry from redis cache");

        let mut conn = self.conn.clone();
        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value)) => match decode_value(self.codec.as_ref(), &value) {
                Ok(link) => {
                    debug!(code, "cache hit in redis");
                    Ok(Some(link))
                }
                Err(e) => {
                    warn!(code, error = %e, "cached value failed to decode");
                    Err(e)
                }
            },
            Ok(None) => {
                trace!(code, "cache miss in redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code, error = %e, "redis error on get");
                Err(map_redis_error("failed to fetch value from redis", e))
            }
        }
    }

    async fn put(&self, code: &str, link: &CachedLink) -> Result<()> {
        let key = self.cache_key(code);
        let value = encode_value(self.codec.as_ref(), link);
        trace!(code, link_id = link.link_id, "storing entry in redis cache");

        let mut conn = self.conn.clone();
        match conn.set::<_, _, ()>(&key, value).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(code, error = %e, "failed to cache entry in redis");
                Err(map_redis_error("failed to write value to redis", e))
            }
        }
    }
}
