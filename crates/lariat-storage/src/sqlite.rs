use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use lariat_core::store::{clip_click_metadata, Result};
use lariat_core::{ActiveLink, Codec, Link, LinkStore, NewLink, StoreError};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::warn;

/// SQLite implementation of the link store.
///
/// Short codes and original URLs are run through the opaque codec on
/// the way in and decoded exactly once on the way out, so nothing else
/// in the system ever touches an encoded value. The codec is
/// deterministic, which lets the UNIQUE constraints on the encoded
/// columns stand in for plaintext uniqueness.
///
/// Reads only surface active rows (not banned, not expired). Banned
/// and expired rows stay in place for audit and keep their codes
/// reserved forever.
#[derive(Debug, Clone)]
pub struct SqliteLinkStore {
    pool: SqlitePool,
    codec: Arc<dyn Codec>,
}

impl SqliteLinkStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: SqlitePool, codec: Arc<dyn Codec>) -> Self {
        Self { pool, codec }
    }

    /// Creates a store by opening a new connection pool.
    pub async fn connect(database_url: &str, codec: Arc<dyn Codec>) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool, codec))
    }

    /// Applies pending schema migrations. The migration history table
    /// doubles as the schema-version record consumed by operational
    /// tooling.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn decode_link(&self, row: &SqliteRow) -> Result<Option<Link>> {
        let encoded_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
        let encoded_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;

        // A row whose encoded values cannot be reversed is skipped,
        // not fatal: the caller sees "not found" and the row stays put
        // for offline inspection.
        let (short_code, original_url) =
            match (self.codec.decode(&encoded_code), self.codec.decode(&encoded_url)) {
                (Ok(code), Ok(url)) => (code, url),
                (Err(e), _) | (_, Err(e)) => {
                    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
                    warn!(link_id = id, error = %e, "skipping link row with undecodable values");
                    return Ok(None);
                }
            };

        let click_count: i64 = row.try_get("click_count").map_err(map_sqlx_error)?;
        let code_length: i64 = row.try_get("code_length").map_err(map_sqlx_error)?;
        let banned: bool = row.try_get("banned").map_err(map_sqlx_error)?;

        Ok(Some(Link {
            id: row.try_get("id").map_err(map_sqlx_error)?,
            short_code,
            original_url,
            click_count: click_count.max(0) as u64,
            code_length: code_length.max(0) as u32,
            banned,
            banned_at: parse_timestamp(row.try_get("banned_at").map_err(map_sqlx_error)?)?,
            created_at: parse_timestamp(row.try_get("created_at").map_err(map_sqlx_error)?)?
                .ok_or_else(|| StoreError::InvalidData("created_at is missing".to_string()))?,
            expires_at: parse_timestamp(row.try_get("expires_at").map_err(map_sqlx_error)?)?,
        }))
    }
}

fn now_unix_seconds() -> i64 {
    Timestamp::now().as_second()
}

fn parse_timestamp(seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds
        .map(|value| {
            Timestamp::from_second(value).map_err(|e| {
                StoreError::InvalidData(format!("invalid timestamp '{}': {e}", value))
            })
        })
        .transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn insert(&self, link: NewLink) -> Result<i64> {
        let encoded_code = self.codec.encode(&link.short_code);
        let encoded_url = self.codec.encode(&link.original_url);
        let expires_at = link.expires_at.map(|ts| ts.as_second());

        // A short-code conflict inserts zero rows instead of raising,
        // so any unique violation that does surface can only be the
        // original_url constraint. This keeps the two failure modes
        // apart without inspecting error text.
        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, original_url, code_length, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&encoded_code)
        .bind(&encoded_url)
        .bind(link.code_length as i64)
        .bind(now_unix_seconds())
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => row.try_get("id").map_err(map_sqlx_error),
            Ok(None) => Err(StoreError::CodeCollision),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateOriginalUrl),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        let encoded_code = self.codec.encode(code);

        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(&encoded_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn find_active(&self, code: &str) -> Result<Option<Link>> {
        let encoded_code = self.codec.encode(code);
        let now = now_unix_seconds();

        let row = sqlx::query(
            r#"
            SELECT id, short_code, original_url, click_count, code_length,
                   banned, banned_at, created_at, expires_at
            FROM links
            WHERE short_code = ?
              AND banned = 0
              AND (expires_at IS NULL OR expires_at > ?)
            LIMIT 1
            "#,
        )
        .bind(&encoded_code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => self.decode_link(&row),
            None => Ok(None),
        }
    }

    async fn count_with_length(&self, length: u32) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM links
            WHERE code_length = ?
            "#,
        )
        .bind(length as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(count.max(0) as u64)
    }

    async fn record_click(&self, link_id: i64, metadata: &str) -> Result<()> {
        let metadata = clip_click_metadata(metadata);
        let now = now_unix_seconds();

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT INTO clicks (link_id, metadata, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(link_id)
        .bind(&metadata)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            UPDATE links
            SET click_count = click_count + 1
            WHERE id = ?
            "#,
        )
        .bind(link_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn list_active(&self) -> Result<Vec<ActiveLink>> {
        let now = now_unix_seconds();

        let rows = sqlx::query(
            r#"
            SELECT id, short_code, original_url
            FROM links
            WHERE banned = 0
              AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY id
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut links = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
            let encoded_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
            let encoded_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;

            match (self.codec.decode(&encoded_code), self.codec.decode(&encoded_url)) {
                (Ok(short_code), Ok(original_url)) => links.push(ActiveLink {
                    id,
                    short_code,
                    original_url,
                }),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(link_id = id, error = %e, "skipping undecodable link row during warmup scan");
                }
            }
        }

        Ok(links)
    }

    async fn ban(&self, code: &str) -> Result<bool> {
        let encoded_code = self.codec.encode(code);
        let now = now_unix_seconds();

        let result = sqlx::query(
            r#"
            UPDATE links
            SET banned = 1, banned_at = ?
            WHERE short_code = ?
              AND banned = 0
            "#,
        )
        .bind(now)
        .bind(&encoded_code)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
