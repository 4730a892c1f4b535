use async_trait::async_trait;
use jiff::Timestamp;
use mayfly_core::error::StorageError;
use mayfly_core::store::{LinkStore, Result};
use mayfly_core::{LinkRecord, ShortCode};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Postgres implementation of the store contract.
///
/// Timestamps are stored as Unix epoch seconds. Short code uniqueness is
/// enforced by a unique index on `short_code`; a violated insert maps to
/// [`StorageError::Conflict`] so the allocator can retry with a fresh code.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE links (
///     short_code   VARCHAR(10) PRIMARY KEY,
///     target       TEXT        NOT NULL,
///     owner_id     UUID        NULL,
///     created_at   BIGINT      NOT NULL,
///     expires_at   BIGINT      NULL,
///     hit_count    BIGINT      NOT NULL DEFAULT 0,
///     last_used_at BIGINT      NULL
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PgLinkStore {
    pool: PgPool,
}

impl PgLinkStore {
    /// Creates a store from an existing Postgres connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new Postgres connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }
}

fn parse_timestamp(seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds)
        .map_err(|e| StorageError::InvalidData(format!("invalid timestamp '{}': {e}", seconds)))
}

fn parse_optional_timestamp(seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds.map(parse_timestamp).transpose()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn row_to_link(row: &PgRow) -> Result<LinkRecord> {
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let target: String = row.try_get("target").map_err(map_sqlx_error)?;
    let owner: Option<Uuid> = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let hit_count: i64 = row.try_get("hit_count").map_err(map_sqlx_error)?;
    let last_used_at: Option<i64> = row.try_get("last_used_at").map_err(map_sqlx_error)?;

    Ok(LinkRecord {
        code: ShortCode::new(code).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        target,
        owner,
        created_at: parse_timestamp(created_at)?,
        expires_at: parse_optional_timestamp(expires_at)?,
        hit_count: hit_count.max(0) as u64,
        last_used_at: parse_optional_timestamp(last_used_at)?,
    })
}

#[async_trait]
impl LinkStore for PgLinkStore {
    async fn insert(&self, link: &LinkRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, target, owner_id, created_at, expires_at, hit_count, last_used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(link.code.as_str())
        .bind(&link.target)
        .bind(link.owner)
        .bind(link.created_at.as_second())
        .bind(link.expires_at.map(|ts| ts.as_second()))
        .bind(link.hit_count as i64)
        .bind(link.last_used_at.map(|ts| ts.as_second()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(link.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, target, owner_id, created_at, expires_at, hit_count, last_used_at
            FROM links
            WHERE short_code = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn find_by_target_and_owner(
        &self,
        target: &str,
        owner: Option<Uuid>,
    ) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT short_code, target, owner_id, created_at, expires_at, hit_count, last_used_at
            FROM links
            WHERE target = $1
              AND owner_id IS NOT DISTINCT FROM $2
            LIMIT 1
            "#,
        )
        .bind(target)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_link).transpose()
    }

    async fn update_expiry(&self, code: &ShortCode, expires_at: Timestamp) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE links
            SET expires_at = $2
            WHERE short_code = $1
            "#,
        )
        .bind(code.as_str())
        .bind(expires_at.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_code(&self, code: &ShortCode) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM links
            WHERE short_code = $1
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM links
            WHERE short_code = $1
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn find_expired(&self, as_of: Timestamp) -> Result<Vec<LinkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, target, owner_id, created_at, expires_at, hit_count, last_used_at
            FROM links
            WHERE expires_at IS NOT NULL
              AND expires_at <= $1
            "#,
        )
        .bind(as_of.as_second())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_link).collect()
    }
}
