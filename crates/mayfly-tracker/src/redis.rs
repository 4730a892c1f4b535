use async_trait::async_trait;
use jiff::Timestamp;
use mayfly_core::error::TrackerError;
use mayfly_core::tracker::{ExpirationTracker, Result};
use mayfly_core::ShortCode;
use redis::AsyncCommands;
use tracing::{debug, trace, warn};

/// A Redis-backed deadline index.
///
/// Each entry is stored under `<prefix><code>` with the deadline as epoch
/// seconds in the value. Keys deliberately carry **no TTL**: letting Redis
/// evict a key at its deadline would destroy the very record that tells the
/// reconciler which code expired. Removal happens explicitly, after the
/// persistent delete has succeeded.
#[derive(Debug, Clone)]
pub struct RedisDeadlineIndex {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> TrackerError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        TrackerError::Timeout(message)
    } else {
        TrackerError::Operation(message)
    }
}

impl RedisDeadlineIndex {
    /// Creates a new index over a multiplexed Redis connection.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: "mf:exp:".to_string(),
        }
    }

    /// Creates a new index with a custom key prefix.
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    fn entry_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }

    fn code_from_key<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(&self.key_prefix)
    }
}

#[async_trait]
impl ExpirationTracker for RedisDeadlineIndex {
    async fn register(&self, code: &ShortCode, deadline: Timestamp) -> Result<()> {
        if deadline <= Timestamp::now() {
            return Err(TrackerError::InvalidDeadline(deadline.to_string()));
        }

        let key = self.entry_key(code);
        trace!(code = %code, deadline = %deadline, "registering deadline in Redis");

        let mut conn = self.conn.clone();
        match conn.set::<_, _, ()>(&key, deadline.as_second()).await {
            Ok(()) => {
                debug!(code = %code, deadline = %deadline, "deadline registered");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "failed to register deadline");
                Err(map_redis_error("failed to write deadline to Redis", e))
            }
        }
    }

    async fn is_expired(&self, code: &ShortCode) -> Result<bool> {
        let key = self.entry_key(code);

        let mut conn = self.conn.clone();
        let deadline: Option<i64> = conn
            .get(&key)
            .await
            .map_err(|e| map_redis_error("failed to fetch deadline from Redis", e))?;

        Ok(deadline.is_some_and(|seconds| seconds <= Timestamp::now().as_second()))
    }

    async fn list_due(&self) -> Result<Vec<ShortCode>> {
        let pattern = format!("{}*", self.key_prefix);
        let now = Timestamp::now().as_second();

        // TODO: switch to SCAN once the index is expected to hold more
        // than a few thousand pending deadlines.
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn
            .keys(&pattern)
            .await
            .map_err(|e| map_redis_error("failed to list deadline keys", e))?;

        let mut due = Vec::new();
        for key in keys {
            let deadline: Option<i64> = conn
                .get(&key)
                .await
                .map_err(|e| map_redis_error("failed to fetch deadline from Redis", e))?;

            // A key deleted between KEYS and GET was reconciled concurrently.
            let Some(deadline) = deadline else {
                continue;
            };

            if deadline <= now {
                match self.code_from_key(&key) {
                    Some(code) => due.push(ShortCode::new_unchecked(code)),
                    None => warn!(key = %key, "deadline key does not carry expected prefix"),
                }
            }
        }

        trace!(due = due.len(), "listed due deadlines from Redis");
        Ok(due)
    }

    async fn remove(&self, code: &ShortCode) -> Result<()> {
        let key = self.entry_key(code);
        trace!(code = %code, "removing deadline from Redis");

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| map_redis_error("failed to delete deadline from Redis", e))
    }
}
