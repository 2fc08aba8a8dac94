//! Redis key-value backend for session storage.

use crate::error::{AuthError, Result};
use crate::session::kv::KeyValueStore;
use async_trait::async_trait;
use std::time::Duration;

/// Redis-backed [`KeyValueStore`].
///
/// Holds a client and opens a multiplexed connection per call; the
/// multiplexed connection is cheap to clone and pipelines internally.
#[derive(Clone)]
pub struct RedisKv {
    client: redis::Client,
}

impl RedisKv {
    /// Create a store from a connection URL (`redis://host[:port]/[db]`).
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AuthError::storage(format!("invalid redis url: {}", e)))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_err)
    }
}

/// Connection-class failures are retryable; everything else is a plain
/// storage error.
fn map_redis_err(e: redis::RedisError) -> AuthError {
    if e.is_io_error() || e.is_timeout() || e.is_connection_refusal() || e.is_connection_dropped() {
        AuthError::unavailable(format!("redis unreachable: {}", e))
    } else {
        AuthError::storage(format!("redis command failed: {}", e))
    }
}

#[async_trait]
impl KeyValueStore for RedisKv {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => {
                // SETEX with a zero TTL is an error in Redis; clamp to 1s.
                let secs = ttl.as_secs().max(1);
                redis::cmd("SETEX")
                    .arg(key)
                    .arg(secs)
                    .arg(value)
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(map_redis_err)
            }
            None => redis::cmd("SET")
                .arg(key)
                .arg(value)
                .query_async::<()>(&mut conn)
                .await
                .map_err(map_redis_err),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        cmd.query_async::<usize>(&mut conn)
            .await
            .map_err(map_redis_err)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.connection().await?;
        let secs: i64 = redis::cmd("TTL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(map_redis_err)?;
        // -2: key absent, -1: no expiry armed.
        if secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(secs as u64)))
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection().await?;
        let set: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .query_async::<i64>(&mut conn)
            .await
            .map_err(map_redis_err)?;
        Ok(set == 1)
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", prefix);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async::<(u64, Vec<String>)>(&mut conn)
                .await
                .map_err(map_redis_err)?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }

    fn is_healthy(&self) -> bool {
        self.client.get_connection().is_ok()
    }
}
