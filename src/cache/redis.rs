use ::redis::aio::ConnectionManager;
use ::redis::{Client, RedisError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use super::{CacheError, NameCache};

/// Redis-backed name cache.
///
/// The connection manager reconnects on its own, so a Redis restart shows up
/// as a few failed commands (cache misses to readers) rather than a dead
/// process.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("conn", &"<ConnectionManager>")
            .finish()
    }
}

fn command_error(err: RedisError) -> CacheError {
    CacheError::Command(err.to_string())
}

impl RedisCache {
    /// Open a managed connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl NameCache for RedisCache {
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, CacheError> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> = ::redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(hash.into_iter().collect())
    }

    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, CacheError> {
        // HMGET without fields is a protocol error
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        ::redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await
            .map_err(command_error)
    }

    async fn hash_set_all(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
    ) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let _: () = ::redis::cmd("HSET")
            .arg(key)
            .arg(&fields)
            .query_async(&mut conn)
            .await
            .map_err(command_error)?;
        Ok(())
    }
}
