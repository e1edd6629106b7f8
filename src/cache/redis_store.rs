//! Redis-backed shared store (`redis` feature).

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::{debug, info};

use super::backend::SharedStore;
use crate::{Error, Result};

/// `GET` / `SETEX` / `DEL` over one multiplexed connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %sanitize_url(url), "Connecting to Redis shared cache");
        let client = Client::open(url).map_err(redis_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(redis_err)?;
        debug!("Redis shared cache connected");
        Ok(Self { conn })
    }

    /// Round-trip `PING`. Run once after connecting so a server that accepts
    /// the socket but does not answer is rejected at startup.
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(())
    }
}

#[async_trait]
impl SharedStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key).await.map_err(redis_err)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SETEX rejects 0; round sub-second TTLs up.
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs)
            .await
            .map_err(redis_err)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: usize = conn.del(key).await.map_err(redis_err)?;
        Ok(removed > 0)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::shared_store("redis", e.to_string())
}

/// Hide credentials before logging a connection URL.
pub(crate) fn sanitize_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
