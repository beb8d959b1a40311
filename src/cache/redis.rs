use ::redis::{AsyncCommands, Client, RedisResult, aio::ConnectionManager};
use async_trait::async_trait;
use log::info;
use std::future::Future;
use std::time::Duration;

use super::{CacheError, MAX_CACHE_TTL, StatsCache};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct RedisCache {
    connection: ConnectionManager,
    op_timeout: Duration,
}

impl RedisCache {
    pub async fn connect(redis_url: &str, op_timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let connection = bounded(CONNECT_TIMEOUT, client.get_connection_manager()).await?;
        info!("Connected to Redis at {}", redis_url);

        Ok(Self {
            connection,
            op_timeout,
        })
    }
}

// Every round-trip is capped so a stalled Redis degrades to a miss
async fn bounded<T>(
    limit: Duration,
    fut: impl Future<Output = RedisResult<T>>,
) -> Result<T, CacheError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(CacheError::Timeout(limit)),
    }
}

#[async_trait]
impl StatsCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.clone();
        bounded(self.op_timeout, connection.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        // PSETEX rejects a zero expiry
        let millis = u64::try_from(ttl.min(MAX_CACHE_TTL).as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        bounded(
            self.op_timeout,
            connection.pset_ex::<_, _, ()>(key, value, millis),
        )
        .await
    }
}
