use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::config::RedisConfig;
use crate::error::RepositoryError;
use crate::models::Order;
use crate::repository::OrderCache;

// ============================================================================
// Redis Order Cache
// ============================================================================
//
// Keys are order ids, values serialized orders, every write carries a fixed
// TTL. Set and delete are write-behind: the call enqueues a tracked task and
// returns before the write lands. The tracker lets shutdown drain in-flight
// writes; the semaphore caps how many run concurrently.
//
// ============================================================================

const ORDER_TTL: Duration = Duration::from_secs(30 * 60);
const MAX_INFLIGHT_WRITES: usize = 64;

pub struct RedisOrderCache {
    conn: MultiplexedConnection,
    tracker: TaskTracker,
    write_permits: Arc<Semaphore>,
    ttl: Duration,
}

impl RedisOrderCache {
    /// Open the connection and ping it before returning.
    pub async fn connect(config: &RedisConfig) -> Result<Self, RepositoryError> {
        let client = redis::Client::open(config.url()).map_err(unavailable)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;

        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok(Self {
            conn,
            tracker: TaskTracker::new(),
            write_permits: Arc::new(Semaphore::new(MAX_INFLIGHT_WRITES)),
            ttl: ORDER_TTL,
        })
    }
}

fn unavailable(error: redis::RedisError) -> RepositoryError {
    RepositoryError::CacheUnavailable(error.to_string())
}

#[async_trait]
impl OrderCache for RedisOrderCache {
    fn set(&self, order: Order) {
        let mut conn = self.conn.clone();
        let permits = self.write_permits.clone();
        let ttl_secs = self.ttl.as_secs();

        self.tracker.spawn(async move {
            // The semaphore is never closed; acquire only fails after close.
            let Ok(_permit) = permits.acquire().await else {
                return;
            };

            let payload = match serde_json::to_string(&order) {
                Ok(payload) => payload,
                Err(error) => {
                    tracing::error!(error = %error, id = %order.id, "failed to serialize order for cache");
                    return;
                }
            };

            match conn.set_ex::<_, _, ()>(&order.id, payload, ttl_secs).await {
                Ok(()) => tracing::debug!(id = %order.id, "order written to cache"),
                Err(error) => {
                    tracing::error!(error = %error, id = %order.id, "failed to write order to cache");
                }
            }
        });
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.conn.clone();

        let payload: Option<String> = conn.get(id).await.map_err(unavailable)?;

        match payload {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|error| {
                RepositoryError::CacheUnavailable(format!("undecodable cache payload: {error}"))
            }),
        }
    }

    fn delete(&self, id: &str) {
        let mut conn = self.conn.clone();
        let permits = self.write_permits.clone();
        let id = id.to_string();

        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire().await else {
                return;
            };

            match conn.del::<_, ()>(&id).await {
                Ok(()) => tracing::debug!(id = %id, "order evicted from cache"),
                Err(error) => {
                    tracing::error!(error = %error, id = %id, "failed to evict order from cache");
                }
            }
        });
    }

    async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}
