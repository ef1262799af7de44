use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::PostgresConfig;
use crate::error::RepositoryError;
use crate::models::Order;
use crate::repository::OrderStore;

// ============================================================================
// Postgres Order Store
// ============================================================================
//
// Thin wrapper over a pooled connection. No caching, no validation beyond
// what the schema enforces. Zero-row results are mapped to None/false;
// connection-shaped failures become StoreUnavailable, everything else
// QueryFailed, so callers can decide retry eligibility.
//
// ============================================================================

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Build a pool from the config DSN and ping it before returning.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.dsn())
            .await
            .map_err(map_store_error)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(map_store_error)?;

        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_store_error(error: sqlx::Error) -> RepositoryError {
    use sqlx::Error;

    match &error {
        Error::Io(_)
        | Error::Tls(_)
        | Error::PoolTimedOut
        | Error::PoolClosed
        | Error::WorkerCrashed => RepositoryError::StoreUnavailable(error),
        _ => RepositoryError::QueryFailed(error),
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, item: &str, quantity: i32) -> Result<String, RepositoryError> {
        let id: String =
            sqlx::query_scalar("INSERT INTO orders (item, quantity) VALUES ($1, $2) RETURNING id")
                .bind(item)
                .bind(quantity)
                .fetch_one(&self.pool)
                .await
                .map_err(map_store_error)?;

        Ok(id)
    }

    async fn select(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, Order>("SELECT id, item, quantity FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_store_error)
    }

    async fn update(
        &self,
        id: &str,
        item: &str,
        quantity: i32,
    ) -> Result<Option<Order>, RepositoryError> {
        sqlx::query_as::<_, Order>(
            "UPDATE orders SET item = $2, quantity = $3 WHERE id = $1 \
             RETURNING id, item, quantity",
        )
        .bind(id)
        .bind(item)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_store_error)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        sqlx::query_as::<_, Order>("SELECT id, item, quantity FROM orders")
            .fetch_all(&self.pool)
            .await
            .map_err(map_store_error)
    }

    async fn select_for_cache(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        sqlx::query_as::<_, Order>("SELECT id, item, quantity FROM orders LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_store_error)
    }
}
