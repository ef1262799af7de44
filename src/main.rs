use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ordersvc::config::Config;
use ordersvc::error::RepositoryError;
use ordersvc::patterns::{retry_with_backoff, with_timeout, RetryConfig, TimeoutResult};
use ordersvc::repository::{OrderRepository, PgOrderStore, RedisOrderCache};

const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);
const READ_DEADLINE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Structured logging with environment-based filtering.
    // Default to INFO level, can be overridden with RUST_LOG env var.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ordersvc=debug")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(environment = %config.environment, "starting order service");

    // Backends may come up after us; retry connection establishment with
    // backoff instead of failing the whole process on the first refusal.
    let postgres_cfg = config.postgres.clone();
    let store = retry_with_backoff(RetryConfig::default(), |_attempt| {
        let postgres_cfg = postgres_cfg.clone();
        async move { PgOrderStore::connect(&postgres_cfg).await }
    })
    .await?;
    tracing::info!(host = %config.postgres.host, "connected to postgres");

    let redis_cfg = config.redis.clone();
    let cache = retry_with_backoff(RetryConfig::default(), |_attempt| {
        let redis_cfg = redis_cfg.clone();
        async move { RedisOrderCache::connect(&redis_cfg).await }
    })
    .await?;
    tracing::info!(host = %config.redis.host, "connected to redis");

    let repository = Arc::new(OrderRepository::new(store, cache));

    // Warm-up is fire-and-forget: the service is usable whether or not it
    // has completed, and its failure is logged inside, never propagated.
    let warmup = repository.clone();
    let warmup_limit = config.cache_warmup_limit;
    tokio::spawn(async move {
        warmup.warm_up_cache(warmup_limit).await;
    });

    // Exercise the full order lifecycle.
    let ctx = CancellationToken::new();

    let id = repository.create_order(&ctx, "mechanical keyboard", 2).await?;
    tracing::info!(id = %id, "order created");

    let fetched = with_timeout(READ_DEADLINE, {
        let repository = repository.clone();
        let ctx = ctx.clone();
        let id = id.clone();
        async move { repository.get_order(&ctx, &id).await }
    })
    .await;
    match fetched {
        TimeoutResult::Success(order) => {
            tracing::info!(id = %order.id, item = %order.item, quantity = order.quantity, "order fetched");
        }
        TimeoutResult::Failed(error) => return Err(error.into()),
        TimeoutResult::Elapsed => {
            tracing::warn!(id = %id, "order fetch exceeded its deadline");
            return Err(RepositoryError::DeadlineExceeded.into());
        }
    }

    let updated = repository
        .update_order(&ctx, &id, "mechanical keyboard", 3)
        .await?;
    tracing::info!(id = %updated.id, quantity = updated.quantity, "order updated");

    let orders = repository.list_orders(&ctx).await?;
    tracing::info!(count = orders.len(), "orders listed");

    let existed = repository.delete_order(&ctx, &id).await?;
    tracing::info!(id = %id, existed = existed, "order deleted");

    // Drain outstanding write-behind cache operations, bounded so shutdown
    // latency stays finite even if redis is wedged.
    if tokio::time::timeout(SHUTDOWN_DEADLINE, repository.drain_cache_writes())
        .await
        .is_err()
    {
        tracing::warn!("shutdown deadline expired with cache writes still in flight");
    }

    tracing::info!("order service stopped");
    Ok(())
}
