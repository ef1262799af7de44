use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::RepositoryError;
use crate::models::Order;

pub mod cache;
pub mod database;
pub mod memory;

pub use cache::RedisOrderCache;
pub use database::PgOrderStore;
pub use memory::MemoryOrderStore;

// ============================================================================
// Cache-Aside Order Repository
// ============================================================================
//
// The only object the rest of the system talks to. Composes a durable store
// (system of record) and a volatile cache (disposable accelerator) behind
// narrow contracts. Policy per operation:
//
// - mutations always hit the store first; the cache is touched only after
//   the store confirms, so a reader can never observe cached state newer
//   than the store
// - reads try the cache, falling through to the store on miss OR on cache
//   failure; a store hit is repaired back into the cache
// - list is store-only; aggregate reads are never stamped into per-key
//   cache entries
//
// ============================================================================

/// Durable store contract. Zero-row outcomes are `None`/`false`, never an
/// error; everything else surfaces as `StoreUnavailable` or `QueryFailed`.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, item: &str, quantity: i32) -> Result<String, RepositoryError>;
    async fn select(&self, id: &str) -> Result<Option<Order>, RepositoryError>;
    async fn update(
        &self,
        id: &str,
        item: &str,
        quantity: i32,
    ) -> Result<Option<Order>, RepositoryError>;
    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;
    /// Bulk read used only for cache warm-up.
    async fn select_for_cache(&self, limit: i64) -> Result<Vec<Order>, RepositoryError>;
}

/// Volatile cache contract. `get` distinguishes a miss (`Ok(None)`) from a
/// backend failure (`Err`); callers treat both as "cache could not help" but
/// log them differently.
#[async_trait]
pub trait OrderCache: Send + Sync {
    /// Write-behind: enqueues the write and returns immediately.
    fn set(&self, order: Order);
    async fn get(&self, id: &str) -> Result<Option<Order>, RepositoryError>;
    /// Write-behind invalidation.
    fn delete(&self, id: &str);
    /// Block until every write-behind operation issued so far has completed.
    /// Shutdown only, never in the request path.
    async fn drain(&self);
}

pub struct OrderRepository<S, C> {
    store: S,
    cache: C,
}

impl<S: OrderStore, C: OrderCache> OrderRepository<S, C> {
    pub fn new(store: S, cache: C) -> Self {
        Self { store, cache }
    }

    fn check_cancelled(ctx: &CancellationToken) -> Result<(), RepositoryError> {
        if ctx.is_cancelled() {
            Err(RepositoryError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn validate(item: &str, quantity: i32) -> Result<(), RepositoryError> {
        if item.is_empty() {
            return Err(RepositoryError::EmptyItem);
        }
        if quantity <= 0 {
            return Err(RepositoryError::InvalidQuantity(quantity));
        }
        Ok(())
    }

    /// Create an order. The store assigns the id; the cache is populated on a
    /// detached write-behind path whose outcome is never reported here.
    pub async fn create_order(
        &self,
        ctx: &CancellationToken,
        item: &str,
        quantity: i32,
    ) -> Result<String, RepositoryError> {
        Self::check_cancelled(ctx)?;
        Self::validate(item, quantity)?;

        let id = self.store.insert(item, quantity).await?;

        self.cache.set(Order {
            id: id.clone(),
            item: item.to_string(),
            quantity,
        });

        tracing::debug!(id = %id, "order created");
        Ok(id)
    }

    /// Cache-first read. A store hit on the fallback path is written back
    /// into the cache so subsequent reads are accelerated.
    pub async fn get_order(
        &self,
        ctx: &CancellationToken,
        id: &str,
    ) -> Result<Order, RepositoryError> {
        Self::check_cancelled(ctx)?;

        match self.cache.get(id).await {
            Ok(Some(order)) => {
                tracing::debug!(id = %id, "cache hit");
                return Ok(order);
            }
            Ok(None) => {
                tracing::debug!(id = %id, "cache miss");
            }
            Err(error) => {
                tracing::warn!(id = %id, error = %error, "cache lookup failed, falling back to store");
            }
        }

        match self.store.select(id).await? {
            Some(order) => {
                tracing::debug!(id = %id, "order found in store");
                self.cache.set(order.clone());
                Ok(order)
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    /// Full replace of item/quantity; the id is immutable. The cache entry is
    /// overwritten only after the store confirms the update.
    pub async fn update_order(
        &self,
        ctx: &CancellationToken,
        id: &str,
        item: &str,
        quantity: i32,
    ) -> Result<Order, RepositoryError> {
        Self::check_cancelled(ctx)?;
        Self::validate(item, quantity)?;

        match self.store.update(id, item, quantity).await? {
            Some(order) => {
                self.cache.set(order.clone());
                tracing::debug!(id = %id, "order updated");
                Ok(order)
            }
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    /// Returns whether the order existed. A missing id is a no-op, not an
    /// error, and leaves the cache untouched.
    pub async fn delete_order(
        &self,
        ctx: &CancellationToken,
        id: &str,
    ) -> Result<bool, RepositoryError> {
        Self::check_cancelled(ctx)?;

        let existed = self.store.delete(id).await?;

        if existed {
            self.cache.delete(id);
            tracing::debug!(id = %id, "order deleted");
        } else {
            tracing::debug!(id = %id, "delete was a no-op, order does not exist");
        }

        Ok(existed)
    }

    /// Store-only: list semantics need a consistent full-table view the
    /// cache cannot provide.
    pub async fn list_orders(&self, ctx: &CancellationToken) -> Result<Vec<Order>, RepositoryError> {
        Self::check_cancelled(ctx)?;
        self.store.list().await
    }

    /// Pull up to `limit` orders from the store into the cache. Failures are
    /// logged and swallowed; warm-up never blocks startup.
    pub async fn warm_up_cache(&self, limit: i64) {
        let orders = match self.store.select_for_cache(limit).await {
            Ok(orders) => orders,
            Err(error) => {
                tracing::error!(error = %error, "failed to warm up cache");
                return;
            }
        };

        let orders_cached = orders.len();
        for order in orders {
            self.cache.set(order);
        }

        tracing::info!(orders_cached = orders_cached, limit = limit, "cache warm up completed");
    }

    /// Wait for outstanding write-behind cache operations. Callers bound this
    /// with a shutdown deadline.
    pub async fn drain_cache_writes(&self) {
        self.cache.drain().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::RwLock;

    /// Cache double: applies writes synchronously, counts calls, and can be
    /// switched into an unavailable mode.
    #[derive(Default)]
    struct MockCache {
        entries: RwLock<HashMap<String, Order>>,
        unavailable: AtomicBool,
        sets: AtomicU32,
        deletes: AtomicU32,
    }

    impl MockCache {
        fn evict_all(&self) {
            self.entries.write().unwrap().clear();
        }

        fn contains(&self, id: &str) -> bool {
            self.entries.read().unwrap().contains_key(id)
        }
    }

    #[async_trait]
    impl OrderCache for MockCache {
        fn set(&self, order: Order) {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.entries.write().unwrap().insert(order.id.clone(), order);
        }

        async fn get(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(RepositoryError::CacheUnavailable("mock cache down".to_string()));
            }
            Ok(self.entries.read().unwrap().get(id).cloned())
        }

        fn delete(&self, id: &str) {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.entries.write().unwrap().remove(id);
        }

        async fn drain(&self) {}
    }

    fn repository() -> OrderRepository<MemoryOrderStore, MockCache> {
        OrderRepository::new(MemoryOrderStore::new(), MockCache::default())
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let id = repo.create_order(&ctx, "ssd", 4).await.unwrap();
        assert!(!id.is_empty());

        let order = repo.get_order(&ctx, &id).await.unwrap();
        assert_eq!(order.item, "ssd");
        assert_eq!(order.quantity, 4);
    }

    #[tokio::test]
    async fn test_get_falls_through_to_store_on_cache_miss() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let id = repo.create_order(&ctx, "ssd", 4).await.unwrap();
        repo.cache.evict_all();

        let order = repo.get_order(&ctx, &id).await.unwrap();
        assert_eq!(order.item, "ssd");
        assert_eq!(order.quantity, 4);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_the_store() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let empty = repo.create_order(&ctx, "", 5).await;
        assert!(matches!(empty, Err(RepositoryError::EmptyItem)));

        let zero = repo.create_order(&ctx, "ssd", 0).await;
        assert!(matches!(zero, Err(RepositoryError::InvalidQuantity(0))));

        let negative = repo.create_order(&ctx, "ssd", -3).await;
        assert!(matches!(negative, Err(RepositoryError::InvalidQuantity(-3))));

        // No store write happened for any rejection.
        assert!(repo.list_orders(&ctx).await.unwrap().is_empty());
        assert_eq!(repo.cache.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_update_is_visible_on_both_read_paths() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let id = repo.create_order(&ctx, "hdd", 1).await.unwrap();
        repo.update_order(&ctx, &id, "nvme", 7).await.unwrap();

        // Cache hit path.
        let cached = repo.get_order(&ctx, &id).await.unwrap();
        assert_eq!((cached.item.as_str(), cached.quantity), ("nvme", 7));

        // Store fallback path.
        repo.cache.evict_all();
        let from_store = repo.get_order(&ctx, &id).await.unwrap();
        assert_eq!((from_store.item.as_str(), from_store.quantity), ("nvme", 7));
    }

    #[tokio::test]
    async fn test_update_of_missing_id_never_touches_the_cache() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let result = repo.update_order(&ctx, "ghost", "nvme", 7).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
        assert_eq!(repo.cache.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_delete_reports_existence_and_invalidates() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let id = repo.create_order(&ctx, "ssd", 2).await.unwrap();

        assert!(repo.delete_order(&ctx, &id).await.unwrap());
        assert!(!repo.cache.contains(&id));

        let gone = repo.get_order(&ctx, &id).await;
        assert!(matches!(gone, Err(RepositoryError::NotFound(_))));

        // Missing id: no-op, no error, no cache invalidation.
        assert!(!repo.delete_order(&ctx, "ghost").await.unwrap());
        assert_eq!(repo.cache.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_unavailable_reads_are_served_by_the_store() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let id = repo.create_order(&ctx, "ssd", 2).await.unwrap();
        repo.cache.unavailable.store(true, Ordering::SeqCst);

        let order = repo.get_order(&ctx, &id).await.unwrap();
        assert_eq!(order.item, "ssd");
    }

    #[tokio::test]
    async fn test_store_hit_repairs_the_cache() {
        let repo = repository();
        let ctx = CancellationToken::new();

        let id = repo.create_order(&ctx, "ssd", 2).await.unwrap();
        repo.cache.evict_all();

        repo.get_order(&ctx, &id).await.unwrap();
        assert!(repo.cache.contains(&id));
    }

    #[tokio::test]
    async fn test_list_is_store_only_and_never_populates_the_cache() {
        let repo = repository();
        let ctx = CancellationToken::new();

        repo.create_order(&ctx, "ssd", 2).await.unwrap();
        repo.create_order(&ctx, "hdd", 1).await.unwrap();
        let sets_after_creates = repo.cache.sets.load(Ordering::SeqCst);

        let orders = repo.list_orders(&ctx).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(repo.cache.sets.load(Ordering::SeqCst), sets_after_creates);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits_every_operation() {
        let repo = repository();
        let ctx = CancellationToken::new();
        ctx.cancel();

        assert!(matches!(
            repo.create_order(&ctx, "ssd", 2).await,
            Err(RepositoryError::Cancelled)
        ));
        assert!(matches!(
            repo.get_order(&ctx, "any").await,
            Err(RepositoryError::Cancelled)
        ));
        assert!(matches!(
            repo.update_order(&ctx, "any", "ssd", 2).await,
            Err(RepositoryError::Cancelled)
        ));
        assert!(matches!(
            repo.delete_order(&ctx, "any").await,
            Err(RepositoryError::Cancelled)
        ));
        assert!(matches!(
            repo.list_orders(&ctx).await,
            Err(RepositoryError::Cancelled)
        ));

        // Nothing reached either backend.
        let live_ctx = CancellationToken::new();
        assert!(repo.list_orders(&live_ctx).await.unwrap().is_empty());
        assert_eq!(repo.cache.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_warm_up_respects_the_record_limit() {
        let store = MemoryOrderStore::new();
        for i in 0..5 {
            store.insert("bulk", i + 1).await.unwrap();
        }

        let repo = OrderRepository::new(store, MockCache::default());
        repo.warm_up_cache(3).await;

        assert_eq!(repo.cache.sets.load(Ordering::SeqCst), 3);
    }
}
