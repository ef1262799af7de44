use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::Order;
use crate::repository::OrderStore;

// ============================================================================
// In-Memory Order Store
// ============================================================================
//
// The store-less variant: an owned map behind a single read-write lock.
// Ids are minted with UUIDs. Copies cross the lock boundary, never interior
// references, and the lock is never held across an await point. Doubles as
// the substitutable store for repository tests.
//
// ============================================================================

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<String, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, item: &str, quantity: i32) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        let order = Order {
            id: id.clone(),
            item: item.to_string(),
            quantity,
        };

        let mut orders = self.orders.write().expect("orders lock poisoned");
        orders.insert(id.clone(), order);

        Ok(id)
    }

    async fn select(&self, id: &str) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().expect("orders lock poisoned");
        Ok(orders.get(id).cloned())
    }

    async fn update(
        &self,
        id: &str,
        item: &str,
        quantity: i32,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut orders = self.orders.write().expect("orders lock poisoned");

        match orders.get_mut(id) {
            Some(order) => {
                order.item = item.to_string();
                order.quantity = quantity;
                Ok(Some(order.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().expect("orders lock poisoned");
        Ok(orders.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().expect("orders lock poisoned");
        Ok(orders.values().cloned().collect())
    }

    async fn select_for_cache(&self, limit: i64) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().expect("orders lock poisoned");
        Ok(orders.values().take(limit as usize).cloned().collect())
    }
}
