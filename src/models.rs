use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Model
// ============================================================================
//
// A single entity: Order. The durable store owns canonical order state; the
// cache holds a serialized, TTL-bounded copy keyed by order id.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Order {
    /// Opaque identifier assigned by the durable store.
    pub id: String,
    /// Non-empty free-text label.
    pub item: String,
    /// Always > 0 for an order reachable through the repository.
    pub quantity: i32,
}
