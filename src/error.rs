// ============================================================================
// Repository Error Taxonomy
// ============================================================================
//
// One enum covers every condition the repository can report:
// - validation rejections (never touch a backend)
// - NotFound, a first-class outcome distinct from true errors
// - store failures, split by retry eligibility
// - cache failures, which only ever trigger fallback, never fail a request
// - deadline/cancellation conditions from the caller side
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("item cannot be empty")]
    EmptyItem,

    #[error("invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("order {0} does not exist")]
    NotFound(String),

    #[error("store unavailable")]
    StoreUnavailable(#[source] sqlx::Error),

    #[error("query failed")]
    QueryFailed(#[source] sqlx::Error),

    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("request cancelled")]
    Cancelled,
}

impl RepositoryError {
    /// Caller input violated an invariant; transports map this to
    /// an invalid-argument status.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyItem | Self::InvalidQuantity(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(RepositoryError::EmptyItem.is_validation());
        assert!(RepositoryError::InvalidQuantity(-2).is_validation());
        assert!(!RepositoryError::NotFound("x".to_string()).is_validation());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(RepositoryError::NotFound("x".to_string()).is_not_found());
        assert!(!RepositoryError::Cancelled.is_not_found());
    }
}
