pub mod dlq;
pub mod retry;
pub mod timeout;

pub use dlq::{process_with_dlq, DeadLetterQueue};
pub use retry::{retry_with_backoff, RetryConfig};
pub use timeout::{with_timeout, TimeoutResult};
