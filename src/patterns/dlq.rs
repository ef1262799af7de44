use std::future::Future;
use std::sync::RwLock;

// ============================================================================
// Dead Letter Queue
// ============================================================================
//
// An append-only backlog of failed message identifiers paired with a
// lifetime failure counter. The backlog is current state and can be cleared;
// the counter only ever grows, surviving `clear`. Safe for concurrent
// callers; the lock is never held across an await point.
//
// ============================================================================

#[derive(Default)]
pub struct DeadLetterQueue {
    inner: RwLock<DlqState>,
}

#[derive(Default)]
struct DlqState {
    backlog: Vec<String>,
    failed_total: u64,
}

impl DeadLetterQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one or more message ids, bumping the lifetime failure counter
    /// by the number appended.
    pub fn add<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.inner.write().expect("dlq lock poisoned");
        let before = state.backlog.len();
        state.backlog.extend(ids.into_iter().map(Into::into));
        let appended = state.backlog.len() - before;
        state.failed_total += appended as u64;
    }

    /// Snapshot of the current backlog.
    pub fn messages(&self) -> Vec<String> {
        self.inner.read().expect("dlq lock poisoned").backlog.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("dlq lock poisoned").backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lifetime count of failures routed here; not reset by `clear`.
    pub fn failed_total(&self) -> u64 {
        self.inner.read().expect("dlq lock poisoned").failed_total
    }

    /// Empty the backlog. The failure counter is a lifetime statistic and
    /// keeps its value.
    pub fn clear(&self) {
        self.inner.write().expect("dlq lock poisoned").backlog.clear();
    }
}

/// Apply an operation to every message in order, routing the ids of failing
/// messages to the DLQ. Later messages are processed regardless of earlier
/// failures.
pub async fn process_with_dlq<F, Fut, E>(messages: &[String], mut operation: F, dlq: &DeadLetterQueue)
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    for message in messages {
        if let Err(error) = operation(message).await {
            tracing::warn!(
                id = %message,
                error = %error,
                "message processing failed, routing to dead letter queue"
            );
            dlq.add([message.clone()]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_only_failing_messages_reach_the_backlog() {
        let dlq = DeadLetterQueue::new();
        let messages: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();

        process_with_dlq(
            &messages,
            |msg| {
                let fails = msg == "b";
                async move {
                    if fails {
                        Err("boom")
                    } else {
                        Ok(())
                    }
                }
            },
            &dlq,
        )
        .await;

        assert_eq!(dlq.messages(), vec!["b".to_string()]);
        assert_eq!(dlq.failed_total(), 1);
    }

    #[test]
    fn test_clear_keeps_the_failure_counter() {
        let dlq = DeadLetterQueue::new();
        dlq.add(["m1"]);

        dlq.clear();

        assert!(dlq.is_empty());
        assert_eq!(dlq.failed_total(), 1);
    }

    #[test]
    fn test_add_counts_every_id_in_a_batch() {
        let dlq = DeadLetterQueue::new();
        dlq.add(["m1", "m2", "m3"]);

        assert_eq!(dlq.len(), 3);
        assert_eq!(dlq.failed_total(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_lose_nothing() {
        let dlq = Arc::new(DeadLetterQueue::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let dlq = dlq.clone();
                tokio::spawn(async move {
                    dlq.add([format!("msg-{i}")]);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(dlq.len(), 50);
        assert_eq!(dlq.failed_total(), 50);
    }
}
