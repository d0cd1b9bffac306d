//! Producer-side placement of task records.
//!
//! Enqueueing proper belongs to the producer library; this is the minimal
//! subset needed to seed queues from tests and local tooling.

use crate::error::{BrokerError, BrokerResult};
use crate::message::TaskMessage;
use crate::queue::{QueueKeys, QueueName, StorageShape};
use crate::store::QueueStore;
use std::sync::Arc;
use tracing::debug;

/// Writes encoded task records into queues.
#[derive(Clone)]
pub struct QueueWriter {
    store: Arc<dyn QueueStore>,
    keys: QueueKeys,
}

impl QueueWriter {
    /// Create a writer over `store` using `keys`.
    pub fn new(store: Arc<dyn QueueStore>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    /// Pushes a task onto the head of the ready queue.
    pub async fn push_ready(&self, msg: &TaskMessage) -> BrokerResult<()> {
        self.push_list(QueueName::Ready, msg).await
    }

    /// Pushes a task onto the head of the active queue.
    pub async fn push_active(&self, msg: &TaskMessage) -> BrokerResult<()> {
        self.push_list(QueueName::Active, msg).await
    }

    /// Adds a task to a sorted-set queue with the given score.
    pub async fn add_scored(&self, queue: QueueName, msg: &TaskMessage, score: f64) -> BrokerResult<()> {
        if queue.shape() != StorageShape::SortedSet {
            return Err(BrokerError::InvalidQueue(queue));
        }
        let raw = msg.encode()?;
        self.store
            .sorted_add(self.keys.key(queue), raw.as_bytes(), score)
            .await?;
        debug!(queue = %queue, task_id = %msg.id, score, "Added task");
        Ok(())
    }

    async fn push_list(&self, queue: QueueName, msg: &TaskMessage) -> BrokerResult<()> {
        let raw = msg.encode()?;
        self.store
            .list_push_head(self.keys.key(queue), raw.as_bytes())
            .await?;
        debug!(queue = %queue, task_id = %msg.id, "Pushed task");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn test_push_and_add() {
        let store = Arc::new(InMemoryStore::new());
        let writer = QueueWriter::new(store.clone(), QueueKeys::default());
        let msg = TaskMessage::new("noop");

        writer.push_ready(&msg).await.unwrap();
        writer.push_active(&msg).await.unwrap();
        writer.add_scored(QueueName::Retry, &msg, 10.0).await.unwrap();

        assert_eq!(store.list_len("taskyard:queues:default").await.unwrap(), 1);
        assert_eq!(store.list_len("taskyard:in_progress").await.unwrap(), 1);
        assert_eq!(store.sorted_card("taskyard:retry").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_scored_rejects_list_queue() {
        let store = Arc::new(InMemoryStore::new());
        let writer = QueueWriter::new(store, QueueKeys::default());

        let err = writer
            .add_scored(QueueName::Active, &TaskMessage::new("noop"), 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidQueue(QueueName::Active)));
    }
}
