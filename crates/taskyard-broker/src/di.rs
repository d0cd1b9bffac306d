//! Dependency injection interfaces for the broker.
//!
//! Provides a Shaku-compatible interface over the admin operations.

use crate::error::BrokerResult;
use crate::inspect::{DeadTask, EnqueuedTask, InProgressTask, RetryTask, ScheduledTask, SnapshotReader, Stats};
use crate::message::TaskId;
use crate::queue::QueueKeys;
use crate::store::{QueueStore, RedisStore};
use crate::transition::TransitionEngine;
use crate::writer::QueueWriter;
use async_trait::async_trait;
use std::sync::Arc;
use taskyard_config::RedisConfig;
use taskyard_core::Interface;
use tracing::info;

/// Interface for queue administration.
///
/// Combines the snapshot reads and the transitions operators run against a
/// live broker.
#[async_trait]
pub trait QueueAdminInterface: Interface + Send + Sync {
    /// Sizes of all five queues.
    async fn current_stats(&self) -> BrokerResult<Stats>;

    /// Tasks in the ready queue. Fails on any malformed entry.
    async fn list_enqueued(&self) -> BrokerResult<Vec<EnqueuedTask>>;

    /// Tasks claimed by workers.
    async fn list_in_progress(&self) -> BrokerResult<Vec<InProgressTask>>;

    /// Tasks deferred to a later time.
    async fn list_scheduled(&self) -> BrokerResult<Vec<ScheduledTask>>;

    /// Tasks awaiting retry.
    async fn list_retry(&self) -> BrokerResult<Vec<RetryTask>>;

    /// Tasks whose retries are exhausted.
    async fn list_dead(&self) -> BrokerResult<Vec<DeadTask>>;

    /// Move a dead task back to ready.
    async fn rescue(&self, id: &TaskId, score: f64) -> BrokerResult<()>;

    /// Move a retry task to ready immediately.
    async fn retry_now(&self, id: &TaskId, score: f64) -> BrokerResult<()>;

    /// Move a scheduled task to ready immediately.
    async fn process_now(&self, id: &TaskId, score: f64) -> BrokerResult<()>;

    /// Verify the store is reachable.
    async fn health_check(&self) -> BrokerResult<()>;

    /// Release the store connection.
    fn close(&self);
}

/// Queue admin service implementation.
#[derive(Clone)]
pub struct QueueAdminService {
    store: Arc<dyn QueueStore>,
    reader: SnapshotReader,
    engine: TransitionEngine,
}

impl QueueAdminService {
    /// Create a service over an already constructed store.
    pub fn new(store: Arc<dyn QueueStore>, keys: QueueKeys) -> Self {
        Self {
            reader: SnapshotReader::new(store.clone(), keys.clone()),
            engine: TransitionEngine::new(store.clone(), keys),
            store,
        }
    }

    /// Connect to Redis and create a service using the configured key prefix.
    pub async fn connect(config: &RedisConfig) -> BrokerResult<Self> {
        let store = RedisStore::connect(config).await?;
        info!(key_prefix = %config.key_prefix, "Queue admin service connected");
        Ok(Self::new(Arc::new(store), QueueKeys::new(config.key_prefix.clone())))
    }

    /// The snapshot reader.
    pub fn reader(&self) -> &SnapshotReader {
        &self.reader
    }

    /// The transition engine.
    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    /// A writer sharing this service's store and keys.
    pub fn writer(&self) -> QueueWriter {
        QueueWriter::new(self.store.clone(), self.reader.keys().clone())
    }
}

#[async_trait]
impl QueueAdminInterface for QueueAdminService {
    async fn current_stats(&self) -> BrokerResult<Stats> {
        self.reader.current_stats().await
    }

    async fn list_enqueued(&self) -> BrokerResult<Vec<EnqueuedTask>> {
        self.reader.list_enqueued().await
    }

    async fn list_in_progress(&self) -> BrokerResult<Vec<InProgressTask>> {
        self.reader.list_in_progress().await
    }

    async fn list_scheduled(&self) -> BrokerResult<Vec<ScheduledTask>> {
        self.reader.list_scheduled().await
    }

    async fn list_retry(&self) -> BrokerResult<Vec<RetryTask>> {
        self.reader.list_retry().await
    }

    async fn list_dead(&self) -> BrokerResult<Vec<DeadTask>> {
        self.reader.list_dead().await
    }

    async fn rescue(&self, id: &TaskId, score: f64) -> BrokerResult<()> {
        self.engine.rescue(id, score).await
    }

    async fn retry_now(&self, id: &TaskId, score: f64) -> BrokerResult<()> {
        self.engine.retry_now(id, score).await
    }

    async fn process_now(&self, id: &TaskId, score: f64) -> BrokerResult<()> {
        self.engine.process_now(id, score).await
    }

    async fn health_check(&self) -> BrokerResult<()> {
        self.store.ping().await
    }

    fn close(&self) {
        self.store.close();
        info!("Queue admin service closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrokerError;
    use crate::message::TaskMessage;
    use crate::queue::QueueName;
    use crate::store::InMemoryStore;

    fn service() -> Arc<dyn QueueAdminInterface> {
        Arc::new(QueueAdminService::new(
            Arc::new(InMemoryStore::new()),
            QueueKeys::default(),
        ))
    }

    #[tokio::test]
    async fn test_service_round_trip() {
        let admin = QueueAdminService::new(Arc::new(InMemoryStore::new()), QueueKeys::default());
        let msg = TaskMessage::new("noop");
        admin
            .writer()
            .add_scored(QueueName::Scheduled, &msg, 1_700_000_000.0)
            .await
            .unwrap();

        let scheduled = admin.list_scheduled().await.unwrap();
        assert_eq!(scheduled.len(), 1);

        admin.process_now(&scheduled[0].id, scheduled[0].score).await.unwrap();
        let ready = admin.list_enqueued().await.unwrap();
        assert_eq!(ready[0].id, msg.id);
        assert_eq!(admin.current_stats().await.unwrap().enqueued, 1);
    }

    #[tokio::test]
    async fn test_health_check_and_close() {
        let admin = service();
        admin.health_check().await.unwrap();
        admin.close();

        assert!(matches!(admin.health_check().await, Err(BrokerError::Closed)));
        assert!(admin.current_stats().await.unwrap_err().is_backend());
    }

    #[tokio::test]
    async fn test_empty_listings() {
        let admin = service();
        assert!(admin.list_enqueued().await.unwrap().is_empty());
        assert!(admin.list_in_progress().await.unwrap().is_empty());
        assert!(admin.list_retry().await.unwrap().is_empty());
        assert!(admin.list_dead().await.unwrap().is_empty());
    }
}
