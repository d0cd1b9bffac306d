//! Atomic moves from the sorted-set queues back into ready.

use crate::error::{BrokerError, BrokerResult};
use crate::message::TaskId;
use crate::metrics::TransitionMetrics;
use crate::queue::{QueueKeys, QueueName};
use crate::store::QueueStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Moves individual tasks from scheduled, retry or dead into ready.
///
/// A task is addressed by its ID together with the exact score it was listed
/// with. Tasks land at the head of the ready queue.
#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn QueueStore>,
    keys: QueueKeys,
}

impl TransitionEngine {
    /// Create an engine over `store` using `keys`.
    pub fn new(store: Arc<dyn QueueStore>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    /// Moves a dead task back to ready.
    pub async fn rescue(&self, id: &TaskId, score: f64) -> BrokerResult<()> {
        self.move_to_ready(QueueName::Dead, id, score).await
    }

    /// Moves a retry task to ready ahead of its scheduled retry time.
    pub async fn retry_now(&self, id: &TaskId, score: f64) -> BrokerResult<()> {
        self.move_to_ready(QueueName::Retry, id, score).await
    }

    /// Moves a scheduled task to ready ahead of its process-at time.
    pub async fn process_now(&self, id: &TaskId, score: f64) -> BrokerResult<()> {
        self.move_to_ready(QueueName::Scheduled, id, score).await
    }

    /// Moves the member of `source` with this (ID, score) to the head of ready.
    ///
    /// Fails with [`BrokerError::TaskNotFound`] when nothing matches, which
    /// includes a task that was already moved or whose score changed since it
    /// was listed.
    pub async fn move_to_ready(&self, source: QueueName, id: &TaskId, score: f64) -> BrokerResult<()> {
        if !source.is_transition_source() {
            return Err(BrokerError::InvalidQueue(source));
        }

        debug!(queue = %source, task_id = %id, score, "Moving task to ready");

        let result = self
            .store
            .move_to_ready(
                self.keys.key(source),
                self.keys.key(QueueName::Ready),
                id,
                score,
            )
            .await
            .and_then(|moved| match moved {
                1 => Ok(()),
                0 => Err(BrokerError::TaskNotFound {
                    queue: source,
                    id: *id,
                    score,
                }),
                n => Err(BrokerError::UnexpectedReply(format!(
                    "move_to_ready returned {}",
                    n
                ))),
            });

        match &result {
            Ok(()) => {
                TransitionMetrics::transition(source, "moved");
                info!(queue = %source, task_id = %id, score, "Moved task to ready");
            }
            Err(err) => {
                TransitionMetrics::transition(source, err.label());
                debug!(queue = %source, task_id = %id, score, error = %err, "Task not moved");
            }
        }

        result
    }
}
