//! Read-only views over the five queues.
//!
//! Every listing is a full scan of one key. The ready queue is read strictly:
//! one malformed member fails the call. The other queues are monitoring views
//! and drop malformed members with a warning.

use crate::error::{BrokerError, BrokerResult};
use crate::message::{Payload, TaskId, TaskMessage};
use crate::metrics::QueueMetrics;
use crate::queue::{DecodePolicy, QueueKeys, QueueName};
use crate::store::{Member, QueueStore, ScoredMember};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts a sorted-set score into a UTC instant.
///
/// Fractional seconds are truncated. Returns `None` for scores that are not
/// finite or fall outside the representable range.
pub fn score_to_time(score: f64) -> Option<DateTime<Utc>> {
    if !score.is_finite() {
        return None;
    }
    DateTime::from_timestamp(score.trunc() as i64, 0)
}

/// Point-in-time sizes of the five queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub enqueued: u64,
    pub in_progress: u64,
    pub scheduled: u64,
    pub retry: u64,
    pub dead: u64,
    /// Wall-clock time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl Stats {
    /// Size of one queue.
    pub fn count(&self, queue: QueueName) -> u64 {
        match queue {
            QueueName::Ready => self.enqueued,
            QueueName::Active => self.in_progress,
            QueueName::Scheduled => self.scheduled,
            QueueName::Retry => self.retry,
            QueueName::Dead => self.dead,
        }
    }

    /// Sum over all queues.
    pub fn total(&self) -> u64 {
        self.enqueued + self.in_progress + self.scheduled + self.retry + self.dead
    }
}

/// A task waiting in the ready queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueuedTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
}

/// A task claimed by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InProgressTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
}

/// A task deferred until `process_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub process_at: DateTime<Utc>,
    /// Raw score; pass it back unchanged to `process_now`.
    pub score: f64,
}

/// A failed task waiting for its next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub process_at: DateTime<Utc>,
    /// Raw score; pass it back unchanged to `retry_now`.
    pub score: f64,
    pub error_msg: String,
    pub retried: u32,
    pub retry: u32,
}

/// A task whose retries are exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub last_failed_at: DateTime<Utc>,
    /// Raw score; pass it back unchanged to `rescue`.
    pub score: f64,
    pub error_msg: String,
}

/// Snapshot reader over the queue store.
#[derive(Clone)]
pub struct SnapshotReader {
    store: Arc<dyn QueueStore>,
    keys: QueueKeys,
}

impl SnapshotReader {
    /// Create a reader over `store` using `keys`.
    pub fn new(store: Arc<dyn QueueStore>, keys: QueueKeys) -> Self {
        Self { store, keys }
    }

    /// Key builder in use.
    pub fn keys(&self) -> &QueueKeys {
        &self.keys
    }

    /// Sizes of all five queues from one batched round trip.
    pub async fn current_stats(&self) -> BrokerResult<Stats> {
        let request: Vec<(&str, _)> = QueueName::ALL
            .iter()
            .map(|queue| (self.keys.key(*queue), queue.shape()))
            .collect();
        let counts = self.store.cardinalities(&request).await?;

        // Request order is QueueName::ALL: ready, active, scheduled, retry, dead.
        let [enqueued, in_progress, scheduled, retry, dead] = <[u64; 5]>::try_from(counts)
            .map_err(|counts| {
                BrokerError::UnexpectedReply(format!(
                    "expected {} queue sizes, got {}",
                    QueueName::ALL.len(),
                    counts.len()
                ))
            })?;

        let stats = Stats {
            enqueued,
            in_progress,
            scheduled,
            retry,
            dead,
            timestamp: Utc::now(),
        };

        for queue in QueueName::ALL {
            QueueMetrics::update_queue_size(queue, stats.count(queue));
        }
        debug!(total = stats.total(), "Collected queue stats");

        Ok(stats)
    }

    /// Every task in the ready queue, head first.
    ///
    /// Fails on the first member that does not decode.
    pub async fn list_enqueued(&self) -> BrokerResult<Vec<EnqueuedTask>> {
        let members = self.list_members(QueueName::Ready).await?;
        Ok(self
            .decode_all(QueueName::Ready, members)?
            .into_iter()
            .map(|msg| EnqueuedTask {
                id: msg.id,
                task_type: msg.task_type,
                payload: msg.payload,
            })
            .collect())
    }

    /// Every task in the active queue, head first. Malformed members are skipped.
    pub async fn list_in_progress(&self) -> BrokerResult<Vec<InProgressTask>> {
        let members = self.list_members(QueueName::Active).await?;
        Ok(self
            .decode_all(QueueName::Active, members)?
            .into_iter()
            .map(|msg| InProgressTask {
                id: msg.id,
                task_type: msg.task_type,
                payload: msg.payload,
            })
            .collect())
    }

    /// Every scheduled task, earliest first. Malformed members are skipped.
    pub async fn list_scheduled(&self) -> BrokerResult<Vec<ScheduledTask>> {
        let entries = self.scored_entries(QueueName::Scheduled).await?;
        Ok(entries
            .into_iter()
            .map(|(msg, score, process_at)| ScheduledTask {
                id: msg.id,
                task_type: msg.task_type,
                payload: msg.payload,
                process_at,
                score,
            })
            .collect())
    }

    /// Every task awaiting retry, earliest first. Malformed members are skipped.
    pub async fn list_retry(&self) -> BrokerResult<Vec<RetryTask>> {
        let entries = self.scored_entries(QueueName::Retry).await?;
        Ok(entries
            .into_iter()
            .map(|(msg, score, process_at)| RetryTask {
                id: msg.id,
                task_type: msg.task_type,
                payload: msg.payload,
                process_at,
                score,
                error_msg: msg.error_msg,
                retried: msg.retried,
                retry: msg.retry,
            })
            .collect())
    }

    /// Every dead task, oldest failure first. Malformed members are skipped.
    pub async fn list_dead(&self) -> BrokerResult<Vec<DeadTask>> {
        let entries = self.scored_entries(QueueName::Dead).await?;
        Ok(entries
            .into_iter()
            .map(|(msg, score, last_failed_at)| DeadTask {
                id: msg.id,
                task_type: msg.task_type,
                payload: msg.payload,
                last_failed_at,
                score,
                error_msg: msg.error_msg,
            })
            .collect())
    }

    async fn list_members(&self, queue: QueueName) -> BrokerResult<Vec<Member>> {
        let members = self.store.list_range(self.keys.key(queue)).await?;
        debug!(queue = %queue, count = members.len(), "Read queue members");
        Ok(members)
    }

    /// Decodes members according to the queue's policy.
    fn decode_all(&self, queue: QueueName, members: Vec<Member>) -> BrokerResult<Vec<TaskMessage>> {
        let mut tasks = Vec::with_capacity(members.len());
        for member in members {
            if let Some(msg) = decode_member(queue, &member)? {
                tasks.push(msg);
            }
        }
        Ok(tasks)
    }

    async fn scored_entries(
        &self,
        queue: QueueName,
    ) -> BrokerResult<Vec<(TaskMessage, f64, DateTime<Utc>)>> {
        let members = self.store.sorted_range_with_scores(self.keys.key(queue)).await?;
        debug!(queue = %queue, count = members.len(), "Read scored queue members");

        let mut entries = Vec::with_capacity(members.len());
        for ScoredMember { member, score } in members {
            let Some(msg) = decode_member(queue, &member)? else {
                continue;
            };
            match score_to_time(score) {
                Some(at) => entries.push((msg, score, at)),
                None => {
                    warn!(queue = %queue, task_id = %msg.id, score, "Skipping entry with unrepresentable score");
                    QueueMetrics::entry_skipped(queue);
                }
            }
        }
        Ok(entries)
    }
}

/// Decodes one member. `Ok(None)` means it was skipped under a lenient policy.
fn decode_member(queue: QueueName, member: &[u8]) -> BrokerResult<Option<TaskMessage>> {
    match TaskMessage::decode(member) {
        Ok(msg) => Ok(Some(msg)),
        Err(err) => match queue.decode_policy() {
            DecodePolicy::Strict => Err(err),
            DecodePolicy::Skip => {
                warn!(queue = %queue, error = %err, "Skipping malformed queue entry");
                QueueMetrics::entry_skipped(queue);
                Ok(None)
            }
        },
    }
}
