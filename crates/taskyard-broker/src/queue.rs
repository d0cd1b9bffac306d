//! The five task queues and their store keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a queue is laid out in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageShape {
    /// Append-list; members kept in insertion order.
    List,
    /// Score-ordered set; score is a Unix timestamp in seconds.
    SortedSet,
}

/// What a listing does with a member that fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Abort the whole listing with a decode error.
    Strict,
    /// Drop the member and keep scanning.
    Skip,
}

/// One of the five queues a task can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    /// Ready for dispatch.
    Ready,
    /// Claimed by a worker.
    Active,
    /// Deferred until its process-at time.
    Scheduled,
    /// Awaiting a retry after a failure.
    Retry,
    /// Retry budget exhausted.
    Dead,
}

impl QueueName {
    /// All queues, in lifecycle order.
    pub const ALL: [QueueName; 5] = [
        QueueName::Ready,
        QueueName::Active,
        QueueName::Scheduled,
        QueueName::Retry,
        QueueName::Dead,
    ];

    /// Storage layout of this queue.
    pub const fn shape(self) -> StorageShape {
        match self {
            QueueName::Ready | QueueName::Active => StorageShape::List,
            QueueName::Scheduled | QueueName::Retry | QueueName::Dead => StorageShape::SortedSet,
        }
    }

    /// How listings of this queue treat malformed members.
    ///
    /// Only the ready queue is strict: workers consume it directly, so a bad
    /// entry there is corruption worth surfacing. Everything else is a
    /// monitoring view.
    pub const fn decode_policy(self) -> DecodePolicy {
        match self {
            QueueName::Ready => DecodePolicy::Strict,
            _ => DecodePolicy::Skip,
        }
    }

    /// Whether a task can be moved from this queue into ready.
    pub const fn is_transition_source(self) -> bool {
        matches!(self.shape(), StorageShape::SortedSet)
    }

    /// Lowercase name used in logs and metric labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            QueueName::Ready => "ready",
            QueueName::Active => "active",
            QueueName::Scheduled => "scheduled",
            QueueName::Retry => "retry",
            QueueName::Dead => "dead",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ready" | "enqueued" => Ok(QueueName::Ready),
            "active" | "in_progress" => Ok(QueueName::Active),
            "scheduled" => Ok(QueueName::Scheduled),
            "retry" => Ok(QueueName::Retry),
            "dead" => Ok(QueueName::Dead),
            other => Err(format!("unknown queue: {}", other)),
        }
    }
}

/// Store key builder for the five queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueKeys {
    ready: String,
    active: String,
    scheduled: String,
    retry: String,
    dead: String,
}

impl QueueKeys {
    /// Create a new key builder with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            ready: format!("{}:queues:default", prefix),
            active: format!("{}:in_progress", prefix),
            scheduled: format!("{}:scheduled", prefix),
            retry: format!("{}:retry", prefix),
            dead: format!("{}:dead", prefix),
        }
    }

    /// Key holding the given queue.
    pub fn key(&self, queue: QueueName) -> &str {
        match queue {
            QueueName::Ready => &self.ready,
            QueueName::Active => &self.active,
            QueueName::Scheduled => &self.scheduled,
            QueueName::Retry => &self.retry,
            QueueName::Dead => &self.dead,
        }
    }
}

impl Default for QueueKeys {
    fn default() -> Self {
        Self::new("taskyard")
    }
}
