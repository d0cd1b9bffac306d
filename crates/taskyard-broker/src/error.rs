//! Broker error types.

use crate::message::TaskId;
use crate::queue::QueueName;
use std::time::Duration;
use thiserror::Error;

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Broad classification of a [`BrokerError`].
///
/// Operator tooling branches on this rather than on individual variants: a
/// stale (ID, score) pair calls for a fresh listing, a backend failure calls
/// for backing off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A queue member could not be encoded or decoded.
    Decode,
    /// The requested (ID, score) pair is not in the source queue.
    TaskNotFound,
    /// The store was unreachable, timed out, or answered unexpectedly.
    Backend,
    /// The caller asked for something the broker does not support.
    Usage,
}

/// Broker errors.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A stored member is not a well-formed task record.
    #[error("Failed to decode task record: {reason}")]
    Decode { reason: String },

    /// A task record or payload value could not be serialized.
    #[error("Failed to encode task record: {0}")]
    Encode(#[source] serde_json::Error),

    /// No member with the given ID and score exists in the source queue.
    #[error("Task {id} with score {score} not found in {queue} queue")]
    TaskNotFound {
        queue: QueueName,
        id: TaskId,
        score: f64,
    },

    /// The queue cannot be used as the source of a transition.
    #[error("Queue {0} cannot be used as a transition source")]
    InvalidQueue(QueueName),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// A store round trip exceeded its deadline.
    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered with a reply of the wrong shape.
    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),

    /// The store connection was closed.
    #[error("Store connection is closed")]
    Closed,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BrokerError {
    /// Creates a decode error from any displayable reason.
    pub fn decode(reason: impl std::fmt::Display) -> Self {
        Self::Decode {
            reason: reason.to_string(),
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode { .. } | Self::Encode(_) => ErrorKind::Decode,
            Self::TaskNotFound { .. } => ErrorKind::TaskNotFound,
            Self::Redis(_)
            | Self::Pool(_)
            | Self::Timeout(_)
            | Self::UnexpectedReply(_)
            | Self::Closed => ErrorKind::Backend,
            Self::InvalidQueue(_) | Self::Configuration(_) => ErrorKind::Usage,
        }
    }

    /// Returns true if the requested task was not where the caller expected.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::TaskNotFound
    }

    /// Returns true if the store itself failed.
    pub fn is_backend(&self) -> bool {
        self.kind() == ErrorKind::Backend
    }

    /// Short label used in metrics.
    pub fn label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Decode => "decode",
            ErrorKind::TaskNotFound => "not_found",
            ErrorKind::Backend => "backend",
            ErrorKind::Usage => "usage",
        }
    }
}

impl From<taskyard_core::TaskyardError> for BrokerError {
    fn from(err: taskyard_core::TaskyardError) -> Self {
        BrokerError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kind() {
        let err = BrokerError::TaskNotFound {
            queue: QueueName::Dead,
            id: TaskId::new(),
            score: 1_700_000_100.0,
        };
        assert!(err.is_not_found());
        assert!(!err.is_backend());
        assert_eq!(err.label(), "not_found");
    }

    #[test]
    fn test_backend_kinds() {
        assert!(BrokerError::Closed.is_backend());
        assert!(BrokerError::Timeout(Duration::from_millis(50)).is_backend());
        assert!(BrokerError::UnexpectedReply("nil".into()).is_backend());
    }

    #[test]
    fn test_decode_kind() {
        let err = BrokerError::decode("missing field `ID`");
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("missing field `ID`"));
    }

    #[test]
    fn test_invalid_queue_is_usage() {
        let err = BrokerError::InvalidQueue(QueueName::Active);
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(
            err.to_string(),
            "Queue active cannot be used as a transition source"
        );
    }

    #[test]
    fn test_display_not_found() {
        let id = TaskId::parse("7f1c3d2e-9a4b-4c5d-8e6f-0a1b2c3d4e5f").unwrap();
        let err = BrokerError::TaskNotFound {
            queue: QueueName::Retry,
            id,
            score: 1_700_000_100.0,
        };
        assert_eq!(
            err.to_string(),
            "Task 7f1c3d2e-9a4b-4c5d-8e6f-0a1b2c3d4e5f with score 1700000100 not found in retry queue"
        );
    }

    #[test]
    fn test_from_taskyard_error() {
        let err = BrokerError::from(taskyard_core::TaskyardError::configuration("bad prefix"));
        match err {
            BrokerError::Configuration(msg) => assert!(msg.contains("bad prefix")),
            _ => panic!("Expected Configuration error"),
        }
    }
}
