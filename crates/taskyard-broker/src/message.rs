//! Task record and its wire codec.
//!
//! A [`TaskMessage`] is stored verbatim as a queue member. The encoding is a
//! compact JSON object whose field names (`ID`, `Type`, `Payload`, `ErrorMsg`,
//! `Retried`, `Retry`) are part of the wire contract: the atomic move script
//! reads `ID` straight out of the stored member.

use crate::error::{BrokerError, BrokerResult};
use crate::finite::ensure_finite;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Opaque application data carried by a task.
pub type Payload = Map<String, Value>;

/// Globally unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random task ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a task ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a task ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for TaskId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The unit of work persisted inside every queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Cross-queue correlation key.
    #[serde(rename = "ID")]
    pub id: TaskId,

    /// Handler tag for the eventual worker.
    #[serde(rename = "Type")]
    pub task_type: String,

    /// Application data, never interpreted here.
    #[serde(rename = "Payload", default, deserialize_with = "null_as_empty")]
    pub payload: Payload,

    /// Last recorded failure reason.
    #[serde(rename = "ErrorMsg", default)]
    pub error_msg: String,

    /// Retry attempts already consumed.
    #[serde(rename = "Retried", default)]
    pub retried: u32,

    /// Maximum retry attempts allowed.
    #[serde(rename = "Retry", default)]
    pub retry: u32,
}

/// Producers that serialize an unset payload write `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Payload, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Payload>::deserialize(deserializer)?.unwrap_or_default())
}

impl TaskMessage {
    /// Creates a task with a fresh ID and an empty payload.
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            task_type: task_type.into(),
            payload: Payload::new(),
            error_msg: String::new(),
            retried: 0,
            retry: 0,
        }
    }

    /// Replaces the ID.
    #[must_use]
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Replaces the whole payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Sets the retry limit.
    #[must_use]
    pub fn with_retry_limit(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    /// Records failure metadata as the retry path would before re-queueing.
    #[must_use]
    pub fn with_failure(mut self, error_msg: impl Into<String>, retried: u32) -> Self {
        self.error_msg = error_msg.into();
        self.retried = retried;
        self
    }

    /// Serializes `value` into the payload under `key`.
    ///
    /// Fails with [`BrokerError::Encode`] for values JSON cannot represent:
    /// NaN or infinite floats, and maps keyed by anything other than strings
    /// or integers. The payload is left untouched on failure.
    pub fn set_payload<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> BrokerResult<()> {
        ensure_finite(&value).map_err(BrokerError::Encode)?;
        let value = serde_json::to_value(value).map_err(BrokerError::Encode)?;
        self.payload.insert(key.into(), value);
        Ok(())
    }

    /// Encodes the record into its wire form.
    ///
    /// Deterministic: struct fields are written in declaration order and
    /// payload keys in sorted order.
    pub fn encode(&self) -> BrokerResult<String> {
        serde_json::to_string(self).map_err(BrokerError::Encode)
    }

    /// Decodes a stored queue member.
    pub fn decode(raw: &[u8]) -> BrokerResult<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| BrokerError::decode(format!("member is not valid UTF-8: {}", e)))?;
        serde_json::from_str(text).map_err(BrokerError::decode)
    }
}
