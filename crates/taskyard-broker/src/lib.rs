//! Taskyard Broker - Queue State Core
//!
//! The Redis-side state model of the Taskyard task broker:
//! - Task records with a stable JSON wire format
//! - Five queues (ready, active, scheduled, retry, dead) on list and sorted-set keys
//! - Snapshot reads: queue sizes and per-queue listings
//! - Atomic transitions from scheduled, retry and dead back into ready
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                   QueueAdminService                        │
//! │   ┌──────────────────────┐    ┌──────────────────────┐    │
//! │   │    SnapshotReader    │    │   TransitionEngine   │    │
//! │   │ stats / list_* views │    │ rescue / retry_now / │    │
//! │   │                      │    │ process_now          │    │
//! │   └──────────┬───────────┘    └──────────┬───────────┘    │
//! │              └─────────────┬─────────────┘                │
//! │                            ▼                              │
//! │                  Arc<dyn QueueStore>                      │
//! │          ┌─────────────────┴────────────────┐             │
//! │          ▼                                  ▼             │
//! │     RedisStore                        InMemoryStore       │
//! │  (pool + Lua move script)          (single mutex)         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use taskyard_broker::prelude::*;
//!
//! let admin = QueueAdminService::connect(&config.redis).await?;
//!
//! for task in admin.list_dead().await? {
//!     admin.rescue(&task.id, task.score).await?;
//! }
//! ```

pub mod di;
pub mod error;
mod finite;
pub mod inspect;
pub mod message;
pub mod metrics;
pub mod queue;
pub mod store;
pub mod transition;
pub mod writer;

pub use di::{QueueAdminInterface, QueueAdminService};
pub use error::{BrokerError, BrokerResult, ErrorKind};
pub use inspect::{
    score_to_time, DeadTask, EnqueuedTask, InProgressTask, RetryTask, ScheduledTask, SnapshotReader, Stats,
};
pub use message::{Payload, TaskId, TaskMessage};
pub use metrics::{register_metrics, QueueMetrics, StoreMetrics, TransitionMetrics};
pub use queue::{DecodePolicy, QueueKeys, QueueName, StorageShape};
pub use store::{create_pool, InMemoryStore, QueueStore, RedisStore, ScoredMember, MOVE_TO_READY_SCRIPT};
pub use transition::TransitionEngine;
pub use writer::QueueWriter;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::di::{QueueAdminInterface, QueueAdminService};
    pub use crate::queue::QueueName;
    pub use crate::store::QueueStore;
    pub use crate::{BrokerError, BrokerResult, TaskId, TaskMessage};
}
