//! Common test infrastructure for broker integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use taskyard_broker::{InMemoryStore, QueueAdminService, QueueKeys, QueueStore, QueueWriter, TaskId, TaskMessage};

/// Admin service over a fresh in-memory store, with direct store access for
/// seeding raw members.
pub struct TestBroker {
    pub store: Arc<InMemoryStore>,
    pub admin: QueueAdminService,
    pub writer: QueueWriter,
    pub keys: QueueKeys,
}

impl TestBroker {
    /// Creates a broker with the default key prefix.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), QueueKeys::default())
    }

    /// Creates a broker over the given store.
    pub fn with_store(store: Arc<InMemoryStore>, keys: QueueKeys) -> Self {
        let dyn_store: Arc<dyn QueueStore> = store.clone();
        Self {
            admin: QueueAdminService::new(dyn_store.clone(), keys.clone()),
            writer: QueueWriter::new(dyn_store, keys.clone()),
            store,
            keys,
        }
    }
}

/// Builds a task with a fixed ID.
pub fn task(id: &str, task_type: &str) -> TaskMessage {
    TaskMessage::new(task_type).with_id(TaskId::parse(id).expect("valid task id"))
}

/// A few fixed task IDs.
pub const T1: &str = "00000000-0000-4000-8000-000000000001";
pub const T2: &str = "00000000-0000-4000-8000-000000000002";
pub const T3: &str = "00000000-0000-4000-8000-000000000003";
