//! Store capability interface and its implementations.
//!
//! The broker only ever talks to the store through [`QueueStore`]: plain list
//! and sorted-set commands, one batched cardinality read, and the atomic move
//! primitive. Keys are passed in by the caller; the store knows nothing about
//! queue roles.

mod memory;
mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::{create_pool, RedisStore, MOVE_TO_READY_SCRIPT};

use crate::error::BrokerResult;
use crate::message::TaskId;
use crate::queue::StorageShape;
use async_trait::async_trait;

/// Raw bytes of a queue member, exactly as stored.
pub type Member = Vec<u8>;

/// A sorted-set member together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    /// Raw member bytes.
    pub member: Member,
    /// Native store score.
    pub score: f64,
}

/// Narrow view of the key-value store used by the broker.
///
/// Every method is one round trip. Implementations must make
/// [`QueueStore::move_to_ready`] indivisible with respect to every other
/// command on the same keys.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// All members of a list, head first.
    async fn list_range(&self, key: &str) -> BrokerResult<Vec<Member>>;

    /// Length of a list.
    async fn list_len(&self, key: &str) -> BrokerResult<u64>;

    /// Pushes a member onto the head of a list.
    async fn list_push_head(&self, key: &str, member: &[u8]) -> BrokerResult<()>;

    /// All members of a sorted set with scores, lowest score first.
    async fn sorted_range_with_scores(&self, key: &str) -> BrokerResult<Vec<ScoredMember>>;

    /// Cardinality of a sorted set.
    async fn sorted_card(&self, key: &str) -> BrokerResult<u64>;

    /// Adds a member, or updates its score if already present.
    async fn sorted_add(&self, key: &str, member: &[u8], score: f64) -> BrokerResult<()>;

    /// Removes a member; returns whether it was present.
    async fn sorted_remove(&self, key: &str, member: &[u8]) -> BrokerResult<bool>;

    /// Members whose score equals `score` exactly.
    async fn sorted_range_by_score(&self, key: &str, score: f64) -> BrokerResult<Vec<Member>>;

    /// Sizes of several keys in one batched round trip, in input order.
    ///
    /// The batch is not a transaction: counts may reflect slightly different
    /// instants. Any failure fails the whole batch.
    async fn cardinalities(&self, keys: &[(&str, StorageShape)]) -> BrokerResult<Vec<u64>>;

    /// Atomically moves the member of `source_key` with score `score` whose
    /// `ID` field equals `id` to the head of `ready_key`.
    ///
    /// Returns the number of members moved: 1 on a match, 0 otherwise.
    async fn move_to_ready(
        &self,
        source_key: &str,
        ready_key: &str,
        id: &TaskId,
        score: f64,
    ) -> BrokerResult<i64>;

    /// Round-trips a no-op to verify connectivity.
    async fn ping(&self) -> BrokerResult<()>;

    /// Releases the connection. Later calls fail with a backend error.
    fn close(&self);
}
