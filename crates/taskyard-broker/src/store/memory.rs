//! In-memory store.
//!
//! Mirrors the Redis command semantics the broker relies on closely enough to
//! run the whole broker against it in tests and local tooling. A single mutex
//! guards all keys, which makes every command (and in particular the move
//! primitive) atomic.

use super::{Member, QueueStore, ScoredMember};
use crate::error::{BrokerError, BrokerResult};
use crate::message::TaskId;
use crate::queue::StorageShape;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

#[derive(Default)]
struct MemoryState {
    lists: HashMap<String, VecDeque<Member>>,
    /// Kept sorted by (score, member) like a Redis sorted set.
    sorted: HashMap<String, Vec<ScoredMember>>,
}

impl MemoryState {
    fn insert_sorted(&mut self, key: &str, member: &[u8], score: f64) {
        let set = self.sorted.entry(key.to_string()).or_default();
        set.retain(|entry| entry.member != member);
        let position = set
            .iter()
            .position(|entry| compare(entry, score, member) == Ordering::Greater)
            .unwrap_or(set.len());
        set.insert(
            position,
            ScoredMember {
                member: member.to_vec(),
                score,
            },
        );
    }

    fn remove_sorted(&mut self, key: &str, member: &[u8]) -> bool {
        let Some(set) = self.sorted.get_mut(key) else {
            return false;
        };
        let before = set.len();
        set.retain(|entry| entry.member != member);
        let removed = set.len() != before;
        if set.is_empty() {
            self.sorted.remove(key);
        }
        removed
    }
}

fn compare(entry: &ScoredMember, score: f64, member: &[u8]) -> Ordering {
    entry
        .score
        .total_cmp(&score)
        .then_with(|| entry.member.as_slice().cmp(member))
}

/// Reads the `ID` field without going through the full codec, the same way
/// the server-side script does.
fn member_id(member: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(member).ok()?;
    value.get("ID")?.as_str().map(str::to_owned)
}

/// Store backed by process memory.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    closed: AtomicBool,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> BrokerResult<parking_lot::MutexGuard<'_, MemoryState>> {
        if self.closed.load(AtomicOrdering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        Ok(self.state.lock())
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn list_range(&self, key: &str) -> BrokerResult<Vec<Member>> {
        let state = self.state()?;
        Ok(state
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_len(&self, key: &str) -> BrokerResult<u64> {
        let state = self.state()?;
        Ok(state.lists.get(key).map_or(0, |list| list.len() as u64))
    }

    async fn list_push_head(&self, key: &str, member: &[u8]) -> BrokerResult<()> {
        let mut state = self.state()?;
        state
            .lists
            .entry(key.to_string())
            .or_default()
            .push_front(member.to_vec());
        Ok(())
    }

    async fn sorted_range_with_scores(&self, key: &str) -> BrokerResult<Vec<ScoredMember>> {
        let state = self.state()?;
        Ok(state.sorted.get(key).cloned().unwrap_or_default())
    }

    async fn sorted_card(&self, key: &str) -> BrokerResult<u64> {
        let state = self.state()?;
        Ok(state.sorted.get(key).map_or(0, |set| set.len() as u64))
    }

    async fn sorted_add(&self, key: &str, member: &[u8], score: f64) -> BrokerResult<()> {
        self.state()?.insert_sorted(key, member, score);
        Ok(())
    }

    async fn sorted_remove(&self, key: &str, member: &[u8]) -> BrokerResult<bool> {
        Ok(self.state()?.remove_sorted(key, member))
    }

    async fn sorted_range_by_score(&self, key: &str, score: f64) -> BrokerResult<Vec<Member>> {
        let state = self.state()?;
        Ok(state
            .sorted
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|entry| entry.score == score)
                    .map(|entry| entry.member.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn cardinalities(&self, keys: &[(&str, StorageShape)]) -> BrokerResult<Vec<u64>> {
        let state = self.state()?;
        Ok(keys
            .iter()
            .map(|(key, shape)| match shape {
                StorageShape::List => state.lists.get(*key).map_or(0, |l| l.len() as u64),
                StorageShape::SortedSet => state.sorted.get(*key).map_or(0, |s| s.len() as u64),
            })
            .collect())
    }

    async fn move_to_ready(
        &self,
        source_key: &str,
        ready_key: &str,
        id: &TaskId,
        score: f64,
    ) -> BrokerResult<i64> {
        let mut state = self.state()?;
        let wanted = id.to_string();

        let found = state.sorted.get(source_key).and_then(|set| {
            set.iter()
                .filter(|entry| entry.score == score)
                .find(|entry| member_id(&entry.member).as_deref() == Some(wanted.as_str()))
                .map(|entry| entry.member.clone())
        });

        let Some(member) = found else {
            return Ok(0);
        };

        state.remove_sorted(source_key, &member);
        state
            .lists
            .entry(ready_key.to_string())
            .or_default()
            .push_front(member);
        Ok(1)
    }

    async fn ping(&self) -> BrokerResult<()> {
        self.state().map(|_| ())
    }

    fn close(&self) {
        self.closed.store(true, AtomicOrdering::SeqCst);
    }
}
