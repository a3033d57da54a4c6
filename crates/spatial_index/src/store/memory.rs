//! In-process store backend.
//!
//! Keeps sorted collections as `BTreeSet<String>` (byte-wise ordering, the
//! same as a lexicographic sorted set with equal scores) and hashes as
//! `HashMap<String, String>`, all behind one `tokio` lock. Atomic batches
//! run under the write lock so no other batch can interleave with them.

use super::{BatchMode, Command, LexBound, Reply, StoreBackend};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;
use tracing::trace;

#[derive(Debug, Default)]
struct MemoryState {
    sorted: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

impl MemoryState {
    fn apply(&mut self, command: Command) -> Reply {
        match command {
            Command::SortedInsert { key, member } => {
                let added = self.sorted.entry(key).or_default().insert(member);
                Reply::Count(u64::from(added))
            }
            Command::SortedRemove { key, member } => {
                let removed = match self.sorted.get_mut(&key) {
                    Some(set) => {
                        let removed = set.remove(&member);
                        if set.is_empty() {
                            self.sorted.remove(&key);
                        }
                        removed
                    }
                    None => false,
                };
                Reply::Count(u64::from(removed))
            }
            Command::HashSet { key, field, value } => {
                let added = self.hashes.entry(key).or_default().insert(field, value);
                Reply::Count(u64::from(added.is_none()))
            }
            Command::HashDelete { key, field } => {
                let removed = match self.hashes.get_mut(&key) {
                    Some(hash) => {
                        let removed = hash.remove(&field).is_some();
                        if hash.is_empty() {
                            self.hashes.remove(&key);
                        }
                        removed
                    }
                    None => false,
                };
                Reply::Count(u64::from(removed))
            }
            read => self.read(&read),
        }
    }

    fn read(&self, command: &Command) -> Reply {
        match command {
            Command::RangeByLex { key, range } => {
                let members = self
                    .sorted
                    .get(key)
                    .map(|set| {
                        let start: Bound<&str> = match &range.min {
                            LexBound::Inclusive(v) => Bound::Included(v.as_str()),
                            LexBound::Exclusive(v) => Bound::Excluded(v.as_str()),
                            _ => Bound::Unbounded,
                        };
                        set.range::<str, _>((start, Bound::Unbounded))
                            .take_while(|m| range.max.admits_from_above(m))
                            .filter(|m| range.min.admits_from_below(m))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                Reply::Members(members)
            }
            Command::HashGet { key, field } => Reply::Value(
                self.hashes
                    .get(key)
                    .and_then(|hash| hash.get(field))
                    .cloned(),
            ),
            write => unreachable!("{} routed to the read path", write.name()),
        }
    }
}

/// Sorted-set and hash store held entirely in memory.
///
/// Useful for tests, single-process servers, and tooling that wants an
/// index without a remote store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members in the sorted collection at `key`
    pub async fn sorted_len(&self, key: &str) -> usize {
        let state = self.state.read().await;
        state.sorted.get(key).map_or(0, BTreeSet::len)
    }

    /// Number of fields in the hash at `key`
    pub async fn hash_len(&self, key: &str) -> usize {
        let state = self.state.read().await;
        state.hashes.get(key).map_or(0, HashMap::len)
    }

    /// All members of the sorted collection at `key`, in order
    pub async fn members(&self, key: &str) -> Vec<String> {
        let state = self.state.read().await;
        state
            .sorted
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn execute(&self, command: Command) -> StoreResult<Reply> {
        trace!(command = command.name(), "memory store execute");
        if command.is_read() {
            let state = self.state.read().await;
            Ok(state.read(&command))
        } else {
            let mut state = self.state.write().await;
            Ok(state.apply(command))
        }
    }

    async fn batch(&self, commands: Vec<Command>, mode: BatchMode) -> StoreResult<Vec<Reply>> {
        trace!(?mode, len = commands.len(), "memory store batch");
        let read_only = commands.iter().all(Command::is_read);

        if read_only && mode == BatchMode::Pipeline {
            let state = self.state.read().await;
            return Ok(commands.iter().map(|c| state.read(c)).collect());
        }

        let mut state = self.state.write().await;
        Ok(commands.into_iter().map(|c| state.apply(c)).collect())
    }
}
