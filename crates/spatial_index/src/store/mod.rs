//! Store adapter.
//!
//! The index keeps all of its state in an external key-value system that
//! offers two structures: a sorted collection ordered purely by member
//! string, and a hash map from entity id to member string. Any backend able
//! to run the [`Command`]s below, singly or as a batch, can host an index.

mod memory;

pub use memory::MemoryStore;

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::fmt;

/// One end of a lexicographic range scan
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexBound {
    /// Includes the value itself (`[value`)
    Inclusive(String),
    /// Excludes the value itself (`(value`)
    Exclusive(String),
    /// Below every member (`-`)
    Min,
    /// Above every member (`+`)
    Max,
}

impl LexBound {
    /// Whether `member` lies on the permitted side of this bound when used
    /// as the lower end of a scan
    pub fn admits_from_below(&self, member: &str) -> bool {
        match self {
            LexBound::Inclusive(v) => member >= v.as_str(),
            LexBound::Exclusive(v) => member > v.as_str(),
            LexBound::Min => true,
            LexBound::Max => false,
        }
    }

    /// Whether `member` lies on the permitted side of this bound when used
    /// as the upper end of a scan
    pub fn admits_from_above(&self, member: &str) -> bool {
        match self {
            LexBound::Inclusive(v) => member <= v.as_str(),
            LexBound::Exclusive(v) => member < v.as_str(),
            LexBound::Min => false,
            LexBound::Max => true,
        }
    }
}

/// Renders the bound in the store's textual range convention
impl fmt::Display for LexBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexBound::Inclusive(v) => write!(f, "[{v}"),
            LexBound::Exclusive(v) => write!(f, "({v}"),
            LexBound::Min => f.write_str("-"),
            LexBound::Max => f.write_str("+"),
        }
    }
}

/// A lexicographic scan request `[min, max]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
}

impl LexRange {
    pub fn new(min: LexBound, max: LexBound) -> Self {
        Self { min, max }
    }

    /// Inclusive range between two values
    pub fn inclusive(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self::new(LexBound::Inclusive(min.into()), LexBound::Inclusive(max.into()))
    }

    pub fn contains(&self, member: &str) -> bool {
        self.min.admits_from_below(member) && self.max.admits_from_above(member)
    }
}

/// A single store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Adds `member` to the sorted collection at `key` (zero score)
    SortedInsert { key: String, member: String },
    /// Removes the exact `member` from the sorted collection at `key`
    SortedRemove { key: String, member: String },
    /// Lists members of the sorted collection at `key` within `range`
    RangeByLex { key: String, range: LexRange },
    /// Sets `field` to `value` in the hash at `key`
    HashSet {
        key: String,
        field: String,
        value: String,
    },
    /// Reads `field` from the hash at `key`
    HashGet { key: String, field: String },
    /// Deletes `field` from the hash at `key`
    HashDelete { key: String, field: String },
}

impl Command {
    /// Store-side command name, used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::SortedInsert { .. } => "ZADD",
            Command::SortedRemove { .. } => "ZREM",
            Command::RangeByLex { .. } => "ZRANGEBYLEX",
            Command::HashSet { .. } => "HSET",
            Command::HashGet { .. } => "HGET",
            Command::HashDelete { .. } => "HDEL",
        }
    }

    /// Whether the command leaves the store unchanged
    pub fn is_read(&self) -> bool {
        matches!(self, Command::RangeByLex { .. } | Command::HashGet { .. })
    }
}

/// Result of a single [`Command`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Number of members or fields added or removed
    Count(u64),
    /// Hash field value, if present
    Value(Option<String>),
    /// Members returned by a range scan
    Members(Vec<String>),
}

impl Reply {
    fn describe(&self) -> String {
        match self {
            Reply::Count(n) => format!("count {n}"),
            Reply::Value(_) => "value".to_string(),
            Reply::Members(m) => format!("{} members", m.len()),
        }
    }

    /// Extracts a count, failing on any other reply shape
    pub fn into_count(self, command: &str) -> StoreResult<u64> {
        match self {
            Reply::Count(n) => Ok(n),
            other => Err(unexpected(command, &other)),
        }
    }

    /// Extracts a hash value, failing on any other reply shape
    pub fn into_value(self, command: &str) -> StoreResult<Option<String>> {
        match self {
            Reply::Value(v) => Ok(v),
            other => Err(unexpected(command, &other)),
        }
    }

    /// Extracts scanned members, failing on any other reply shape
    pub fn into_members(self, command: &str) -> StoreResult<Vec<String>> {
        match self {
            Reply::Members(m) => Ok(m),
            other => Err(unexpected(command, &other)),
        }
    }
}

fn unexpected(command: &str, reply: &Reply) -> StoreError {
    StoreError::UnexpectedReply {
        command: command.to_string(),
        reply: reply.describe(),
    }
}

/// How a batch of commands is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Applied as one unit, without interleaving with other batches
    Atomic,
    /// Sent together to save round trips, no isolation guarantee
    Pipeline,
}

/// Backend hosting the sorted collection and hash map of an index.
///
/// Implementations talk to whatever transport reaches the store. Timeouts
/// and retries belong to the implementation; the index propagates any
/// [`StoreError`] unchanged.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Runs a single command
    async fn execute(&self, command: Command) -> StoreResult<Reply>;

    /// Runs several commands together, returning replies in submission order
    async fn batch(&self, commands: Vec<Command>, mode: BatchMode) -> StoreResult<Vec<Reply>>;

    async fn sorted_insert(&self, key: &str, member: &str) -> StoreResult<u64> {
        self.execute(Command::SortedInsert {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await?
        .into_count("ZADD")
    }

    async fn sorted_remove(&self, key: &str, member: &str) -> StoreResult<u64> {
        self.execute(Command::SortedRemove {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await?
        .into_count("ZREM")
    }

    async fn range_by_lex(&self, key: &str, range: LexRange) -> StoreResult<Vec<String>> {
        self.execute(Command::RangeByLex {
            key: key.to_string(),
            range,
        })
        .await?
        .into_members("ZRANGEBYLEX")
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<u64> {
        self.execute(Command::HashSet {
            key: key.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
        .await?
        .into_count("HSET")
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.execute(Command::HashGet {
            key: key.to_string(),
            field: field.to_string(),
        })
        .await?
        .into_value("HGET")
    }

    async fn hash_delete(&self, key: &str, field: &str) -> StoreResult<u64> {
        self.execute(Command::HashDelete {
            key: key.to_string(),
            field: field.to_string(),
        })
        .await?
        .into_count("HDEL")
    }
}

/// Checks that a backend answered every command of a batch
pub(crate) fn expect_replies(replies: Vec<Reply>, expected: usize) -> StoreResult<Vec<Reply>> {
    if replies.len() != expected {
        return Err(StoreError::BatchLength {
            expected,
            actual: replies.len(),
        });
    }
    Ok(replies)
}
