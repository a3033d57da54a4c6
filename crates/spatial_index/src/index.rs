//! # Spatial Index
//!
//! [`SpatialIndex`] answers "which entities lie inside this box?" on top of
//! a [`StoreBackend`]. The index itself holds nothing but its configuration;
//! every entry lives in the store as a member of the sorted collection plus
//! a hash field pointing at that member.
//!
//! ## Write protocol
//!
//! | Operation | Store writes (one atomic batch) |
//! |---|---|
//! | `insert` | add member, set hash field |
//! | `remove` | remove member, delete hash field if it points at that member |
//! | `remove_by_id` | remove current member, delete hash field |
//! | `update` | remove old member and field, add new member and field |
//!
//! `remove_by_id`, `update` and `remove` read the hash field first, so two
//! callers racing on the same id through different connections can still
//! interleave between that read and the batch. See [`SpatialIndex::remove`]
//! for the case that leaves a member without a hash field.

use crate::codec::Codec;
use crate::config::IndexConfig;
use crate::decompose::decompose;
use crate::error::{IndexError, IndexResult};
use crate::member::{format_member, parse_member};
use crate::precision::select_exponent;
use crate::store::{expect_replies, BatchMode, Command, StoreBackend};
use crate::types::{AxisRange, IndexEntry};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Z-order spatial index over an external sorted-set and hash store
pub struct SpatialIndex<S: StoreBackend> {
    store: Arc<S>,
    config: IndexConfig,
    codec: Codec,
}

impl<S: StoreBackend> std::fmt::Debug for SpatialIndex<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: StoreBackend> SpatialIndex<S> {
    /// Creates an index over `store`, validating `config` first
    pub fn new(store: Arc<S>, config: IndexConfig) -> IndexResult<Self> {
        config.validate()?;
        let codec = Codec::from_config(&config);
        Ok(Self {
            store,
            config,
            codec,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The exact string stored for `id` at `coordinates`
    pub fn member_string(&self, coordinates: &[u64], id: &str) -> IndexResult<String> {
        let key = self.codec.encode(coordinates)?;
        Ok(format_member(&key, coordinates, id))
    }

    fn collection(&self) -> String {
        self.config.collection_key.clone()
    }

    fn hash(&self) -> String {
        self.config.hash_key.clone()
    }

    fn add_commands(&self, member: &str, id: &str) -> [Command; 2] {
        [
            Command::SortedInsert {
                key: self.collection(),
                member: member.to_string(),
            },
            Command::HashSet {
                key: self.hash(),
                field: id.to_string(),
                value: member.to_string(),
            },
        ]
    }

    fn drop_commands(&self, member: &str, id: &str) -> [Command; 2] {
        [
            Command::SortedRemove {
                key: self.collection(),
                member: member.to_string(),
            },
            Command::HashDelete {
                key: self.hash(),
                field: id.to_string(),
            },
        ]
    }

    async fn atomic(&self, commands: Vec<Command>) -> IndexResult<()> {
        let expected = commands.len();
        let replies = self.store.batch(commands, BatchMode::Atomic).await?;
        expect_replies(replies, expected)?;
        Ok(())
    }

    async fn current_member(&self, id: &str) -> IndexResult<Option<String>> {
        Ok(self.store.hash_get(&self.config.hash_key, id).await?)
    }

    /// Adds `id` at `coordinates`.
    ///
    /// The member and the hash field are written in one atomic batch. Use
    /// [`update`](Self::update) to move an id that is already indexed;
    /// inserting it again would leave its previous member behind.
    ///
    /// # Returns
    ///
    /// `DimensionMismatch` or `CoordinateOutOfRange` for bad coordinates,
    /// before anything is sent to the store.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use spatial_index::{IndexConfig, IndexEntry, MemoryStore, SpatialIndex};
    /// # use std::sync::Arc;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), spatial_index::IndexError> {
    /// let config = IndexConfig::new(2, "z", "h").with_precision(8);
    /// let index = SpatialIndex::new(Arc::new(MemoryStore::new()), config)?;
    ///
    /// index.insert(&[3, 5], "a").await?;
    /// assert_eq!(index.get("a").await?, Some(IndexEntry::new("a", vec![3, 5])));
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), level = "debug")]
    pub async fn insert(&self, coordinates: &[u64], id: &str) -> IndexResult<()> {
        let member = self.member_string(coordinates, id)?;
        self.atomic(self.add_commands(&member, id).into()).await?;
        debug!(%member, "inserted");
        Ok(())
    }

    /// Removes `id` at `coordinates`.
    ///
    /// Deleting a member that is not stored is a silent no-op. The hash
    /// field is cleared together with the member when it points at it, and
    /// left alone when it points at another member.
    ///
    /// The hash field is read before the batch is sent. If another client
    /// runs [`update`](Self::update) on the same id in between, the batch
    /// still deletes the field, now pointing at the new member. That member
    /// stays queryable, but `get`, `remove_by_id` and `update` no longer see
    /// the id until it is inserted again.
    ///
    /// # Returns
    ///
    /// Whether a member was removed.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove(&self, coordinates: &[u64], id: &str) -> IndexResult<bool> {
        let member = self.member_string(coordinates, id)?;
        let current = self.current_member(id).await?;

        if current.as_deref() == Some(member.as_str()) {
            self.atomic(self.drop_commands(&member, id).into()).await?;
            debug!(%member, "removed");
            return Ok(true);
        }

        if let Some(current) = current {
            debug!(%member, %current, "id is indexed elsewhere, leaving hash entry");
        }
        let removed = self
            .store
            .sorted_remove(&self.config.collection_key, &member)
            .await?;
        if removed > 0 {
            warn!(%member, "removed member that had no hash entry");
        }
        Ok(removed > 0)
    }

    /// Removes whatever member currently represents `id`.
    ///
    /// # Returns
    ///
    /// `NotFound` when the id has no hash entry.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove_by_id(&self, id: &str) -> IndexResult<()> {
        let member = self
            .current_member(id)
            .await?
            .ok_or_else(|| IndexError::NotFound(id.to_string()))?;
        self.atomic(self.drop_commands(&member, id).into()).await?;
        debug!(%member, "removed by id");
        Ok(())
    }

    /// Moves an indexed `id` to new `coordinates`.
    ///
    /// The old member and field are dropped and the new ones written in a
    /// single atomic batch.
    ///
    /// # Returns
    ///
    /// `NotFound` when the id is not indexed, or an input error for bad
    /// coordinates. Nothing is written in either case.
    #[instrument(skip(self), level = "debug")]
    pub async fn update(&self, coordinates: &[u64], id: &str) -> IndexResult<()> {
        let member = self.member_string(coordinates, id)?;
        let old = self
            .current_member(id)
            .await?
            .ok_or_else(|| IndexError::NotFound(id.to_string()))?;

        let mut commands: Vec<Command> = self.drop_commands(&old, id).into();
        commands.extend(self.add_commands(&member, id));
        self.atomic(commands).await?;
        debug!(%old, %member, "updated");
        Ok(())
    }

    /// Looks up the stored entry for `id`.
    ///
    /// # Returns
    ///
    /// `None` when the id is missing or its hash entry cannot be parsed.
    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, id: &str) -> IndexResult<Option<IndexEntry>> {
        let Some(member) = self.current_member(id).await? else {
            return Ok(None);
        };
        match parse_member(&member, self.config.dimensions) {
            Some(entry) => Ok(Some(entry)),
            None => {
                warn!(%member, "corrupt hash entry, treating as missing");
                Ok(None)
            }
        }
    }

    /// Normalizes `range` and clips it to the coordinate space.
    ///
    /// Returns `None` when some axis starts beyond the space, in which case
    /// the box holds nothing.
    fn clip(&self, range: &[AxisRange]) -> IndexResult<Option<Vec<AxisRange>>> {
        if range.len() != self.config.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimensions,
                actual: range.len(),
            });
        }

        let max = self.codec.max_coordinate();
        let mut clipped = Vec::with_capacity(range.len());
        for axis in range {
            let axis = axis.normalized();
            if axis.lo > max {
                debug!(?axis, "query box lies outside the coordinate space");
                return Ok(None);
            }
            clipped.push(AxisRange::new(axis.lo, axis.hi.min(max)));
        }
        Ok(Some(clipped))
    }

    /// Returns every entry whose coordinates lie inside `range`.
    ///
    /// Each axis pair may be given in either order; bounds are inclusive.
    /// The cell size is picked so that at most 19 scans are issued.
    ///
    /// # Returns
    ///
    /// The matching entries, each exactly once, in no meaningful order.
    /// Fails with `DimensionMismatch` when `range` has the wrong number of
    /// axes, or with `Store` when the backend fails.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use spatial_index::{AxisRange, IndexConfig, MemoryStore, SpatialIndex};
    /// # use std::sync::Arc;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), spatial_index::IndexError> {
    /// let config = IndexConfig::new(2, "z", "h").with_precision(8);
    /// let index = SpatialIndex::new(Arc::new(MemoryStore::new()), config)?;
    /// index.insert(&[10, 10], "b").await?;
    ///
    /// let hits = index.query(&[AxisRange::new(12, 0), AxisRange::new(0, 12)]).await?;
    /// assert_eq!(hits[0].id, "b");
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), level = "debug")]
    pub async fn query(&self, range: &[AxisRange]) -> IndexResult<Vec<IndexEntry>> {
        let Some(clipped) = self.clip(range)? else {
            return Ok(Vec::new());
        };
        let exp = select_exponent(&clipped);
        self.scan(&clipped, exp).await
    }

    /// Scans the cells of side `2^exp` covering `range` and filters the
    /// members found against the box.
    ///
    /// The box is normalized and clipped like in [`query`](Self::query).
    /// Small exponents on wide boxes issue one scan per cell, so prefer
    /// `query` unless a specific cell size is wanted.
    ///
    /// # Returns
    ///
    /// The same entries `query` would return for `range`. Fails with
    /// `DimensionMismatch` when `range` has the wrong number of axes.
    #[instrument(skip(self), level = "debug")]
    pub async fn query_raw(&self, range: &[AxisRange], exp: u32) -> IndexResult<Vec<IndexEntry>> {
        match self.clip(range)? {
            Some(clipped) => self.scan(&clipped, exp).await,
            None => Ok(Vec::new()),
        }
    }

    async fn scan(&self, range: &[AxisRange], exp: u32) -> IndexResult<Vec<IndexEntry>> {
        let scans = decompose(&self.codec, range, exp);
        let expected = scans.len();
        let commands = scans
            .into_iter()
            .map(|range| Command::RangeByLex {
                key: self.collection(),
                range,
            })
            .collect();

        let replies = self.store.batch(commands, BatchMode::Pipeline).await?;
        let replies = expect_replies(replies, expected)?;

        let mut scanned = 0usize;
        let mut results = Vec::new();
        for reply in replies {
            for member in reply.into_members("ZRANGEBYLEX")? {
                scanned += 1;
                match parse_member(&member, self.config.dimensions) {
                    Some(entry) if entry.within(range) => results.push(entry),
                    Some(_) => {}
                    None => warn!(%member, "skipping corrupt member"),
                }
            }
        }

        debug!(
            exp,
            cells = expected,
            scanned,
            matched = results.len(),
            "query complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn index(dimensions: usize, precision: u32) -> SpatialIndex<MemoryStore> {
        let config = IndexConfig::new(dimensions, "test:z", "test:h").with_precision(precision);
        SpatialIndex::new(Arc::new(MemoryStore::new()), config).unwrap()
    }

    fn boxed(pairs: &[(u64, u64)]) -> Vec<AxisRange> {
        pairs.iter().copied().map(AxisRange::from).collect()
    }

    fn ids(mut entries: Vec<IndexEntry>) -> Vec<String> {
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries.into_iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = IndexConfig::new(0, "z", "h");
        assert!(matches!(
            SpatialIndex::new(Arc::new(MemoryStore::new()), config),
            Err(IndexError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_codec_follows_validated_config() {
        let config = IndexConfig::new(2, "z", "h").with_precision(65);
        assert!(matches!(
            SpatialIndex::new(Arc::new(MemoryStore::new()), config),
            Err(IndexError::InvalidConfig(_))
        ));

        let index = index(2, 64);
        assert_eq!(index.codec().max_coordinate(), u64::MAX);
        assert_eq!(index.codec().key_width(), 32);
        assert!(index.codec().encode(&[u64::MAX, 0]).is_ok());
    }

    #[test]
    fn test_member_string() {
        let index = index(2, 8);
        assert_eq!(index.member_string(&[3, 5], "a").unwrap(), "001b:3:5:a");
    }

    #[tokio::test]
    async fn test_insert_writes_both_structures() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();

        let store = index.store();
        assert_eq!(store.members("test:z").await, vec!["001b:3:5:a"]);
        assert_eq!(
            store.hash_get("test:h", "a").await.unwrap(),
            Some("001b:3:5:a".to_string())
        );
        assert_eq!(index.get("a").await.unwrap(), Some(IndexEntry::new("a", vec![3, 5])));
    }

    #[tokio::test]
    async fn test_concrete_scenario() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();
        index.insert(&[10, 10], "b").await.unwrap();

        let small = index.query(&boxed(&[(0, 8), (0, 8)])).await.unwrap();
        assert_eq!(small, vec![IndexEntry::new("a", vec![3, 5])]);

        let large = index.query(&boxed(&[(0, 12), (0, 12)])).await.unwrap();
        assert_eq!(ids(large), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_query_accepts_reversed_bounds() {
        let index = index(2, 8);
        index.insert(&[10, 10], "b").await.unwrap();
        let hits = index.query(&boxed(&[(12, 9), (10, 10)])).await.unwrap();
        assert_eq!(ids(hits), vec!["b"]);
    }

    #[tokio::test]
    async fn test_query_outside_space() {
        let index = index(2, 8);
        index.insert(&[255, 255], "corner").await.unwrap();

        let clipped = index.query(&boxed(&[(200, 10_000), (255, 300)])).await.unwrap();
        assert_eq!(ids(clipped), vec!["corner"]);

        let beyond = index.query(&boxed(&[(256, 10_000), (0, 255)])).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_remove_cleans_both_structures() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();

        assert!(index.remove(&[3, 5], "a").await.unwrap());
        assert_eq!(index.store().sorted_len("test:z").await, 0);
        assert_eq!(index.store().hash_len("test:h").await, 0);

        // Second removal is a silent no-op
        assert!(!index.remove(&[3, 5], "a").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_with_stale_coordinates_keeps_live_entry() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();

        assert!(!index.remove(&[4, 4], "a").await.unwrap());
        assert_eq!(index.get("a").await.unwrap(), Some(IndexEntry::new("a", vec![3, 5])));
        assert_eq!(index.store().sorted_len("test:z").await, 1);
    }

    #[tokio::test]
    async fn test_remove_by_id() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();
        index.remove_by_id("a").await.unwrap();

        assert!(index.query(&boxed(&[(3, 3), (5, 5)])).await.unwrap().is_empty());
        assert!(matches!(
            index.remove_by_id("a").await,
            Err(IndexError::NotFound(id)) if id == "a"
        ));
    }

    #[tokio::test]
    async fn test_update_moves_entry() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();
        index.update(&[200, 100], "a").await.unwrap();

        assert!(index.query(&boxed(&[(3, 3), (5, 5)])).await.unwrap().is_empty());
        let moved = index.query(&boxed(&[(200, 200), (100, 100)])).await.unwrap();
        assert_eq!(moved, vec![IndexEntry::new("a", vec![200, 100])]);
        assert_eq!(index.store().sorted_len("test:z").await, 1);
        assert_eq!(index.store().hash_len("test:h").await, 1);
    }

    #[tokio::test]
    async fn test_input_errors() {
        let index = index(2, 8);
        assert!(matches!(
            index.insert(&[1, 2, 3], "x").await,
            Err(IndexError::DimensionMismatch { expected: 2, actual: 3 })
        ));
        assert!(matches!(
            index.insert(&[1, 256], "x").await,
            Err(IndexError::CoordinateOutOfRange { axis: 1, .. })
        ));
        assert!(matches!(
            index.update(&[1, 2], "missing").await,
            Err(IndexError::NotFound(_))
        ));
        assert!(matches!(
            index.update(&[1], "missing").await,
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.query(&boxed(&[(0, 1)])).await,
            Err(IndexError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert_eq!(index.store().sorted_len("test:z").await, 0);
    }

    #[tokio::test]
    async fn test_query_raw_checks_its_box() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();

        assert!(matches!(
            index.query_raw(&boxed(&[(0, 8)]), 4).await,
            Err(IndexError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            index.query_raw(&[], 4).await,
            Err(IndexError::DimensionMismatch { expected: 2, actual: 0 })
        ));

        let reversed = index.query_raw(&boxed(&[(8, 2), (9, 0)]), 0).await.unwrap();
        assert_eq!(ids(reversed), vec!["a"]);
        let clipped = index.query_raw(&boxed(&[(0, 1 << 40), (5, 5)]), 6).await.unwrap();
        assert_eq!(ids(clipped), vec!["a"]);
        assert!(index.query_raw(&boxed(&[(300, 400), (0, 8)]), 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_members_are_skipped() {
        let index = index(2, 8);
        index.insert(&[3, 5], "a").await.unwrap();
        index
            .store()
            .sorted_insert("test:z", "001b:garbage")
            .await
            .unwrap();
        index.store().hash_set("test:h", "bad", "nonsense").await.unwrap();

        let hits = index.query(&boxed(&[(0, 8), (0, 8)])).await.unwrap();
        assert_eq!(ids(hits), vec!["a"]);
        assert_eq!(index.get("bad").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_raw_matches_query_at_any_exponent() {
        let index = index(2, 8);
        for (i, (x, y)) in [(1, 1), (7, 30), (64, 64), (100, 3), (250, 250)].iter().enumerate() {
            index.insert(&[*x, *y], &format!("e{i}")).await.unwrap();
        }
        let range = boxed(&[(0, 120), (0, 70)]);
        let expected = ids(index.query(&range).await.unwrap());
        assert_eq!(expected, vec!["e0", "e1", "e2", "e3"]);

        for exp in 0..=8 {
            assert_eq!(ids(index.query_raw(&range, exp).await.unwrap()), expected, "exp {exp}");
        }
    }
}
