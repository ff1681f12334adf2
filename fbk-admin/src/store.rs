//! Review store - single source of truth for the admin view
//!
//! Ordered collection keyed by review id with two mutation points:
//! - `replace_all`: bulk load result, sorted newest-first
//! - `upsert_front`: live push, prepended without re-sorting
//!
//! Every mutation builds the next snapshot under the write lock and swaps it
//! in whole, so readers holding a `StoreSnapshot` never see a partial merge.
//! After each mutation the revision published on `subscribe()` advances.
//!
//! A record arriving with an id that is already stored is treated as an
//! annotation update: AI fields missing on the stored copy are filled in,
//! its position and every other field are kept.

use fbk_common::{Error, Result, ReviewId, ReviewRecord};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::debug;

use crate::analytics::{Analytics, StarTally};

/// Which channel delivered a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    Bulk,
    Live,
}

/// Result of `upsert_front`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New id, placed at the head
    Inserted,
    /// Known id, missing AI fields filled in place
    Annotated,
    /// Known id, nothing to change
    Duplicate,
}

/// Newest `created_at` first; records without a timestamp sort last
pub fn newest_first(a: &ReviewRecord, b: &ReviewRecord) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable newest-first sort; ties keep their current order
pub fn sort_newest_first(records: &mut [ReviewRecord]) {
    records.sort_by(newest_first);
}

/// Immutable view of the store at one revision
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    records: Arc<Vec<ReviewRecord>>,
    revision: u64,
    tally: StarTally,
}

impl StoreSnapshot {
    /// Records in presentation order
    pub fn records(&self) -> &[ReviewRecord] {
        &self.records
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: ReviewId) -> Option<&ReviewRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn ids(&self) -> Vec<ReviewId> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Incrementally maintained counters for this revision
    pub fn tally(&self) -> &StarTally {
        &self.tally
    }

    pub fn analytics(&self) -> Analytics {
        Analytics::from_tally(&self.tally)
    }
}

struct StoreState {
    snapshot: StoreSnapshot,
    origins: HashMap<ReviewId, RecordOrigin>,
    closed: bool,
}

/// Injectable, observable review container shared by loader and subscriber
pub struct ReviewStore {
    state: RwLock<StoreState>,
    revision_tx: watch::Sender<u64>,
}

impl ReviewStore {
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            state: RwLock::new(StoreState {
                snapshot: StoreSnapshot::default(),
                origins: HashMap::new(),
                closed: false,
            }),
            revision_tx,
        }
    }

    /// Current contents; cheap (shares the record vector)
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.read()?.snapshot.clone())
    }

    /// Current contents re-sorted newest-first (stable), without touching the store
    pub fn sorted_snapshot(&self) -> Result<Vec<ReviewRecord>> {
        let mut records = self.read()?.snapshot.records.to_vec();
        sort_newest_first(&mut records);
        Ok(records)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.snapshot.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.snapshot.is_empty())
    }

    pub fn contains(&self, id: ReviewId) -> Result<bool> {
        Ok(self.read()?.origins.contains_key(&id))
    }

    pub fn origin(&self, id: ReviewId) -> Result<Option<RecordOrigin>> {
        Ok(self.read()?.origins.get(&id).copied())
    }

    /// Revision receiver; changes after every mutation
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.read().map(|state| state.closed).unwrap_or(true)
    }

    /// Tear the store down; later mutations fail with `Error::TornDown`
    pub fn close(&self) {
        if let Ok(mut state) = self.state.write() {
            state.closed = true;
        }
        debug!("Review store closed");
    }

    /// Install a bulk listing
    ///
    /// The payload is sorted newest-first (first occurrence wins for repeated
    /// ids). Live records that the payload does not contain stay at the front
    /// in their current order, so a push that raced ahead of the load is not
    /// lost. Annotations already held for a returning id are kept if the
    /// payload lacks them.
    pub fn replace_all(&self, records: Vec<ReviewRecord>) -> Result<StoreSnapshot> {
        let mut state = self.write()?;
        ensure_open(&state)?;

        let mut seen = HashSet::with_capacity(records.len());
        let mut incoming: Vec<ReviewRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.id))
            .collect();
        sort_newest_first(&mut incoming);

        let current = Arc::clone(&state.snapshot.records);
        let current_by_id: HashMap<ReviewId, &ReviewRecord> =
            current.iter().map(|r| (r.id, r)).collect();

        for record in incoming.iter_mut() {
            if let Some(existing) = current_by_id.get(&record.id) {
                record.merge_annotation(existing);
            }
        }

        let carried: Vec<ReviewRecord> = current
            .iter()
            .filter(|r| state.origins.get(&r.id) == Some(&RecordOrigin::Live))
            .filter(|r| !seen.contains(&r.id))
            .cloned()
            .collect();

        let mut origins = HashMap::with_capacity(carried.len() + incoming.len());
        origins.extend(carried.iter().map(|r| (r.id, RecordOrigin::Live)));
        origins.extend(incoming.iter().map(|r| (r.id, RecordOrigin::Bulk)));

        debug!(
            loaded = incoming.len(),
            carried_live = carried.len(),
            "Replacing review store contents"
        );

        let mut next = carried;
        next.extend(incoming);

        state.origins = origins;
        let snapshot = self.publish(&mut state, next);
        Ok(snapshot)
    }

    /// Merge one pushed record
    ///
    /// Unknown id: inserted at the head regardless of `created_at`.
    /// Known id: annotation merge, or no-op if nothing is missing.
    pub fn upsert_front(&self, record: ReviewRecord) -> Result<UpsertOutcome> {
        let mut state = self.write()?;
        ensure_open(&state)?;

        if state.origins.contains_key(&record.id) {
            let position = state.snapshot.records.iter().position(|r| r.id == record.id);
            let needs_merge = position
                .map(|i| state.snapshot.records[i].clone().merge_annotation(&record))
                .unwrap_or(false);

            if !needs_merge {
                debug!(review_id = %record.id, "Duplicate review ignored");
                return Ok(UpsertOutcome::Duplicate);
            }

            let mut next = state.snapshot.records.to_vec();
            if let Some(i) = position {
                next[i].merge_annotation(&record);
            }
            let tally = state.snapshot.tally;
            self.publish_with_tally(&mut state, next, tally);

            debug!(review_id = %record.id, "Review annotation updated in place");
            return Ok(UpsertOutcome::Annotated);
        }

        let mut tally = state.snapshot.tally;
        tally.record(&record);

        let mut next = Vec::with_capacity(state.snapshot.len() + 1);
        next.push(record.clone());
        next.extend(state.snapshot.records.iter().cloned());

        state.origins.insert(record.id, RecordOrigin::Live);
        self.publish_with_tally(&mut state, next, tally);

        debug!(review_id = %record.id, business = %record.business_name, "Review prepended");
        Ok(UpsertOutcome::Inserted)
    }

    fn publish(&self, state: &mut StoreState, records: Vec<ReviewRecord>) -> StoreSnapshot {
        let tally = StarTally::from_records(&records);
        self.publish_with_tally(state, records, tally)
    }

    fn publish_with_tally(
        &self,
        state: &mut StoreState,
        records: Vec<ReviewRecord>,
        tally: StarTally,
    ) -> StoreSnapshot {
        let revision = state.snapshot.revision + 1;
        state.snapshot = StoreSnapshot {
            records: Arc::new(records),
            revision,
            tally,
        };
        self.revision_tx.send_replace(revision);
        state.snapshot.clone()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| Error::Internal("review store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| Error::Internal("review store lock poisoned".to_string()))
    }
}

impl Default for ReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(state: &StoreState) -> Result<()> {
    if state.closed {
        Err(Error::TornDown("review store".to_string()))
    } else {
        Ok(())
    }
}
