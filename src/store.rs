//! The single source of truth for what the client currently believes about
//! each plot.
//!
//! All writes go through [`LandStore::merge`] and [`LandStore::reset`];
//! every other component reads. Merging diffs the incoming record against
//! the cached one and only counts as a change when a field actually
//! differs, which keeps consumers that react to change notifications from
//! re-rendering on redundant fetches.

use crate::types::{
    LandRecord,
    LandState,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Instant,
};

/// Token capturing which "epoch" of the cache a fetch was issued against.
/// A [`LandStore::reset`] bumps the generation, so results still in flight
/// from before the reset are recognised and dropped on arrival.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First record observed for this id.
    Inserted,
    /// At least one field differed; the record was replaced.
    Updated,
    /// Identical to the cached record; observable no-op.
    Unchanged,
    /// Issued before the last reset; silently dropped.
    Stale,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, MergeOutcome::Inserted | MergeOutcome::Updated)
    }
}

#[derive(Clone)]
pub struct LandStore {
    inner: Arc<Mutex<StoreInner>>,
}

struct StoreInner {
    records: HashMap<u64, LandRecord>,
    generation: u64,
    change_count: u64,
    last_changed: Option<Instant>,
}

impl LandStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                records: HashMap::new(),
                generation: 0,
                change_count: 0,
                last_changed: None,
            })),
        }
    }

    pub fn generation(&self) -> Generation {
        Generation(self.inner.lock().unwrap().generation)
    }

    /// Reconcile a freshly fetched record into the cache. `generation` must be the
    /// generation captured when the read was issued.
    pub fn merge(&self, generation: Generation, id: u64, record: LandRecord) -> MergeOutcome {
        let mut inner = self.inner.lock().unwrap();
        if generation.0 != inner.generation {
            return MergeOutcome::Stale;
        }
        let outcome = match inner.records.get(&id) {
            None => MergeOutcome::Inserted,
            Some(existing) if *existing == record => return MergeOutcome::Unchanged,
            Some(_) => MergeOutcome::Updated,
        };
        inner.records.insert(id, record);
        inner.change_count += 1;
        inner.last_changed = Some(Instant::now());
        outcome
    }

    pub fn get(&self, id: u64) -> Option<LandRecord> {
        self.inner.lock().unwrap().records.get(&id).cloned()
    }

    /// Known records among `ids`, in id order. Absent entries are simply
    /// omitted; callers treat absence as "still loading", not as an error.
    pub fn get_page(&self, ids: &[u64]) -> Vec<(u64, LandRecord)> {
        let inner = self.inner.lock().unwrap();
        ids.iter()
            .filter_map(|id| inner.records.get(id).map(|r| (*id, r.clone())))
            .collect()
    }

    pub fn lands_in_state(&self, state: LandState) -> Vec<(u64, LandRecord)> {
        let inner = self.inner.lock().unwrap();
        let mut lands: Vec<_> = inner
            .records
            .iter()
            .filter(|(_, r)| r.state == state)
            .map(|(id, r)| (*id, r.clone()))
            .collect();
        lands.sort_by_key(|(id, _)| *id);
        lands
    }

    /// Full manual refresh: drop every record and invalidate all in-flight
    /// results by bumping the generation.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.records.clear();
        inner.generation += 1;
        inner.change_count = 0;
        inner.last_changed = None;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many merges actually changed something since the last reset.
    pub fn change_count(&self) -> u64 {
        self.inner.lock().unwrap().change_count
    }

    pub fn last_changed(&self) -> Option<Instant> {
        self.inner.lock().unwrap().last_changed
    }
}

impl Default for LandStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        FarmerAddress,
        LandState,
    };

    fn record(state: LandState, growth: u64) -> LandRecord {
        LandRecord {
            state,
            seed_token_id: None,
            claim_time: 100,
            cooldown_end_time: 0,
            weather_seed: 5,
            last_weather_update_time: 100,
            accumulated_growth: growth,
            current_farmer: Some(FarmerAddress::new([1u8; 20])),
        }
    }

    #[test]
    fn merge__same_record_twice__second_is_unchanged() {
        let store = LandStore::new();
        let generation = store.generation();

        let first = store.merge(generation, 3, record(LandState::Growing, 10));
        let second = store.merge(generation, 3, record(LandState::Growing, 10));

        assert_eq!(first, MergeOutcome::Inserted);
        assert_eq!(second, MergeOutcome::Unchanged);
        assert_eq!(store.change_count(), 1);
    }

    #[test]
    fn merge__single_field_differs__updates() {
        let store = LandStore::new();
        let generation = store.generation();
        store.merge(generation, 3, record(LandState::Growing, 10));

        let outcome = store.merge(generation, 3, record(LandState::Growing, 11));

        assert_eq!(outcome, MergeOutcome::Updated);
        assert_eq!(store.get(3).unwrap().accumulated_growth, 11);
    }

    #[test]
    fn merge__after_reset__stale_result_is_dropped() {
        let store = LandStore::new();
        let generation = store.generation();
        store.merge(generation, 3, record(LandState::Growing, 10));

        store.reset();
        let outcome = store.merge(generation, 4, record(LandState::Idle, 0));

        assert_eq!(outcome, MergeOutcome::Stale);
        assert!(store.is_empty());
    }

    #[test]
    fn get_page__unfetched_ids__are_omitted() {
        let store = LandStore::new();
        let generation = store.generation();
        store.merge(generation, 1, record(LandState::Idle, 0));
        store.merge(generation, 3, record(LandState::Ripe, 3_600));

        let page = store.get_page(&[0, 1, 2, 3]);

        let ids: Vec<u64> = page.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn lands_in_state__filters_and_sorts_by_id() {
        let store = LandStore::new();
        let generation = store.generation();
        store.merge(generation, 9, record(LandState::LockedIdle, 0));
        store.merge(generation, 2, record(LandState::LockedIdle, 0));
        store.merge(generation, 5, record(LandState::Growing, 50));

        let locked = store.lands_in_state(LandState::LockedIdle);

        let ids: Vec<u64> = locked.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![2, 9]);
    }
}
