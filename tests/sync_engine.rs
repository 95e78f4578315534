//! End-to-end tests: engine + store + expiry watcher against an
//! in-process fake ledger.

use farm_client::{
    ExpiryWatcher,
    IdleStatusWriter,
    LandRecord,
    LandSource,
    LandState,
    LandStore,
    ReadError,
    SyncConfig,
    SyncEngine,
    SyncEvent,
    types::unix_now,
};
use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

/// Fake remote ledger holding the authoritative land map. Implements both
/// the read port and the idle-recompute write port; the recompute flips
/// cooled-down plots to idle the way the real contract does.
#[derive(Clone)]
struct FakeLedger {
    lands: Arc<Mutex<HashMap<u64, LandRecord>>>,
}

impl FakeLedger {
    fn new(total: u64) -> Self {
        let lands = (0..total)
            .map(|id| {
                (
                    id,
                    LandRecord {
                        state: LandState::Idle,
                        seed_token_id: None,
                        claim_time: 0,
                        cooldown_end_time: 0,
                        weather_seed: u128::from(id) + 1,
                        last_weather_update_time: 0,
                        accumulated_growth: 0,
                        current_farmer: None,
                    },
                )
            })
            .collect();
        Self {
            lands: Arc::new(Mutex::new(lands)),
        }
    }

    fn set_state(&self, id: u64, state: LandState, cooldown_end_time: u64) {
        let mut lands = self.lands.lock().unwrap();
        if let Some(land) = lands.get_mut(&id) {
            land.state = state;
            land.cooldown_end_time = cooldown_end_time;
        }
    }

    fn state_of(&self, id: u64) -> Option<LandState> {
        self.lands.lock().unwrap().get(&id).map(|land| land.state)
    }
}

impl LandSource for FakeLedger {
    async fn land(&self, id: u64) -> Result<LandRecord, ReadError> {
        self.lands
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ReadError::NotFound(id))
    }
}

impl IdleStatusWriter for FakeLedger {
    async fn recompute_idle_status(&self) -> Result<(), ReadError> {
        let now = unix_now();
        let mut lands = self.lands.lock().unwrap();
        for land in lands.values_mut() {
            if land.state == LandState::LockedIdle && land.cooldown_end_time <= now {
                land.state = LandState::Idle;
            }
        }
        Ok(())
    }
}

fn fast_config(total_lands: u64) -> SyncConfig {
    SyncConfig {
        total_lands,
        page_size: 20,
        max_retries: 3,
        settle_delay: Duration::from_millis(1),
        expiry_poll_interval: Duration::from_millis(50),
    }
}

#[tokio::test(start_paused = true)]
async fn full_grid__auto_advance__converges_to_all_lands_cached() {
    let ledger = FakeLedger::new(100);
    let store = LandStore::new();
    let (handle, mut events) =
        SyncEngine::spawn(ledger, store.clone(), fast_config(100));

    let mut pages = 0;
    while pages < 5 {
        match events.recv().await {
            Some(SyncEvent::Page(_)) => pages += 1,
            Some(other) => panic!("unexpected event {other:?}"),
            None => panic!("engine stopped early"),
        }
    }

    assert_eq!(store.len(), 100);
    // A second full pass over the unchanged ledger must not register
    // changes.
    let changes = store.change_count();
    for page in 0..5 {
        handle.commander().refresh_page(page);
    }
    for _ in 0..5 {
        events.recv().await;
    }
    assert_eq!(store.change_count(), changes);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn expired_cooldown__watcher__recomputes_and_refreshes_the_plot() {
    let now = unix_now();
    let ledger = FakeLedger::new(40);
    // Plot 7 finished its cooldown a second ago, but the ledger still says
    // LockedIdle until someone calls the recompute.
    ledger.set_state(7, LandState::LockedIdle, now.saturating_sub(1));

    let store = LandStore::new();
    let config = fast_config(40);
    let (handle, mut events) =
        SyncEngine::spawn(ledger.clone(), store.clone(), config.clone());

    // Initial sweep caches the stale LockedIdle record.
    let mut pages = 0;
    while pages < 2 {
        if let Some(SyncEvent::Page(_)) = events.recv().await {
            pages += 1;
        }
    }
    assert_eq!(store.get(7).unwrap().state, LandState::LockedIdle);

    let watcher = ExpiryWatcher::spawn(
        store.clone(),
        handle.commander(),
        ledger.clone(),
        config.expiry_poll_interval,
    );

    // The watcher's targeted refresh lands as an unscheduled page report.
    loop {
        match events.recv().await {
            Some(SyncEvent::Page(report)) if report.page.is_none() => break,
            Some(_) => {}
            None => panic!("engine stopped early"),
        }
    }

    assert_eq!(ledger.state_of(7), Some(LandState::Idle));
    assert_eq!(store.get(7).unwrap().state, LandState::Idle);

    watcher.stop().await;
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reset_mid_flight__stale_results__never_repopulate_the_store() {
    let ledger = FakeLedger::new(20);
    let store = LandStore::new();

    // Capture the generation, fetch under it, then reset before merging
    // would happen again: the old-generation merge must be dropped.
    let generation = store.generation();
    let record = LandSource::land(&ledger, 3).await.unwrap();
    store.reset();

    let outcome = store.merge(generation, 3, record);

    assert_eq!(outcome, farm_client::MergeOutcome::Stale);
    assert!(store.is_empty());
}
