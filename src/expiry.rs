//! Detects cooldowns that have silently elapsed.
//!
//! The ledger emits no notification when a `LockedIdle` plot's cooldown
//! passes; worse, the remote state itself only advances after an explicit
//! recompute call. Without this watcher a freed plot would look locked
//! forever, until some unrelated refresh happened to re-read it. The
//! watcher is best-effort: a missed tick delays detection by at most one
//! interval and never produces incorrect state, only staleness.

use crate::{
    store::LandStore,
    sync::{
        SyncCommander,
        land_source::IdleStatusWriter,
    },
    types::{
        LandState,
        unix_now,
    },
};
use itertools::Itertools;
use std::time::Duration;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time,
};
use tracing::{
    debug,
    warn,
};

/// Plots whose cached state is `LockedIdle` but whose cooldown has already
/// passed at `now`. Pure scan, no side effects.
pub fn due_for_recheck(store: &LandStore, now: u64) -> Vec<u64> {
    store
        .lands_in_state(LandState::LockedIdle)
        .into_iter()
        .filter(|(_, record)| record.cooldown_elapsed(now))
        .map(|(id, _)| id)
        .collect()
}

/// A cancellable periodic job wrapping the scan. Owns its task; dropping
/// the watcher without calling [`ExpiryWatcher::stop`] aborts it.
pub struct ExpiryWatcher {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ExpiryWatcher {
    pub fn spawn<W: IdleStatusWriter + 'static>(
        store: LandStore,
        commander: SyncCommander,
        writer: W,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(watch_loop(
            store,
            commander,
            writer,
            interval,
            shutdown_rx,
        ));
        Self {
            shutdown: shutdown_tx,
            task,
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

async fn watch_loop<W: IdleStatusWriter>(
    store: LandStore,
    commander: SyncCommander,
    writer: W,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let due = due_for_recheck(&store, unix_now());
                if due.is_empty() {
                    continue;
                }
                debug!(lands = %due.iter().join(", "), "cooldowns elapsed, requesting recheck");
                // Nudge the ledger first so the targeted re-read can
                // observe the Idle transition. Failure here is tolerable;
                // the next tick tries again.
                if let Err(err) = writer.recompute_idle_status().await {
                    warn!(%err, "idle status recompute failed");
                }
                commander.refresh_lands(due);
            }
        }
    }
}
