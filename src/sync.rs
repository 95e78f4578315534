//! Paginated fetching of the land grid.
//!
//! The remote gateway tolerates a burst of ~one page of concurrent reads;
//! anything more starts returning rate-limit errors. So the engine walks
//! the id space in fixed-size pages, fans out one read per id inside a
//! page, reconciles successes into the [`LandStore`], and waits a settle
//! delay before the next page. Per-id failures never abort their siblings;
//! they are retried (alone) a bounded number of times and then reported.

use crate::{
    store::LandStore,
    sync::land_source::{
        LandSource,
        ReadError,
    },
    types::{
        LandRecord,
        SyncConfig,
    },
};
use futures::future::join_all;
use itertools::Itertools;
use std::fmt;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{
    debug,
    warn,
};

pub mod land_source;


/// Issue one concurrent read per id and wait for all of them. Results come
/// back in issue order; completion order does not matter because each
/// record is an independent snapshot.
pub async fn fan_out<S: LandSource>(
    source: &S,
    ids: &[u64],
) -> Vec<(u64, Result<LandRecord, ReadError>)> {
    let reads = ids.iter().map(|id| {
        let id = *id;
        async move { (id, source.land(id).await) }
    });
    join_all(reads).await
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    /// Every id in the page is now in the store.
    AllLoaded,
    /// Some ids failed all their retries; they stay absent ("loading")
    /// until a later refresh. Fewer than half failed, so this does not
    /// block progress.
    PartiallyLoaded,
    /// Half or more of the page failed; auto-advance halts and the caller
    /// decides whether to retry or reset.
    MajorityFailed,
}

#[derive(Clone, Debug)]
pub struct PageReport {
    /// Page index for scheduled fetches, `None` for targeted refreshes.
    pub page: Option<usize>,
    pub requested: usize,
    pub loaded: usize,
    /// How many merges actually changed the store.
    pub changed: usize,
    pub failed: Vec<u64>,
    pub attempts: u32,
    pub outcome: PageOutcome,
}

impl fmt::Display for PageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "page {page}: ")?,
            None => write!(f, "targeted refresh: ")?,
        }
        write!(
            f,
            "{}/{} loaded, {} changed, {} attempt(s)",
            self.loaded, self.requested, self.changed, self.attempts
        )?;
        if !self.failed.is_empty() {
            write!(f, ", failed ids [{}]", self.failed.iter().join(", "))?;
        }
        Ok(())
    }
}

fn classify(requested: usize, failed: usize) -> PageOutcome {
    if failed == 0 {
        PageOutcome::AllLoaded
    } else if failed * 2 >= requested {
        PageOutcome::MajorityFailed
    } else {
        PageOutcome::PartiallyLoaded
    }
}

/// Fetches pages or arbitrary id sets through a [`LandSource`] and merges
/// the results into the store.
pub struct BatchFetcher<S> {
    source: S,
    store: LandStore,
    config: SyncConfig,
}

impl<S: LandSource> BatchFetcher<S> {
    pub fn new(source: S, store: LandStore, config: SyncConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn store(&self) -> &LandStore {
        &self.store
    }

    pub async fn fetch_page(&self, page: usize) -> PageReport {
        let ids = self.config.page_ids(page);
        self.fetch_ids(Some(page), ids).await
    }

    /// Targeted refresh for specific plots, e.g. from the expiry watcher.
    pub async fn fetch_lands(&self, ids: Vec<u64>) -> PageReport {
        self.fetch_ids(None, ids).await
    }

    async fn fetch_ids(&self, page: Option<usize>, ids: Vec<u64>) -> PageReport {
        // Results merge under the generation current at issue time; if a
        // reset happens mid-flight they land as Stale no-ops.
        let generation = self.store.generation();
        let requested = ids.len();
        let mut pending = ids;
        let mut loaded = 0usize;
        let mut changed = 0usize;
        let mut attempts = 0u32;
        let mut rate_limited = false;

        while !pending.is_empty() && attempts < self.config.max_retries.max(1) {
            if attempts > 0 {
                // Re-issue only the failed reads, after letting the
                // gateway breathe; twice as long if it told us to back off.
                let pause = if rate_limited {
                    self.config.settle_delay * 2
                } else {
                    self.config.settle_delay
                };
                time::sleep(pause).await;
            }
            attempts += 1;
            rate_limited = false;

            let results = fan_out(&self.source, &pending).await;
            let mut failed = Vec::new();
            for (id, result) in results {
                match result {
                    Ok(record) => {
                        loaded += 1;
                        if self.store.merge(generation, id, record).changed() {
                            changed += 1;
                        }
                    }
                    Err(err) => {
                        warn!(land = id, %err, "land read failed");
                        if err.is_rate_limit() {
                            rate_limited = true;
                        }
                        failed.push(id);
                    }
                }
            }
            pending = failed;
        }

        let outcome = classify(requested, pending.len());
        PageReport {
            page,
            requested,
            loaded,
            changed,
            failed: pending,
            attempts,
            outcome,
        }
    }
}

#[derive(Debug)]
pub enum SyncCommand {
    RefreshPage(usize),
    RefreshLands(Vec<u64>),
    /// Clear the store and restart auto-advance from page zero.
    RefreshAll,
    Shutdown,
}

#[derive(Debug)]
pub enum SyncEvent {
    Page(PageReport),
    AutoAdvanceHalted { page: usize },
}

/// Clonable command surface for the running engine; the expiry watcher
/// holds one of these.
#[derive(Clone)]
pub struct SyncCommander {
    commands: mpsc::UnboundedSender<SyncCommand>,
}

impl SyncCommander {
    pub fn refresh_page(&self, page: usize) {
        let _ = self.commands.send(SyncCommand::RefreshPage(page));
    }

    pub fn refresh_lands(&self, ids: Vec<u64>) {
        let _ = self.commands.send(SyncCommand::RefreshLands(ids));
    }

    pub fn refresh_all(&self) {
        let _ = self.commands.send(SyncCommand::RefreshAll);
    }
}

pub struct SyncHandle {
    commander: SyncCommander,
    task: JoinHandle<()>,
}

impl SyncHandle {
    pub fn commander(&self) -> SyncCommander {
        self.commander.clone()
    }

    pub async fn shutdown(self) {
        let _ = self.commander.commands.send(SyncCommand::Shutdown);
        let _ = self.task.await;
    }
}

pub struct SyncEngine;

impl SyncEngine {
    /// Spawn the fetch worker. It immediately starts auto-advancing from
    /// page zero; commands interleave between pages.
    pub fn spawn<S: LandSource + 'static>(
        source: S,
        store: LandStore,
        config: SyncConfig,
    ) -> (SyncHandle, mpsc::UnboundedReceiver<SyncEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let fetcher = BatchFetcher::new(source, store, config.clone());
        let task = tokio::spawn(sync_worker(fetcher, config, cmd_rx, event_tx));
        let handle = SyncHandle {
            commander: SyncCommander { commands: cmd_tx },
            task,
        };
        (handle, event_rx)
    }
}

async fn sync_worker<S: LandSource>(
    fetcher: BatchFetcher<S>,
    config: SyncConfig,
    mut commands: mpsc::UnboundedReceiver<SyncCommand>,
    events: mpsc::UnboundedSender<SyncEvent>,
) {
    let mut next_page: Option<usize> = Some(0);
    loop {
        // While auto-advance is active, only drain commands that are
        // already queued; otherwise block until one arrives.
        let command = match next_page {
            Some(page) => match commands.try_recv() {
                Ok(command) => command,
                Err(mpsc::error::TryRecvError::Empty) => {
                    let report = fetcher.fetch_page(page).await;
                    let outcome = report.outcome;
                    debug!(%report, "page fetch complete");
                    let _ = events.send(SyncEvent::Page(report));
                    if outcome == PageOutcome::MajorityFailed {
                        warn!(page, "majority of page failed, halting auto-advance");
                        let _ = events.send(SyncEvent::AutoAdvanceHalted { page });
                        next_page = None;
                    } else {
                        next_page =
                            (page + 1 < config.total_pages()).then_some(page + 1);
                        if next_page.is_some() {
                            time::sleep(config.settle_delay).await;
                        }
                    }
                    continue;
                }
                Err(mpsc::error::TryRecvError::Disconnected) => return,
            },
            None => match commands.recv().await {
                Some(command) => command,
                None => return,
            },
        };

        match command {
            SyncCommand::RefreshPage(page) => {
                let report = fetcher.fetch_page(page).await;
                let _ = events.send(SyncEvent::Page(report));
            }
            SyncCommand::RefreshLands(ids) => {
                let report = fetcher.fetch_lands(ids).await;
                let _ = events.send(SyncEvent::Page(report));
            }
            SyncCommand::RefreshAll => {
                fetcher.store().reset();
                next_page = Some(0);
            }
            SyncCommand::Shutdown => return,
        }
    }
}
