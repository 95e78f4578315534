//! Client-side state synchronization and simulation engine for the land
//! farming game.
//!
//! The ledger is the source of truth but only answers one rate-limited
//! read at a time, so the crate keeps a best-effort local cache of every
//! plot: [`sync`] fetches the grid page by page, [`store`] reconciles
//! fetched records so consumers only react to real changes, [`expiry`]
//! notices cooldowns that lapsed with no notification, and [`sim`] /
//! [`eligibility`] recompute the derived quantities (weather, growth,
//! action validity) on read instead of caching them.

pub mod eligibility;
pub mod expiry;
pub mod gateway;
pub mod sim;
pub mod store;
pub mod sync;
pub mod types;

pub use eligibility::{
    Eligibility,
    LandAction,
    can_perform,
};
pub use expiry::ExpiryWatcher;
pub use gateway::FarmGateway;
pub use store::{
    LandStore,
    MergeOutcome,
};
pub use sync::{
    PageOutcome,
    SyncEngine,
    SyncEvent,
    SyncHandle,
    land_source::{
        IdleStatusWriter,
        LandSource,
        ReadError,
    },
};
pub use types::{
    FarmerAddress,
    LandRecord,
    LandState,
    SeedInfo,
    SimParams,
    SyncConfig,
};

pub type Result<T> = color_eyre::eyre::Result<T>;
