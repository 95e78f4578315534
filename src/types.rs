use std::{
    fmt,
    str::FromStr,
    time::{
        Duration,
        SystemTime,
        UNIX_EPOCH,
    },
};

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Lifecycle of a single plot as reported by the ledger.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LandState {
    Idle,
    Growing,
    Ripe,
    Stealing,
    /// Cooling down after a harvest or steal. The remote truth flips back to
    /// `Idle` once the cooldown elapses, but only after an explicit
    /// recompute call; the local cache lags until the expiry watcher
    /// triggers a refresh.
    LockedIdle,
}

/// Everything we track per plot. Mirrors the on-chain land struct
/// one-to-one so a fetched record is a complete snapshot, never a delta.
///
/// The derived `PartialEq` is the field-by-field comparison that
/// reconciliation uses to decide whether a fetch actually changed anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LandRecord {
    pub state: LandState,
    /// Token id of the planted seed; `None` when nothing is planted.
    pub seed_token_id: Option<u64>,
    /// Unix seconds when the current occupant claimed the plot.
    pub claim_time: u64,
    /// Unix seconds; meaningful while `state == LockedIdle`.
    pub cooldown_end_time: u64,
    /// Opaque seed feeding the deterministic weather formula.
    pub weather_seed: u128,
    pub last_weather_update_time: u64,
    /// Monotone growth counter, conceptually capped at
    /// [`SimParams::growth_requirement`]. May transiently overshoot.
    pub accumulated_growth: u64,
    /// `None` when the plot has no occupant (zero address on chain).
    pub current_farmer: Option<FarmerAddress>,
}

impl LandRecord {
    pub fn occupied_by(&self, farmer: &FarmerAddress) -> bool {
        self.current_farmer.as_ref() == Some(farmer)
    }

    /// True when the record claims to still be cooling down but wall-clock
    /// time has already passed the cooldown end.
    pub fn cooldown_elapsed(&self, now: u64) -> bool {
        self.state == LandState::LockedIdle && self.cooldown_end_time <= now
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CropKind {
    Wheat,
    Corn,
    Pumpkin,
    Strawberry,
    Grape,
    Watermelon,
}

impl CropKind {
    /// Unboosted seconds from planting to maturity.
    pub fn base_growth_duration(&self) -> u64 {
        match self {
            CropKind::Wheat => 3_600,
            CropKind::Corn => 5_400,
            CropKind::Pumpkin => 7_200,
            CropKind::Strawberry => 4_500,
            CropKind::Grape => 6_000,
            CropKind::Watermelon => 6_600,
        }
    }

    pub fn rarity(&self) -> Rarity {
        match self {
            CropKind::Wheat | CropKind::Corn | CropKind::Pumpkin => Rarity::Common,
            CropKind::Strawberry | CropKind::Grape | CropKind::Watermelon => {
                Rarity::Rare
            }
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            CropKind::Wheat => "🌾",
            CropKind::Corn => "🌽",
            CropKind::Pumpkin => "🎃",
            CropKind::Strawberry => "🍓",
            CropKind::Grape => "🍇",
            CropKind::Watermelon => "🍉",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rarity {
    Common,
    Rare,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GrowthStage {
    Seed,
    Growing,
    Mature,
}

/// A seed NFT's own lifecycle, fetched on demand for display; the sync
/// engine itself only tracks lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedInfo {
    pub crop_kind: CropKind,
    pub rarity: Rarity,
    pub growth_stage: GrowthStage,
    pub growth_start_time: u64,
    pub base_growth_duration: u64,
    pub matured_at: u64,
    /// Bounded by [`MAX_BOOSTERS_PER_CROP`].
    pub boosters_applied: u8,
}

pub const MAX_BOOSTERS_PER_CROP: u8 = 10;

/// 20-byte account address, displayed and parsed as `0x…` hex.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FarmerAddress([u8; 20]);

impl FarmerAddress {
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for FarmerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for FarmerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FarmerAddress({self})")
    }
}

impl FromStr for FarmerAddress {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(stripped, &mut bytes)?;
        Ok(Self(bytes))
    }
}

/// Knobs for the fetch scheduler and expiry watcher. Defaults match the
/// reference deployment: 100 plots fetched in pages of 20.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub total_lands: u64,
    pub page_size: usize,
    /// Attempts per page; a retry re-issues only the reads that failed.
    pub max_retries: u32,
    /// Pause between pages and between retry attempts, to stay under the
    /// gateway's rate limit.
    pub settle_delay: Duration,
    pub expiry_poll_interval: Duration,
}

impl SyncConfig {
    pub fn total_pages(&self) -> usize {
        let total = self.total_lands as usize;
        total.div_ceil(self.page_size.max(1))
    }

    /// Ids covered by the given page, clipped to the land count.
    pub fn page_ids(&self, page: usize) -> Vec<u64> {
        let start = (page * self.page_size) as u64;
        let end = ((page + 1) * self.page_size) as u64;
        (start..end.min(self.total_lands)).collect()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            total_lands: 100,
            page_size: 20,
            max_retries: 3,
            settle_delay: Duration::from_millis(500),
            expiry_poll_interval: Duration::from_secs(8),
        }
    }
}

/// Constants of the on-chain growth formula. Configurable for tests; the
/// defaults are the deployed values.
#[derive(Clone, Debug)]
pub struct SimParams {
    /// Seconds per weather segment; weather is constant within a segment.
    pub segment_duration: u64,
    /// Growth points required for maturity.
    pub growth_requirement: u64,
    /// Flat delay added while a storm pauses growth.
    pub storm_penalty: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            segment_duration: 900,
            growth_requirement: 3_600,
            storm_penalty: 300,
        }
    }
}
