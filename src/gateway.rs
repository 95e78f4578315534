//! HTTP client for the read gateway sitting in front of the ledger.
//!
//! One read per call, no caching of its own; rate-limit and not-found
//! statuses map to typed [`ReadError`] variants so the scheduler can react
//! to them.

use crate::{
    sync::land_source::{
        IdleStatusWriter,
        LandSource,
        ReadError,
    },
    types::{
        CropKind,
        FarmerAddress,
        GrowthStage,
        LandRecord,
        LandState,
        Rarity,
        SeedInfo,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;

#[derive(Clone)]
pub struct FarmGateway {
    base_url: String,
    http: reqwest::Client,
}

impl FarmGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for farm gateway")?;
        Ok(Self { base_url, http })
    }

    pub async fn land(&self, id: u64) -> Result<LandRecord, ReadError> {
        let url = format!("{}/land/{}", self.base_url, id);
        let res = self.http.get(url).send().await.map_err(transport)?;
        match res.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(ReadError::RateLimited),
            StatusCode::NOT_FOUND => Err(ReadError::NotFound(id)),
            status if !status.is_success() => Err(gateway_error(status, res).await),
            _ => {
                let dto: LandDto = res.json().await.map_err(transport)?;
                Ok(dto.into())
            }
        }
    }

    pub async fn seed(&self, token_id: u64) -> Result<SeedInfo, ReadError> {
        let url = format!("{}/seed/{}", self.base_url, token_id);
        let res = self.http.get(url).send().await.map_err(transport)?;
        match res.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(ReadError::RateLimited),
            StatusCode::NOT_FOUND => Err(ReadError::NotFound(token_id)),
            status if !status.is_success() => Err(gateway_error(status, res).await),
            _ => {
                let dto: SeedDto = res.json().await.map_err(transport)?;
                Ok(dto.into())
            }
        }
    }

    /// Ask the ledger to flip any cooled-down plots back to idle. The
    /// transition is not externally visible on wall-clock passage alone.
    pub async fn recompute_idle(&self) -> Result<(), ReadError> {
        let url = format!("{}/land/recompute-idle", self.base_url);
        let res = self.http.post(url).send().await.map_err(transport)?;
        match res.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(ReadError::RateLimited),
            status if !status.is_success() => Err(gateway_error(status, res).await),
            _ => Ok(()),
        }
    }
}

impl LandSource for FarmGateway {
    async fn land(&self, id: u64) -> Result<LandRecord, ReadError> {
        FarmGateway::land(self, id).await
    }
}

impl IdleStatusWriter for FarmGateway {
    async fn recompute_idle_status(&self) -> Result<(), ReadError> {
        self.recompute_idle().await
    }
}

impl fmt::Display for FarmGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

fn transport(err: reqwest::Error) -> ReadError {
    ReadError::Transport(err.to_string())
}

async fn gateway_error(status: StatusCode, res: reqwest::Response) -> ReadError {
    let body = res
        .text()
        .await
        .unwrap_or_else(|_| "<unavailable body>".to_string());
    ReadError::Gateway {
        status: status.as_u16(),
        body,
    }
}

#[derive(Deserialize)]
struct LandDto {
    state: LandStateDto,
    seed_token_id: u64,
    claim_time: u64,
    cooldown_end_time: u64,
    /// uint256 on chain, serialised as a decimal string.
    weather_seed: String,
    last_weather_update_time: u64,
    accumulated_growth: u64,
    current_farmer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
enum LandStateDto {
    Idle,
    Growing,
    Ripe,
    Stealing,
    LockedIdle,
}

#[derive(Deserialize)]
struct SeedDto {
    crop_kind: CropKindDto,
    rarity: RarityDto,
    growth_stage: GrowthStageDto,
    growth_start_time: u64,
    base_growth_duration: u64,
    matured_at: u64,
    boosters_applied: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
enum CropKindDto {
    Wheat,
    Corn,
    Pumpkin,
    Strawberry,
    Grape,
    Watermelon,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
enum RarityDto {
    Common,
    Rare,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
enum GrowthStageDto {
    Seed,
    Growing,
    Mature,
}

impl From<LandDto> for LandRecord {
    fn from(dto: LandDto) -> Self {
        // A seed the client cannot parse degrades to zero, which the
        // simulator treats as neutral sunny weather; a malformed seed must
        // never poison a rendering path.
        let weather_seed = dto.weather_seed.parse::<u128>().unwrap_or(0);
        let current_farmer = dto
            .current_farmer
            .parse::<FarmerAddress>()
            .ok()
            .filter(|farmer| !farmer.is_zero());
        LandRecord {
            state: dto.state.into(),
            seed_token_id: (dto.seed_token_id != 0).then_some(dto.seed_token_id),
            claim_time: dto.claim_time,
            cooldown_end_time: dto.cooldown_end_time,
            weather_seed,
            last_weather_update_time: dto.last_weather_update_time,
            accumulated_growth: dto.accumulated_growth,
            current_farmer,
        }
    }
}

impl From<LandStateDto> for LandState {
    fn from(value: LandStateDto) -> Self {
        match value {
            LandStateDto::Idle => LandState::Idle,
            LandStateDto::Growing => LandState::Growing,
            LandStateDto::Ripe => LandState::Ripe,
            LandStateDto::Stealing => LandState::Stealing,
            LandStateDto::LockedIdle => LandState::LockedIdle,
        }
    }
}

impl From<SeedDto> for SeedInfo {
    fn from(dto: SeedDto) -> Self {
        SeedInfo {
            crop_kind: dto.crop_kind.into(),
            rarity: dto.rarity.into(),
            growth_stage: dto.growth_stage.into(),
            growth_start_time: dto.growth_start_time,
            base_growth_duration: dto.base_growth_duration,
            matured_at: dto.matured_at,
            boosters_applied: dto.boosters_applied,
        }
    }
}

impl From<CropKindDto> for CropKind {
    fn from(value: CropKindDto) -> Self {
        match value {
            CropKindDto::Wheat => CropKind::Wheat,
            CropKindDto::Corn => CropKind::Corn,
            CropKindDto::Pumpkin => CropKind::Pumpkin,
            CropKindDto::Strawberry => CropKind::Strawberry,
            CropKindDto::Grape => CropKind::Grape,
            CropKindDto::Watermelon => CropKind::Watermelon,
        }
    }
}

impl From<RarityDto> for Rarity {
    fn from(value: RarityDto) -> Self {
        match value {
            RarityDto::Common => Rarity::Common,
            RarityDto::Rare => Rarity::Rare,
        }
    }
}

impl From<GrowthStageDto> for GrowthStage {
    fn from(value: GrowthStageDto) -> Self {
        match value {
            GrowthStageDto::Seed => GrowthStage::Seed,
            GrowthStageDto::Growing => GrowthStage::Growing,
            GrowthStageDto::Mature => GrowthStage::Mature,
        }
    }
}
