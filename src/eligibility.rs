//! Pure pre-flight checks for game actions.
//!
//! The evaluator only classifies: it never mutates anything and never does
//! I/O. A denial is an expected, user-facing outcome, not an error. The
//! actual transaction submission lives with the caller and may still fail
//! on chain if the cached record was stale.

use crate::types::{
    FarmerAddress,
    LandRecord,
    LandState,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LandAction {
    Plant,
    Harvest,
    Steal,
    Boost,
    Help,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eligibility {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl Eligibility {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Decide whether `actor` may perform `action` on `land` at `now`
/// (unix seconds).
pub fn can_perform(
    land: &LandRecord,
    action: LandAction,
    actor: &FarmerAddress,
    now: u64,
) -> Eligibility {
    match action {
        LandAction::Plant => can_plant(land, now),
        LandAction::Harvest => can_harvest(land, actor),
        LandAction::Steal => can_steal(land, actor),
        LandAction::Boost => can_boost(land),
        LandAction::Help => can_help(land, actor),
    }
}

fn can_plant(land: &LandRecord, now: u64) -> Eligibility {
    match land.state {
        LandState::Idle => {
            if land.cooldown_end_time > now {
                Eligibility::deny("land is still cooling down")
            } else {
                Eligibility::allow()
            }
        }
        // An elapsed cooldown is not plantable until the remote recompute
        // has been observed; the expiry watcher takes care of nudging it.
        LandState::LockedIdle => Eligibility::deny("land is cooling down"),
        LandState::Growing | LandState::Ripe | LandState::Stealing => {
            Eligibility::deny("land is already occupied")
        }
    }
}

fn can_harvest(land: &LandRecord, actor: &FarmerAddress) -> Eligibility {
    if land.state != LandState::Ripe {
        return Eligibility::deny("crop is not ripe yet");
    }
    if !land.occupied_by(actor) {
        return Eligibility::deny("only the planter can harvest this crop");
    }
    Eligibility::allow()
}

fn can_steal(land: &LandRecord, actor: &FarmerAddress) -> Eligibility {
    if land.state != LandState::Ripe {
        return Eligibility::deny("crop is not ripe yet");
    }
    if land.current_farmer.is_none() {
        return Eligibility::deny("nobody planted this crop");
    }
    if land.occupied_by(actor) {
        return Eligibility::deny("you cannot steal your own crop");
    }
    Eligibility::allow()
}

fn can_boost(land: &LandRecord) -> Eligibility {
    if land.state != LandState::Growing {
        return Eligibility::deny("boosters only work on a growing crop");
    }
    Eligibility::allow()
}

fn can_help(land: &LandRecord, actor: &FarmerAddress) -> Eligibility {
    if land.state != LandState::Growing {
        return Eligibility::deny("you can only help a growing crop");
    }
    if land.occupied_by(actor) {
        return Eligibility::deny("you cannot help your own crop");
    }
    Eligibility::allow()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer(byte: u8) -> FarmerAddress {
        FarmerAddress::new([byte; 20])
    }

    fn land(state: LandState, occupant: Option<FarmerAddress>) -> LandRecord {
        LandRecord {
            state,
            seed_token_id: occupant.map(|_| 7),
            claim_time: 1_000,
            cooldown_end_time: 0,
            weather_seed: 42,
            last_weather_update_time: 1_000,
            accumulated_growth: 0,
            current_farmer: occupant,
        }
    }

    #[test]
    fn can_perform__ripe_crop__owner_harvests_thief_steals() {
        let owner = farmer(0xaa);
        let thief = farmer(0xbb);
        let ripe = land(LandState::Ripe, Some(owner));

        assert!(can_perform(&ripe, LandAction::Harvest, &owner, 2_000).allowed);
        assert!(!can_perform(&ripe, LandAction::Harvest, &thief, 2_000).allowed);
        assert!(can_perform(&ripe, LandAction::Steal, &thief, 2_000).allowed);
        assert!(!can_perform(&ripe, LandAction::Steal, &owner, 2_000).allowed);
    }

    #[test]
    fn can_perform__plant__requires_idle_with_elapsed_cooldown() {
        let actor = farmer(0x01);
        let mut idle = land(LandState::Idle, None);
        assert!(can_perform(&idle, LandAction::Plant, &actor, 5_000).allowed);

        idle.cooldown_end_time = 9_000;
        let denied = can_perform(&idle, LandAction::Plant, &actor, 5_000);
        assert!(!denied.allowed);
        assert!(denied.reason.is_some());
    }

    #[test]
    fn can_perform__plant_on_locked_idle__denied_even_after_cooldown() {
        // The cache still says LockedIdle; until a refresh observes the
        // remote recompute, planting stays blocked.
        let actor = farmer(0x01);
        let mut locked = land(LandState::LockedIdle, None);
        locked.cooldown_end_time = 4_000;
        assert!(!can_perform(&locked, LandAction::Plant, &actor, 5_000).allowed);
    }

    #[test]
    fn can_perform__help__rejects_own_crop() {
        let owner = farmer(0xaa);
        let helper = farmer(0xbb);
        let growing = land(LandState::Growing, Some(owner));

        assert!(can_perform(&growing, LandAction::Help, &helper, 2_000).allowed);
        assert!(!can_perform(&growing, LandAction::Help, &owner, 2_000).allowed);
        assert!(can_perform(&growing, LandAction::Boost, &owner, 2_000).allowed);
    }

    #[test]
    fn can_perform__boost_on_idle_land__denied_with_reason() {
        let actor = farmer(0x01);
        let idle = land(LandState::Idle, None);
        let denied = can_perform(&idle, LandAction::Boost, &actor, 2_000);
        assert!(!denied.allowed);
        assert_eq!(
            denied.reason.as_deref(),
            Some("boosters only work on a growing crop")
        );
    }
}
