//! Client-side replica of the ledger's weather and growth formulas.
//!
//! Every view that renders a plot calls these functions independently, so
//! they must be pure: identical inputs always produce identical outputs,
//! and nothing here touches the clock, the store, or the network.

use crate::types::SimParams;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WeatherKind {
    Sunny,
    Rainy,
    Storm,
    Cloudy,
}

impl WeatherKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "☀️",
            WeatherKind::Rainy => "🌧️",
            WeatherKind::Storm => "⛈️",
            WeatherKind::Cloudy => "☁️",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WeatherKind::Sunny => "sunny, growth +20%",
            WeatherKind::Rainy => "rainy, growth +20%",
            WeatherKind::Storm => "storm, growth paused",
            WeatherKind::Cloudy => "cloudy, growth -10%",
        }
    }
}

/// Weather for one plot within one segment, derived on demand and never
/// stored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WeatherSample {
    pub kind: WeatherKind,
    pub multiplier: f64,
}

/// Discrete weather at `timestamp` (unix seconds) for a plot with the given
/// seed. Constant within a segment, changes only at segment boundaries.
///
/// A zero seed means the plot has never had its weather initialised on
/// chain; that degrades to sunny rather than surfacing an error into a
/// rendering path.
pub fn weather_at(weather_seed: u128, timestamp: u64, params: &SimParams) -> WeatherSample {
    if weather_seed == 0 {
        return sample_for(WeatherKind::Sunny);
    }
    let segment = u128::from(timestamp / params.segment_duration.max(1));
    let seed_hash = weather_seed % 1_000_000;
    let kind = match (seed_hash + segment) % 4 {
        0 => WeatherKind::Sunny,
        1 => WeatherKind::Rainy,
        2 => WeatherKind::Storm,
        _ => WeatherKind::Cloudy,
    };
    sample_for(kind)
}

fn sample_for(kind: WeatherKind) -> WeatherSample {
    let multiplier = match kind {
        WeatherKind::Sunny | WeatherKind::Rainy => 1.2,
        WeatherKind::Storm => 0.0,
        WeatherKind::Cloudy => 0.9,
    };
    WeatherSample { kind, multiplier }
}

/// Growth completion in percent, clamped to [0, 100]. The accumulated
/// counter may transiently overshoot the requirement on chain; that must
/// still read as exactly 100.
pub fn growth_progress(accumulated_growth: u64, params: &SimParams) -> f64 {
    let requirement = params.growth_requirement.max(1);
    let capped = accumulated_growth.min(requirement);
    capped as f64 * 100.0 / requirement as f64
}

/// Growth points still outstanding, saturating at zero.
pub fn remaining_points(accumulated_growth: u64, params: &SimParams) -> u64 {
    params.growth_requirement.saturating_sub(accumulated_growth)
}

/// Wall-clock seconds until maturity under the given weather. During a
/// storm growth is fully paused, so the estimate is the outstanding points
/// plus the flat storm penalty: growth resumes only after the storm
/// segment passes.
pub fn remaining_time(
    accumulated_growth: u64,
    weather: WeatherSample,
    params: &SimParams,
) -> u64 {
    let points = remaining_points(accumulated_growth, params);
    if points == 0 {
        return 0;
    }
    if weather.multiplier <= 0.0 {
        points.saturating_add(params.storm_penalty)
    } else {
        (points as f64 / weather.multiplier).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params() -> SimParams {
        SimParams::default()
    }

    #[test]
    fn weather_at__known_seed__matches_formula() {
        // seed_hash = 7, segment = 1_000_000 / 900 = 1111, (7 + 1111) % 4 = 2
        let sample = weather_at(7, 1_000_000, &params());
        assert_eq!(sample.kind, WeatherKind::Storm);
        assert_eq!(sample.multiplier, 0.0);
    }

    #[test]
    fn weather_at__zero_seed__degrades_to_sunny() {
        let sample = weather_at(0, 12_345, &params());
        assert_eq!(sample.kind, WeatherKind::Sunny);
        assert_eq!(sample.multiplier, 1.2);
    }

    #[test]
    fn growth_progress__halfway__is_fifty_percent() {
        assert_eq!(growth_progress(1_800, &params()), 50.0);
    }

    #[test]
    fn growth_progress__overshoot__clamps_to_hundred() {
        assert_eq!(growth_progress(3_600, &params()), 100.0);
        assert_eq!(growth_progress(9_999, &params()), 100.0);
    }

    #[test]
    fn remaining_time__sunny_at_halfway__divides_by_multiplier() {
        // 1800 points left at x1.2 => ceil(1800 / 1.2) = 1500 seconds.
        let sunny = weather_at(0, 0, &params());
        assert_eq!(remaining_time(1_800, sunny, &params()), 1_500);
    }

    #[test]
    fn remaining_time__storm__adds_flat_penalty() {
        let storm = WeatherSample {
            kind: WeatherKind::Storm,
            multiplier: 0.0,
        };
        assert_eq!(remaining_time(1_800, storm, &params()), 1_800 + 300);
    }

    #[test]
    fn remaining_time__mature__is_zero_even_during_storm() {
        let storm = WeatherSample {
            kind: WeatherKind::Storm,
            multiplier: 0.0,
        };
        assert_eq!(remaining_time(3_600, storm, &params()), 0);
        assert_eq!(remaining_time(4_000, storm, &params()), 0);
    }

    proptest! {
        #[test]
        fn weather_at__same_inputs__always_identical(
            seed in any::<u128>(),
            timestamp in any::<u64>(),
        ) {
            let first = weather_at(seed, timestamp, &params());
            let second = weather_at(seed, timestamp, &params());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn weather_at__within_one_segment__is_constant(
            seed in 1u128..u128::MAX,
            segment in 0u64..1_000_000,
            offset_a in 0u64..900,
            offset_b in 0u64..900,
        ) {
            let base = segment * 900;
            let a = weather_at(seed, base + offset_a, &params());
            let b = weather_at(seed, base + offset_b, &params());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn growth_progress__is_monotone_and_bounded(
            lo in 0u64..10_000,
            delta in 0u64..10_000,
        ) {
            let p = params();
            let before = growth_progress(lo, &p);
            let after = growth_progress(lo + delta, &p);
            prop_assert!(after >= before);
            prop_assert!((0.0..=100.0).contains(&after));
        }
    }
}
