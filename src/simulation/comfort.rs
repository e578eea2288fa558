//! Occupant comfort score (0-100).

use crate::domain::HouseState;

/// Temperature error tolerated before any penalty (°C)
const TEMP_TOLERANCE_C: f64 = 2.0;
const COMFORT_HUMIDITY_PCT: (f64, f64) = (30.0, 60.0);
const HUMIDITY_MIDPOINT_PCT: f64 = 45.0;
const GOOD_AIR_QUALITY: f64 = 0.8;

/// Score the current indoor state against the heat pump target.
///
/// Penalties stack: temperature (≤ 30), humidity (≤ 20), air quality,
/// smoke (50) and sprinklers (20).
pub fn comfort_score(state: &HouseState, target_temperature: f64) -> u8 {
    let mut score = 100.0;

    let temp_error = (state.indoor.temperature - target_temperature).abs();
    if temp_error > TEMP_TOLERANCE_C {
        score -= (temp_error * 5.0).min(30.0);
    }

    let humidity_pct = state.indoor.humidity * 100.0;
    if humidity_pct < COMFORT_HUMIDITY_PCT.0 || humidity_pct > COMFORT_HUMIDITY_PCT.1 {
        score -= ((humidity_pct - HUMIDITY_MIDPOINT_PCT).abs() * 0.5).min(20.0);
    }

    if state.indoor.air_quality < GOOD_AIR_QUALITY {
        score -= (GOOD_AIR_QUALITY - state.indoor.air_quality) * 50.0;
    }

    if state.safety.smoke_event {
        score -= 50.0;
    }
    if state.safety.sprinklers_active {
        score -= 20.0;
    }

    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_default_state_is_fully_comfortable() {
        assert_eq!(comfort_score(&HouseState::default(), 21.0), 100);
    }

    #[rstest]
    #[case(23.0, 100)] // within tolerance
    #[case(24.0, 85)]
    #[case(35.0, 70)] // capped at 30
    fn test_temperature_penalty(#[case] indoor: f64, #[case] expected: u8) {
        let mut state = HouseState::default();
        state.indoor.temperature = indoor;
        assert_eq!(comfort_score(&state, 21.0), expected);
    }

    #[test]
    fn test_humidity_and_air_quality_penalties() {
        let mut state = HouseState::default();
        state.indoor.humidity = 0.75; // 30 points off midpoint → 15
        state.indoor.air_quality = 0.6; // 0.2 × 50 → 10
        assert_eq!(comfort_score(&state, 21.0), 75);
    }

    #[test]
    fn test_safety_events_stack() {
        let mut state = HouseState::default();
        state.safety.smoke_event = true;
        state.safety.sprinklers_active = true;
        assert_eq!(comfort_score(&state, 21.0), 30);
        state.indoor.air_quality = 0.3;
        state.indoor.temperature = 40.0;
        assert_eq!(comfort_score(&state, 21.0), 0);
    }

    proptest! {
        #[test]
        fn prop_score_always_in_range(
            temp in -40.0f64..60.0,
            target in 16.0f64..26.0,
            humidity in 0.2f64..0.8,
            air_quality in 0.3f64..1.0,
            smoke in any::<bool>(),
            sprinklers in any::<bool>(),
        ) {
            let mut state = HouseState::default();
            state.indoor.temperature = temp;
            state.indoor.humidity = humidity;
            state.indoor.air_quality = air_quality;
            state.safety.smoke_event = smoke;
            state.safety.sprinklers_active = sprinklers;
            let score = comfort_score(&state, target);
            prop_assert!(score <= 100);
        }
    }
}
