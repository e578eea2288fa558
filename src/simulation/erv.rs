//! Energy recovery ventilator.
//!
//! Normal regime trades stale indoor air for outdoor air while recovering
//! part of the temperature and humidity gap. During a smoke event it runs at
//! double flow and favors air exchange over thermal comfort.

use tracing::debug;

use super::module::{ensure_finite, thermal_proxy, SimulationModule};
use crate::domain::{ErvConfig, HouseState, ModuleConfig, ModuleKind};
use crate::error::ModuleError;

/// Best indoor air quality the ERV can reach
pub const MAX_AIR_QUALITY: f64 = 0.95;
const BLEND_RATE: f64 = 0.1;
const EMERGENCY_BLEND_RATE: f64 = 0.2;
const THERMAL_RECOVERY_RATE: f64 = 0.1;
const HUMIDITY_RECOVERY_RATE: f64 = 0.05;
/// Above this AQI the outdoor air is only half as useful
const POOR_OUTDOOR_AQI: f64 = 100.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct ErvModule;

impl ErvModule {
    /// Outdoor air changes per unit infiltration supplied by the fan
    fn fresh_air_fraction(state: &HouseState, flow_rate: f64) -> f64 {
        let envelope = &state.envelope;
        let denominator = envelope.volume_m3() * envelope.infiltration_rate;
        if denominator > 0.0 {
            flow_rate / denominator
        } else {
            0.0
        }
    }

    fn blend_air_quality(state: &mut HouseState, target: f64, rate: f64, timestep_hours: f64) {
        let factor = rate.clamp(0.0, 1.0);
        let improvement = (target - state.indoor.air_quality) * factor * timestep_hours;
        state.indoor.air_quality = (state.indoor.air_quality + improvement).min(MAX_AIR_QUALITY);
    }

    fn emergency(
        state: &mut HouseState,
        config: &ErvConfig,
        proxy: f64,
        timestep_hours: f64,
    ) {
        let flow_rate = config.flow_rate * 2.0;
        let fan_kw = config.fan_power / 1000.0 * 1.5;

        let target = (1.0 - state.outdoor.air_quality_index / 100.0).max(0.1);
        let rate = Self::fresh_air_fraction(state, flow_rate) * EMERGENCY_BLEND_RATE;
        Self::blend_air_quality(state, target, rate, timestep_hours);

        let gap = state.outdoor.temperature - state.indoor.temperature;
        let recovered = gap * (config.efficiency * 0.5) * THERMAL_RECOVERY_RATE;
        state.indoor.temperature += recovered * timestep_hours / proxy;
        state.indoor.clamp_bands();

        state.energy.erv_kwh += fan_kw * timestep_hours;
        debug!(flow_rate, air_quality = state.indoor.air_quality, "erv purge step");
    }
}

impl SimulationModule for ErvModule {
    fn name(&self) -> ModuleKind {
        ModuleKind::Erv
    }

    fn simulate(
        &self,
        state: &mut HouseState,
        timestep_hours: f64,
        config: Option<&ModuleConfig>,
    ) -> Result<(), ModuleError> {
        let config = match config {
            Some(ModuleConfig::Erv(c)) => *c,
            _ => ErvConfig::default(),
        };
        let kind = self.name();
        ensure_finite(kind, "indoor.air_quality", state.indoor.air_quality)?;
        ensure_finite(kind, "outdoor.air_quality_index", state.outdoor.air_quality_index)?;
        let proxy = thermal_proxy(kind, &state.envelope)?;

        if state.safety.smoke_event {
            Self::emergency(state, &config, proxy, timestep_hours);
            return Ok(());
        }

        let outdoor = state.outdoor;
        let target = (1.0 - outdoor.air_quality_index / 150.0).max(0.3);
        let mut rate = Self::fresh_air_fraction(state, config.flow_rate) * BLEND_RATE;
        if outdoor.air_quality_index > POOR_OUTDOOR_AQI {
            rate *= 0.5;
        }
        Self::blend_air_quality(state, target, rate, timestep_hours);

        let gap = outdoor.temperature - state.indoor.temperature;
        let recovered = gap * config.efficiency * THERMAL_RECOVERY_RATE;
        state.indoor.temperature += recovered * timestep_hours / proxy;

        let humidity_gap = outdoor.humidity - state.indoor.humidity;
        state.indoor.humidity += humidity_gap * config.efficiency * HUMIDITY_RECOVERY_RATE * timestep_hours;
        state.indoor.clamp_bands();

        state.energy.erv_kwh += config.fan_power / 1000.0 * timestep_hours;
        debug!(
            flow_rate = config.flow_rate,
            air_quality = state.indoor.air_quality,
            "erv step"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_improves_air_and_books_fan_energy() {
        let mut state = HouseState::default();
        state.indoor.air_quality = 0.5;
        state.outdoor.air_quality_index = 30.0;
        ErvModule.simulate(&mut state, 1.0, None).unwrap();
        assert!(state.indoor.air_quality > 0.5);
        assert!((state.energy.erv_kwh - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_poor_outdoor_air_halves_blend() {
        let mut clean = HouseState::default();
        clean.indoor.air_quality = 0.3;
        clean.outdoor.air_quality_index = 0.0;
        let mut smoggy = clean.clone();
        smoggy.outdoor.air_quality_index = 120.0;

        ErvModule.simulate(&mut clean, 1.0, None).unwrap();
        ErvModule.simulate(&mut smoggy, 1.0, None).unwrap();
        assert!(smoggy.indoor.air_quality - 0.3 < clean.indoor.air_quality - 0.3);
    }

    #[test]
    fn test_smoke_event_purges_at_higher_fan_power() {
        let mut state = HouseState::default();
        state.safety.smoke_event = true;
        state.indoor.air_quality = 0.3;
        state.outdoor.air_quality_index = 20.0;
        let humidity = state.indoor.humidity;
        ErvModule.simulate(&mut state, 1.0, None).unwrap();
        assert!((state.energy.erv_kwh - 0.225).abs() < 1e-12);
        assert!(state.indoor.air_quality > 0.3);
        assert_eq!(state.indoor.humidity, humidity, "purge skips humidity exchange");
    }

    #[test]
    fn test_zero_floor_area_is_an_error() {
        let mut state = HouseState::default();
        state.envelope.floor_area = 0.0;
        assert!(matches!(
            ErvModule.simulate(&mut state, 1.0, None),
            Err(ModuleError::InvalidEnvelope { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_air_quality_never_exceeds_cap(
            start in 0.3f64..1.0,
            aqi in 0.0f64..300.0,
            flow in 50.0f64..300.0,
            smoke in any::<bool>(),
            ticks in 1usize..200,
        ) {
            let mut state = HouseState::default();
            state.indoor.air_quality = start.min(MAX_AIR_QUALITY);
            state.outdoor.air_quality_index = aqi;
            state.safety.smoke_event = smoke;
            let config = ModuleConfig::Erv(ErvConfig { flow_rate: flow, ..Default::default() });
            for _ in 0..ticks {
                ErvModule.simulate(&mut state, 1.0, Some(&config)).unwrap();
                prop_assert!(state.indoor.air_quality <= MAX_AIR_QUALITY);
            }
        }
    }
}
