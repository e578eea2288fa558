//! # Passive Physics
//!
//! Unconditional envelope behavior applied at the start of every tick:
//! conduction through walls, roof, floor and windows, infiltration, passive
//! window gain while the heat pump is off, and air drift while the ERV is off.

use serde::{Deserialize, Serialize};

use crate::domain::{BuildingEnvelope, HouseState};

/// kg/m³
pub const AIR_DENSITY: f64 = 1.2;
/// J/(kg·K)
pub const AIR_SPECIFIC_HEAT: f64 = 1005.0;
/// Wall area as a share of floor area
pub const WALL_AREA_FRACTION: f64 = 0.6;

/// Radiation above which unconditioned windows warm the house (W/m²)
const PASSIVE_GAIN_THRESHOLD: f64 = 200.0;
const PASSIVE_WINDOW_SHGC: f64 = 0.4;
/// Air quality lost per hour without mechanical ventilation
const STALE_AIR_RATE: f64 = 0.02;
/// Share of the indoor/outdoor humidity gap closed per hour without ventilation
const HUMIDITY_DRIFT_RATE: f64 = 0.1;
/// Indoor may not sit further than this below a warmer outdoor
const MAX_BELOW_OUTDOOR_C: f64 = 5.0;

/// Signed conductive and infiltration flows in W, positive = heat leaving
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeLosses {
    pub wall_w: f64,
    pub roof_w: f64,
    pub floor_w: f64,
    pub window_w: f64,
    pub infiltration_w: f64,
}

impl EnvelopeLosses {
    pub fn calculate(envelope: &BuildingEnvelope, indoor_c: f64, outdoor_c: f64) -> Self {
        let delta_t = indoor_c - outdoor_c;
        let area = envelope.floor_area;
        let infiltration_m3_s = envelope.infiltration_rate * envelope.volume_m3() / 3600.0;

        Self {
            wall_w: delta_t / envelope.wall_r * area * WALL_AREA_FRACTION,
            roof_w: delta_t / envelope.roof_r * area,
            floor_w: delta_t / envelope.floor_r * area,
            window_w: delta_t * envelope.window_u * envelope.window_area,
            infiltration_w: delta_t * AIR_DENSITY * AIR_SPECIFIC_HEAT * infiltration_m3_s,
        }
    }

    pub fn total_w(&self) -> f64 {
        self.wall_w + self.roof_w + self.floor_w + self.window_w + self.infiltration_w
    }

    pub fn total_kwh(&self, timestep_hours: f64) -> f64 {
        self.total_w() * timestep_hours / 1000.0
    }
}

/// Which devices were available to the passive step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassiveInputs {
    pub heat_pump_enabled: bool,
    pub erv_enabled: bool,
}

/// What the passive step did to the indoor state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveStepReport {
    pub envelope_loss_kwh: f64,
    pub passive_gain_kwh: f64,
    pub temperature_change: f64,
    pub air_quality_change: f64,
    pub humidity_change: f64,
    pub floor_applied: bool,
}

pub fn apply_passive_physics(
    state: &mut HouseState,
    timestep_hours: f64,
    inputs: PassiveInputs,
) -> PassiveStepReport {
    let mut report = PassiveStepReport::default();
    let envelope = state.envelope;
    let outdoor = state.outdoor;
    let before = state.indoor;

    let proxy = envelope.thermal_proxy_kwh_per_k();
    if proxy > 0.0 {
        let losses = EnvelopeLosses::calculate(&envelope, before.temperature, outdoor.temperature);
        report.envelope_loss_kwh = losses.total_kwh(timestep_hours);

        let drifted = before.temperature - report.envelope_loss_kwh / proxy;
        // Conduction alone cannot cross the outdoor temperature
        state.indoor.temperature = if before.temperature >= outdoor.temperature {
            drifted.max(outdoor.temperature)
        } else {
            drifted.min(outdoor.temperature)
        };

        if !inputs.heat_pump_enabled && outdoor.solar_radiation > PASSIVE_GAIN_THRESHOLD {
            report.passive_gain_kwh = envelope.window_area * outdoor.solar_radiation / 1000.0
                * PASSIVE_WINDOW_SHGC
                * timestep_hours;
            state.indoor.temperature += report.passive_gain_kwh / proxy;
        }
    }

    if !inputs.erv_enabled {
        state.indoor.air_quality -= STALE_AIR_RATE * timestep_hours;
        state.indoor.humidity +=
            (outdoor.humidity - state.indoor.humidity) * HUMIDITY_DRIFT_RATE * timestep_hours;
    }

    let floor = outdoor.temperature - MAX_BELOW_OUTDOOR_C;
    if outdoor.temperature > state.indoor.temperature && state.indoor.temperature < floor {
        state.indoor.temperature = floor;
        report.floor_applied = true;
    }

    state.indoor.clamp_bands();

    report.temperature_change = state.indoor.temperature - before.temperature;
    report.air_quality_change = state.indoor.air_quality - before.air_quality;
    report.humidity_change = state.indoor.humidity - before.humidity;
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OFF: PassiveInputs = PassiveInputs {
        heat_pump_enabled: false,
        erv_enabled: false,
    };
    const ALL_ON: PassiveInputs = PassiveInputs {
        heat_pump_enabled: true,
        erv_enabled: true,
    };

    fn cold_night() -> HouseState {
        let mut state = HouseState::default();
        state.outdoor.temperature = -5.0;
        state.outdoor.solar_radiation = 0.0;
        state.indoor.temperature = 21.0;
        state
    }

    #[test]
    fn test_default_envelope_ua() {
        let losses = EnvelopeLosses::calculate(&BuildingEnvelope::default(), 21.0, 20.0);
        // 18 + 21.43 + 37.5 + 16 + 37.69 W/K
        assert!((losses.total_w() - 130.6).abs() < 0.1);
    }

    #[test]
    fn test_cold_outdoor_cools_house() {
        let mut state = cold_night();
        let report = apply_passive_physics(&mut state, 1.0, ALL_ON);
        assert!(report.envelope_loss_kwh > 0.0);
        assert!(state.indoor.temperature < 21.0);
        assert!(state.indoor.temperature > -5.0);
    }

    #[test]
    fn test_warm_outdoor_warms_house_without_overshoot() {
        let mut state = HouseState::default();
        state.outdoor.temperature = 21.5;
        state.outdoor.solar_radiation = 0.0;
        state.indoor.temperature = 21.0;
        apply_passive_physics(&mut state, 10.0, ALL_ON);
        assert!(state.indoor.temperature > 21.0);
        assert!(state.indoor.temperature <= 21.5);
    }

    #[test]
    fn test_passive_gain_only_with_heat_pump_off() {
        let mut on = HouseState::default();
        on.outdoor.temperature = on.indoor.temperature;
        on.outdoor.solar_radiation = 800.0;
        let mut off = on.clone();

        apply_passive_physics(&mut on, 1.0, ALL_ON);
        let report = apply_passive_physics(&mut off, 1.0, ALL_OFF);
        assert_eq!(on.indoor.temperature, 21.0);
        assert!((report.passive_gain_kwh - 6.4).abs() < 1e-9);
        assert!(off.indoor.temperature > 21.0);
    }

    #[test]
    fn test_stale_air_without_erv() {
        let mut state = cold_night();
        state.outdoor.humidity = 0.6;
        apply_passive_physics(&mut state, 1.0, ALL_OFF);
        assert!((state.indoor.air_quality - 0.88).abs() < 1e-9);
        assert!((state.indoor.humidity - 0.42).abs() < 1e-9);
    }

    #[test]
    fn test_floor_below_warm_outdoor() {
        let mut state = HouseState::default();
        state.outdoor.temperature = 35.0;
        state.outdoor.solar_radiation = 0.0;
        state.indoor.temperature = 20.0;
        let report = apply_passive_physics(&mut state, 1.0, ALL_ON);
        assert!(report.floor_applied);
        assert_eq!(state.indoor.temperature, 30.0);
    }

    #[test]
    fn test_bands_hold() {
        let mut state = cold_night();
        state.indoor.air_quality = 0.31;
        for _ in 0..10 {
            apply_passive_physics(&mut state, 1.0, ALL_OFF);
        }
        assert_eq!(state.indoor.air_quality, 0.3);
    }
}
