//! # Energy Balance Ledger
//!
//! Detailed per-category heat loss and gain decomposition following the
//! Passive House energy balance layout. Purely diagnostic: nothing here
//! feeds back into the indoor temperature.

use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use super::physics::{AIR_DENSITY, AIR_SPECIFIC_HEAT, WALL_AREA_FRACTION};
use crate::domain::{Configuration, HouseState};

/// Basement wall area as a share of floor area
const GROUND_WALL_FRACTION: f64 = 0.2;
const GROUND_WALL_DT_FACTOR: f64 = 0.6;
const FLOOR_SLAB_DT_FACTOR: f64 = 0.5;
const GARAGE_FRACTION: f64 = 0.1;
const GARAGE_DT_FACTOR: f64 = 0.6;
const GARAGE_U: f64 = 0.5;
const DOOR_U: f64 = 2.0;
const DOOR_AREA_M2: f64 = 4.0;
const GLAZING_SHGC: f64 = 0.6;
const FRAME_FACTOR: f64 = 0.9;
/// Above this both indoors and out, extra gains only cause overheating (°C)
const OVERHEATING_C: f64 = 25.0;
const PRIMARY_ENERGY_FACTOR: f64 = 2.6;
/// n50 air changes, nominal blower-door result
const NOMINAL_AIRTIGHTNESS: f64 = 0.5;

/// Heat losses by envelope category (kWh)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Losses {
    pub external_wall_ambient: f64,
    pub external_wall_ground: f64,
    pub roof_ceiling_ambient: f64,
    pub floor_slab_basement: f64,
    pub unheated_garage: f64,
    pub windows: f64,
    pub exterior_door: f64,
    pub ventilation: f64,
    pub total: f64,
}

/// Heat gains by source (kWh)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub solar: f64,
    pub internal: f64,
    pub non_useful: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetDemand {
    pub heating: f64,
    pub cooling: f64,
}

/// Demand normalized by treated floor area (kWh/m²)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaSpecific {
    pub heating_load: f64,
    pub cooling_load: f64,
    pub treated_floor_area: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyBalance {
    pub losses: Losses,
    pub gains: Gains,
    pub net_demand: NetDemand,
    pub area_specific: AreaSpecific,
}

/// Equipment figures needed to turn demand into primary energy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HvacMetrics {
    pub seasonal_cop: f64,
    /// 0-1
    pub heat_recovery_efficiency: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PassiveHouseMetrics {
    /// kWh/m² over the window
    pub heating_demand: f64,
    pub cooling_demand: f64,
    pub primary_energy_demand: f64,
    /// n50
    pub airtightness: f64,
    /// Percent
    pub heat_recovery_efficiency: f64,
    /// Indoor max - min (K)
    pub temperature_amplitude: f64,
    /// Percent of samples above 25 °C
    pub overheating_frequency: f64,
}

impl PassiveHouseMetrics {
    /// Certification thresholds: demand ≤ 15, primary ≤ 120, n50 ≤ 0.6, recovery ≥ 75 %
    pub fn meets_standard(&self) -> bool {
        self.heating_demand <= 15.0
            && self.cooling_demand <= 15.0
            && self.primary_energy_demand <= 120.0
            && self.airtightness <= 0.6
            && self.heat_recovery_efficiency >= 75.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyBalanceCalculator {
    heated_area: f64,
    volume: f64,
    internal_gains_w: f64,
    thermal_bridges_w_k: f64,
}

impl EnergyBalanceCalculator {
    pub fn new(config: &Configuration) -> Self {
        Self {
            heated_area: config.building.floor_area,
            volume: config.building.volume_m3(),
            internal_gains_w: config.total_internal_gains_w(),
            thermal_bridges_w_k: config.thermal_bridges.total_w_per_k(),
        }
    }

    pub fn calculate(&self, state: &HouseState, timestep_hours: f64) -> EnergyBalance {
        let envelope = &state.envelope;
        let indoor = state.indoor.temperature;
        let outdoor = state.outdoor.temperature;
        let dt_abs = (indoor - outdoor).abs();
        let kwh = |watts: f64| watts * timestep_hours / 1000.0;

        let mut losses = Losses {
            external_wall_ambient: kwh(dt_abs / envelope.wall_r
                * envelope.floor_area
                * WALL_AREA_FRACTION),
            external_wall_ground: kwh(dt_abs * GROUND_WALL_DT_FACTOR / envelope.floor_r
                * envelope.floor_area
                * GROUND_WALL_FRACTION),
            roof_ceiling_ambient: kwh(dt_abs / envelope.roof_r * envelope.floor_area),
            floor_slab_basement: kwh(dt_abs * FLOOR_SLAB_DT_FACTOR / envelope.floor_r
                * envelope.floor_area),
            unheated_garage: kwh(dt_abs * GARAGE_DT_FACTOR
                * GARAGE_U
                * envelope.floor_area
                * GARAGE_FRACTION),
            windows: kwh(dt_abs * envelope.window_u * envelope.window_area),
            exterior_door: kwh(dt_abs * DOOR_U * DOOR_AREA_M2),
            ventilation: kwh(dt_abs
                * envelope.infiltration_rate
                * self.volume
                / 3600.0
                * AIR_DENSITY
                * AIR_SPECIFIC_HEAT),
            total: 0.0,
        };

        let bridges = kwh(dt_abs * self.thermal_bridges_w_k);
        losses.external_wall_ambient += bridges * 0.4;
        losses.roof_ceiling_ambient += bridges * 0.3;
        losses.windows += bridges * 0.3;
        losses.total = losses.external_wall_ambient
            + losses.external_wall_ground
            + losses.roof_ceiling_ambient
            + losses.floor_slab_basement
            + losses.unheated_garage
            + losses.windows
            + losses.exterior_door
            + losses.ventilation;

        let non_useful = if outdoor > OVERHEATING_C && indoor > OVERHEATING_C {
            kwh(((indoor - OVERHEATING_C) * self.heated_area * 0.05).max(0.0))
        } else {
            0.0
        };
        let mut gains = Gains {
            solar: kwh(state.outdoor.solar_radiation.max(0.0)
                * envelope.window_area
                * GLAZING_SHGC
                * FRAME_FACTOR),
            internal: kwh(self.internal_gains_w),
            non_useful,
            total: 0.0,
        };
        gains.total = gains.solar + gains.internal + gains.non_useful;

        let net_demand = NetDemand {
            heating: (losses.total - gains.total).max(0.0),
            cooling: (gains.total - losses.total).max(0.0),
        };
        let area_specific = if self.heated_area > 0.0 {
            AreaSpecific {
                heating_load: net_demand.heating / self.heated_area,
                cooling_load: net_demand.cooling / self.heated_area,
                treated_floor_area: self.heated_area,
            }
        } else {
            AreaSpecific::default()
        };

        EnergyBalance {
            losses,
            gains,
            net_demand,
            area_specific,
        }
    }

    /// Aggregate a ledger window into certification-style indicators
    pub fn passive_house_metrics(
        &self,
        ledger: &[EnergyBalance],
        indoor_temperatures: &[f64],
        hvac: HvacMetrics,
    ) -> PassiveHouseMetrics {
        let total_heating: f64 = ledger.iter().map(|b| b.net_demand.heating).sum();
        let total_cooling: f64 = ledger.iter().map(|b| b.net_demand.cooling).sum();
        let area = if self.heated_area > 0.0 { self.heated_area } else { 1.0 };

        let electricity = if hvac.seasonal_cop > 0.0 {
            (total_heating + total_cooling) / hvac.seasonal_cop
        } else {
            0.0
        };

        let temperature_amplitude = match indoor_temperatures.iter().copied().minmax_by(f64::total_cmp) {
            MinMaxResult::MinMax(min, max) => max - min,
            _ => 0.0,
        };
        let overheating_frequency = if indoor_temperatures.is_empty() {
            0.0
        } else {
            let hot = indoor_temperatures.iter().filter(|t| **t > OVERHEATING_C).count();
            hot as f64 / indoor_temperatures.len() as f64 * 100.0
        };

        PassiveHouseMetrics {
            heating_demand: total_heating / area,
            cooling_demand: total_cooling / area,
            primary_energy_demand: electricity * PRIMARY_ENERGY_FACTOR / area,
            airtightness: NOMINAL_AIRTIGHTNESS,
            heat_recovery_efficiency: hvac.heat_recovery_efficiency * 100.0,
            temperature_amplitude,
            overheating_frequency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculator() -> EnergyBalanceCalculator {
        EnergyBalanceCalculator::new(&Configuration::default())
    }

    #[test]
    fn test_no_temperature_difference_means_no_losses() {
        let mut state = HouseState::default();
        state.outdoor.temperature = state.indoor.temperature;
        state.outdoor.solar_radiation = 0.0;
        let balance = calculator().calculate(&state, 1.0);
        assert_eq!(balance.losses.total, 0.0);
        // Internal gains alone: 1480 W for an hour
        assert!((balance.gains.total - 1.48).abs() < 1e-12);
        assert_eq!(balance.net_demand.heating, 0.0);
        assert!((balance.net_demand.cooling - 1.48).abs() < 1e-12);
    }

    #[test]
    fn test_winter_night_needs_heating() {
        let mut state = HouseState::default();
        state.indoor.temperature = 20.0;
        state.outdoor.temperature = 0.0;
        state.outdoor.solar_radiation = 0.0;
        let balance = calculator().calculate(&state, 1.0);

        // Door: 20 K × 2 W/m²K × 4 m²
        assert!((balance.losses.exterior_door - 0.16).abs() < 1e-12);
        // Bridges 20 W/K × 20 K = 0.4 kWh, 30 % onto windows (0.32 + 0.12)
        assert!((balance.losses.windows - 0.44).abs() < 1e-12);
        assert!(balance.net_demand.heating > 0.0);
        assert_eq!(balance.net_demand.cooling, 0.0);
        assert!(
            (balance.area_specific.heating_load * 150.0 - balance.net_demand.heating).abs() < 1e-12
        );
    }

    #[test]
    fn test_non_useful_gains_only_when_both_hot() {
        let mut state = HouseState::default();
        state.indoor.temperature = 27.0;
        state.outdoor.temperature = 30.0;
        let hot = calculator().calculate(&state, 1.0);
        // 2 K × 150 m² × 0.05 W
        assert!((hot.gains.non_useful - 0.015).abs() < 1e-12);

        state.outdoor.temperature = 20.0;
        assert_eq!(calculator().calculate(&state, 1.0).gains.non_useful, 0.0);
    }

    #[test]
    fn test_passive_house_metrics() {
        let ledger = vec![
            EnergyBalance {
                net_demand: NetDemand {
                    heating: 3.0,
                    cooling: 0.0,
                },
                ..Default::default()
            },
            EnergyBalance {
                net_demand: NetDemand {
                    heating: 0.0,
                    cooling: 1.5,
                },
                ..Default::default()
            },
        ];
        let metrics = calculator().passive_house_metrics(
            &ledger,
            &[20.0, 26.0, 22.0, 21.0],
            HvacMetrics {
                seasonal_cop: 3.0,
                heat_recovery_efficiency: 0.8,
            },
        );
        assert!((metrics.heating_demand - 0.02).abs() < 1e-12);
        assert!((metrics.cooling_demand - 0.01).abs() < 1e-12);
        assert!((metrics.primary_energy_demand - 1.5 * 2.6 / 150.0).abs() < 1e-12);
        assert_eq!(metrics.temperature_amplitude, 6.0);
        assert_eq!(metrics.overheating_frequency, 25.0);
        assert!(metrics.meets_standard());
    }
}
