//! Rooftop PV generation and passive window gain.

use tracing::debug;

use super::module::{ensure_finite, thermal_proxy, SimulationModule};
use crate::domain::{HouseState, ModuleConfig, ModuleKind, SolarConfig};
use crate::error::ModuleError;

/// Share of transmitted window gain that lifts the air temperature within the hour
pub const WINDOW_GAIN_AIR_FRACTION: f64 = 0.1;

#[derive(Debug, Default, Clone, Copy)]
pub struct SolarModule;

impl SolarModule {
    /// AC energy delivered by the array in kWh
    pub fn pv_output_kwh(config: &SolarConfig, radiation_w_m2: f64, timestep_hours: f64) -> f64 {
        let irradiance_kw_m2 = radiation_w_m2.max(0.0) / 1000.0;
        config.panel_area
            * irradiance_kw_m2
            * config.efficiency
            * config.inverter_efficiency
            * timestep_hours
    }
}

impl SimulationModule for SolarModule {
    fn name(&self) -> ModuleKind {
        ModuleKind::Solar
    }

    fn simulate(
        &self,
        state: &mut HouseState,
        timestep_hours: f64,
        config: Option<&ModuleConfig>,
    ) -> Result<(), ModuleError> {
        let config = match config {
            Some(ModuleConfig::Solar(c)) => *c,
            _ => SolarConfig::default(),
        };
        let kind = self.name();
        let radiation = ensure_finite(kind, "outdoor.solar_radiation", state.outdoor.solar_radiation)?;
        let proxy = thermal_proxy(kind, &state.envelope)?;

        let generated_kwh = Self::pv_output_kwh(&config, radiation, timestep_hours);

        let window_gain_kwh = state.envelope.window_area * radiation.max(0.0) / 1000.0
            * config.window_shgc
            * config.orientation_factor
            * timestep_hours;

        // Net settlement belongs to the battery / orchestrator
        state.energy.solar_kwh += generated_kwh;
        state.indoor.temperature += window_gain_kwh / proxy * WINDOW_GAIN_AIR_FRACTION;

        debug!(radiation, generated_kwh, window_gain_kwh, "solar step");
        Ok(())
    }
}
