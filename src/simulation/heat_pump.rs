//! Air-source heat pump: active heating and cooling toward the target.
//!
//! Envelope heat loss is handled by passive physics; this module only adds
//! or removes heat and books the electrical energy.

use tracing::debug;

use super::module::{ensure_finite, thermal_proxy, SimulationModule};
use super::physics::EnvelopeLosses;
use crate::domain::{HeatPumpConfig, HouseState, ModuleConfig, ModuleKind};
use crate::error::ModuleError;

/// No action within this band around the target (°C)
pub const DEADBAND_C: f64 = 0.1;
/// Thermal mass heuristic used to size the demand (kWh/K per m²)
const DEMAND_MASS_PER_M2: f64 = 0.5;
/// Share of the remaining error the pump may close in one step
const MAX_ERROR_FRACTION: f64 = 0.8;

#[derive(Debug, Default, Clone, Copy)]
pub struct HeatPumpModule;

impl SimulationModule for HeatPumpModule {
    fn name(&self) -> ModuleKind {
        ModuleKind::HeatPump
    }

    fn simulate(
        &self,
        state: &mut HouseState,
        timestep_hours: f64,
        config: Option<&ModuleConfig>,
    ) -> Result<(), ModuleError> {
        let config = match config {
            Some(ModuleConfig::HeatPump(c)) => *c,
            _ => HeatPumpConfig::default(),
        };
        let kind = self.name();
        let indoor = ensure_finite(kind, "indoor.temperature", state.indoor.temperature)?;
        let target = ensure_finite(kind, "target_temperature", config.target_temperature)?;
        if config.efficiency.is_nan() || config.efficiency <= 0.0 {
            return Err(ModuleError::Failed(
                kind,
                format!("COP must be positive, got {}", config.efficiency),
            ));
        }

        let error = target - indoor;
        if error.abs() <= DEADBAND_C {
            return Ok(());
        }

        let proxy = thermal_proxy(kind, &state.envelope)?;
        let continuous_loss_kwh = EnvelopeLosses::calculate(
            &state.envelope,
            indoor,
            state.outdoor.temperature,
        )
        .total_kwh(timestep_hours)
        .abs();

        let required_kwh =
            error.abs() * state.envelope.floor_area * DEMAND_MASS_PER_M2 + continuous_loss_kwh;
        let delivered_kwh = required_kwh.min(config.capacity * timestep_hours).max(0.0);
        let electrical_kwh = delivered_kwh / config.efficiency;

        let achieved = (delivered_kwh / proxy).min(MAX_ERROR_FRACTION * error.abs());
        state.indoor.temperature += achieved.copysign(error);
        state.energy.heat_pump_kwh += electrical_kwh;

        debug!(
            mode = if error > 0.0 { "heating" } else { "cooling" },
            error_c = error,
            delivered_kwh,
            electrical_kwh,
            delta_c = achieved.copysign(error),
            "heat pump step"
        );
        Ok(())
    }
}
