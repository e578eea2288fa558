//! Home battery storage and the final grid settlement for the hour.

use thiserror::Error;
use tracing::debug;

use super::module::{ensure_finite, SimulationModule};
use crate::domain::{BatteryConfig, EnergyState, HouseState, ModuleConfig, ModuleKind};
use crate::error::ModuleError;

/// Balances smaller than this (kWh) leave the battery idle
pub const DEADBAND_KWH: f64 = 0.1;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatteryError {
    #[error("invalid battery capacity: {0} kWh")]
    InvalidCapacity(f64),
    #[error("invalid round-trip efficiency: {0}")]
    InvalidEfficiency(f64),
}

/// Outcome of one battery dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispatch {
    Charged { drawn_kwh: f64, stored_kwh: f64 },
    Discharged { kwh: f64 },
    Idle,
}

/// Settle one hour's pre-battery balance against the battery.
///
/// Returns the dispatch and the residual grid exchange (import > 0).
pub fn dispatch(
    config: &BatteryConfig,
    energy: &mut EnergyState,
    timestep_hours: f64,
) -> Result<(Dispatch, f64), BatteryError> {
    if !(config.capacity.is_finite() && config.capacity > 0.0) {
        return Err(BatteryError::InvalidCapacity(config.capacity));
    }
    if !(config.efficiency > 0.0 && config.efficiency <= 1.0) {
        return Err(BatteryError::InvalidEfficiency(config.efficiency));
    }

    let soc = energy.battery_kwh.clamp(0.0, config.capacity);
    let balance = energy.generation_kwh() - energy.consumption_kwh();

    let (outcome, residual, soc) = if balance > DEADBAND_KWH {
        let remaining = config.capacity - soc;
        let drawn = balance
            .min(config.charge_rate * timestep_hours)
            .min(remaining / config.efficiency)
            .max(0.0);
        let stored = drawn * config.efficiency;
        (
            Dispatch::Charged {
                drawn_kwh: drawn,
                stored_kwh: stored,
            },
            -(balance - drawn),
            soc + stored,
        )
    } else if balance < -DEADBAND_KWH && soc > 0.0 {
        let deficit = -balance;
        let discharged = deficit
            .min(config.discharge_rate * timestep_hours)
            .min(soc)
            .max(0.0);
        (
            Dispatch::Discharged { kwh: discharged },
            deficit - discharged,
            soc - discharged,
        )
    } else {
        (Dispatch::Idle, -balance, soc)
    };

    energy.battery_kwh = soc.clamp(0.0, config.capacity);
    energy.net_kwh = residual;
    Ok((outcome, residual))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BatteryModule;

impl SimulationModule for BatteryModule {
    fn name(&self) -> ModuleKind {
        ModuleKind::Battery
    }

    fn simulate(
        &self,
        state: &mut HouseState,
        timestep_hours: f64,
        config: Option<&ModuleConfig>,
    ) -> Result<(), ModuleError> {
        let config = match config {
            Some(ModuleConfig::Battery(c)) => *c,
            _ => BatteryConfig::default(),
        };
        let kind = self.name();
        ensure_finite(kind, "energy.battery_kwh", state.energy.battery_kwh)?;

        let (outcome, net_kwh) = dispatch(&config, &mut state.energy, timestep_hours)
            .map_err(|e| ModuleError::Failed(kind, e.to_string()))?;

        debug!(
            ?outcome,
            net_kwh,
            soc_kwh = state.energy.battery_kwh,
            soc_pct = config.percent(state.energy.battery_kwh),
            "battery step"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn energy(solar: f64, load: f64, soc: f64) -> EnergyState {
        EnergyState {
            heat_pump_kwh: load,
            solar_kwh: solar,
            battery_kwh: soc,
            ..Default::default()
        }
    }

    #[test]
    fn test_surplus_charges_with_losses() {
        let mut e = energy(4.0, 1.0, 10.0);
        let (outcome, net) = dispatch(&BatteryConfig::default(), &mut e, 1.0).unwrap();
        match outcome {
            Dispatch::Charged {
                drawn_kwh,
                stored_kwh,
            } => {
                assert_eq!(drawn_kwh, 3.0);
                assert!((stored_kwh - 2.7).abs() < 1e-9);
            }
            other => panic!("expected charge, got {other:?}"),
        }
        assert!((e.battery_kwh - 12.7).abs() < 1e-9);
        assert_eq!(net, 0.0);
    }

    #[test]
    fn test_charge_limited_by_rate_exports_rest() {
        let mut e = energy(9.0, 1.0, 0.0);
        let (_, net) = dispatch(&BatteryConfig::default(), &mut e, 1.0).unwrap();
        assert!((e.battery_kwh - 4.5).abs() < 1e-9);
        assert!((net + 3.0).abs() < 1e-9);
        assert_eq!(e.net_kwh, net);
    }

    #[test]
    fn test_charge_limited_by_headroom() {
        let mut e = energy(5.0, 0.0, 19.55);
        dispatch(&BatteryConfig::default(), &mut e, 1.0).unwrap();
        assert!((e.battery_kwh - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_deficit_discharges() {
        let mut e = energy(0.0, 3.0, 2.0);
        let (outcome, net) = dispatch(&BatteryConfig::default(), &mut e, 1.0).unwrap();
        assert_eq!(outcome, Dispatch::Discharged { kwh: 2.0 });
        assert_eq!(e.battery_kwh, 0.0);
        assert!((net - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_deadband_is_idle() {
        let mut e = energy(1.05, 1.0, 5.0);
        let (outcome, net) = dispatch(&BatteryConfig::default(), &mut e, 1.0).unwrap();
        assert_eq!(outcome, Dispatch::Idle);
        assert_eq!(e.battery_kwh, 5.0);
        assert!((net + 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_capacity_fails_module() {
        let config = ModuleConfig::Battery(BatteryConfig {
            capacity: 0.0,
            ..Default::default()
        });
        let mut state = HouseState::default();
        assert!(BatteryModule.simulate(&mut state, 1.0, Some(&config)).is_err());
    }

    proptest! {
        #[test]
        fn prop_soc_stays_within_capacity(
            steps in proptest::collection::vec((0.0f64..12.0, 0.0f64..12.0), 1..100),
            capacity in 5.0f64..50.0,
            efficiency in 0.8f64..0.98,
        ) {
            let config = BatteryConfig { capacity, efficiency, ..Default::default() };
            let mut e = EnergyState::default();
            for (solar, load) in steps {
                e.reset_hourly();
                e.solar_kwh = solar;
                e.heat_pump_kwh = load;
                dispatch(&config, &mut e, 1.0).unwrap();
                prop_assert!(e.battery_kwh >= 0.0);
                prop_assert!(e.battery_kwh <= capacity);
            }
        }
    }
}
