//! # House Physics Simulation
//!
//! Everything that happens to the house within one simulated hour.
//!
//! ## Components
//!
//! - **Physics**: Envelope conduction, infiltration and air drift, applied unconditionally
//! - **Modules**: Heat pump, ERV, solar and battery devices behind the [`SimulationModule`] trait
//! - **Energy balance**: Diagnostic loss/gain ledger in the Passive House layout
//! - **Comfort**: Occupant comfort score derived from the indoor state
//!
//! ## Usage
//!
//! ```rust
//! use henri_home_sim::domain::{HouseState, ModuleConfig, HeatPumpConfig};
//! use henri_home_sim::simulation::{HeatPumpModule, SimulationModule};
//!
//! let mut state = HouseState::default();
//! state.indoor.temperature = 18.0;
//!
//! let config = ModuleConfig::HeatPump(HeatPumpConfig::default());
//! HeatPumpModule.simulate(&mut state, 1.0, Some(&config)).unwrap();
//!
//! assert!(state.indoor.temperature > 18.0);
//! assert!(state.energy.heat_pump_kwh > 0.0);
//! ```

pub mod battery;
pub mod comfort;
pub mod energy_balance;
pub mod erv;
pub mod heat_pump;
pub mod module;
pub mod physics;
pub mod solar;

pub use battery::{BatteryModule, Dispatch};
pub use comfort::comfort_score;
pub use energy_balance::{EnergyBalance, EnergyBalanceCalculator, HvacMetrics, PassiveHouseMetrics};
pub use erv::ErvModule;
pub use heat_pump::HeatPumpModule;
pub use module::{ModuleRegistry, RegisteredModule, SimulationModule};
pub use physics::{apply_passive_physics, EnvelopeLosses, PassiveInputs, PassiveStepReport};
pub use solar::SolarModule;

/// The four standard devices in their fixed execution order
pub fn default_modules() -> Vec<Box<dyn SimulationModule>> {
    vec![
        Box::new(HeatPumpModule),
        Box::new(ErvModule),
        Box::new(SolarModule),
        Box::new(BatteryModule),
    ]
}
