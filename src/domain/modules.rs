//! Device module identities and their control knobs.
//!
//! Module configuration is a tagged union over the four known device shapes,
//! dispatched by module name at the simulator boundary.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use validator::Validate;

/// Registered name of a device module
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum ModuleKind {
    HeatPump,
    Erv,
    Solar,
    Battery,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HeatPumpConfig {
    /// °C
    #[validate(range(min = 16.0, max = 26.0, message = "Valid range: 16 - 26 °C"))]
    pub target_temperature: f64,
    /// Coefficient of performance
    #[validate(range(min = 2.0, max = 6.0, message = "Valid range: 2 - 6"))]
    pub efficiency: f64,
    /// kW thermal
    #[validate(range(min = 1.0, max = 10.0, message = "Valid range: 1 - 10 kW"))]
    pub capacity: f64,
}

impl HeatPumpConfig {
    pub const NOMINAL_TARGET_C: f64 = 21.0;
    pub const NOMINAL_COP: f64 = 3.5;
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            target_temperature: Self::NOMINAL_TARGET_C,
            efficiency: Self::NOMINAL_COP,
            capacity: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ErvConfig {
    /// Heat recovery efficiency (0-1)
    #[validate(range(min = 0.5, max = 0.95, message = "Valid range: 0.5 - 0.95"))]
    pub efficiency: f64,
    /// m³/h
    #[validate(range(min = 50.0, max = 300.0, message = "Valid range: 50 - 300 m³/h"))]
    pub flow_rate: f64,
    /// W
    #[validate(range(min = 20.0, max = 150.0, message = "Valid range: 20 - 150 W"))]
    pub fan_power: f64,
}

impl ErvConfig {
    pub const NOMINAL_EFFICIENCY: f64 = 0.7;
    pub const NOMINAL_FLOW_RATE: f64 = 200.0;
}

impl Default for ErvConfig {
    fn default() -> Self {
        Self {
            efficiency: Self::NOMINAL_EFFICIENCY,
            flow_rate: Self::NOMINAL_FLOW_RATE,
            fan_power: 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SolarConfig {
    /// m² of PV panels
    #[validate(range(min = 10.0, max = 100.0, message = "Valid range: 10 - 100 m²"))]
    pub panel_area: f64,
    #[validate(range(min = 0.15, max = 0.25, message = "Valid range: 0.15 - 0.25"))]
    pub efficiency: f64,
    #[validate(range(min = 0.9, max = 0.98, message = "Valid range: 0.9 - 0.98"))]
    pub inverter_efficiency: f64,
    /// Window solar heat gain coefficient
    #[validate(range(min = 0.2, max = 0.7, message = "Valid range: 0.2 - 0.7"))]
    pub window_shgc: f64,
    /// 1.0 = due south
    #[validate(range(min = 0.0, max = 1.0, message = "Valid range: 0 - 1"))]
    pub orientation_factor: f64,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            panel_area: 40.0,
            efficiency: 0.2,
            inverter_efficiency: 0.95,
            window_shgc: 0.4,
            orientation_factor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BatteryConfig {
    /// kWh
    #[validate(range(min = 5.0, max = 50.0, message = "Valid range: 5 - 50 kWh"))]
    pub capacity: f64,
    /// kW
    #[validate(range(min = 1.0, max = 10.0, message = "Valid range: 1 - 10 kW"))]
    pub charge_rate: f64,
    /// kW
    #[validate(range(min = 1.0, max = 10.0, message = "Valid range: 1 - 10 kW"))]
    pub discharge_rate: f64,
    /// Round-trip efficiency
    #[validate(range(min = 0.8, max = 0.98, message = "Valid range: 0.8 - 0.98"))]
    pub efficiency: f64,
}

impl BatteryConfig {
    /// State of charge as a percentage of capacity
    pub fn percent(&self, charge_kwh: f64) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        charge_kwh / self.capacity * 100.0
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity: 20.0,
            charge_rate: 5.0,
            discharge_rate: 5.0,
            efficiency: 0.9,
        }
    }
}

/// Configuration slice handed to a single module
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "module", content = "config", rename_all = "camelCase")]
pub enum ModuleConfig {
    HeatPump(HeatPumpConfig),
    Erv(ErvConfig),
    Solar(SolarConfig),
    Battery(BatteryConfig),
}

impl ModuleConfig {
    pub fn kind(&self) -> ModuleKind {
        match self {
            ModuleConfig::HeatPump(_) => ModuleKind::HeatPump,
            ModuleConfig::Erv(_) => ModuleKind::Erv,
            ModuleConfig::Solar(_) => ModuleKind::Solar,
            ModuleConfig::Battery(_) => ModuleKind::Battery,
        }
    }

    pub fn validate_ranges(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            ModuleConfig::HeatPump(c) => c.validate(),
            ModuleConfig::Erv(c) => c.validate(),
            ModuleConfig::Solar(c) => c.validate(),
            ModuleConfig::Battery(c) => c.validate(),
        }
    }
}

/// Control knobs for every device, owned by the simulator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfigs {
    pub heat_pump: HeatPumpConfig,
    pub erv: ErvConfig,
    pub solar: SolarConfig,
    pub battery: BatteryConfig,
}

impl ModuleConfigs {
    /// The slice a module of `kind` receives at simulation time
    pub fn slice_for(&self, kind: ModuleKind) -> ModuleConfig {
        match kind {
            ModuleKind::HeatPump => ModuleConfig::HeatPump(self.heat_pump),
            ModuleKind::Erv => ModuleConfig::Erv(self.erv),
            ModuleKind::Solar => ModuleConfig::Solar(self.solar),
            ModuleKind::Battery => ModuleConfig::Battery(self.battery),
        }
    }

    /// Replace the slice matching the config's variant
    pub fn apply(&mut self, config: ModuleConfig) {
        match config {
            ModuleConfig::HeatPump(c) => self.heat_pump = c,
            ModuleConfig::Erv(c) => self.erv = c,
            ModuleConfig::Solar(c) => self.solar = c,
            ModuleConfig::Battery(c) => self.battery = c,
        }
    }
}
