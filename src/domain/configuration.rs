//! Building envelope and HVAC equipment parameters.
//!
//! A `Configuration` is the user-editable description of the house. The
//! simulator takes a snapshot at construction and re-pulls it only on an
//! explicit `sync_config_changes` call.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use validator::{Validate, ValidationError};

use crate::domain::modules::{BatteryConfig, ErvConfig, SolarConfig};
use crate::domain::types::BuildingEnvelope;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BuildingConfig {
    /// m²
    #[validate(range(min = 50.0, max = 500.0, message = "Valid range: 50 - 500 m²"))]
    pub floor_area: f64,
    /// m²·K/W
    #[validate(range(min = 2.0, max = 10.0, message = "Valid range: 2 - 10 m²·K/W"))]
    pub wall_r: f64,
    #[validate(range(min = 3.0, max = 15.0, message = "Valid range: 3 - 15 m²·K/W"))]
    pub roof_r: f64,
    #[validate(range(min = 2.0, max = 8.0, message = "Valid range: 2 - 8 m²·K/W"))]
    pub floor_r: f64,
    /// W/m²·K
    #[validate(range(min = 0.4, max = 2.0, message = "Valid range: 0.4 - 2 W/m²·K"))]
    pub window_u: f64,
    #[validate(range(min = 5.0, max = 50.0, message = "Valid range: 5 - 50 m²"))]
    pub window_area: f64,
    /// ACH
    #[validate(range(min = 0.1, max = 1.0, message = "Valid range: 0.1 - 1 ACH"))]
    pub infiltration_rate: f64,
    /// m
    #[validate(range(min = 2.2, max = 3.5, message = "Valid range: 2.2 - 3.5 m"))]
    pub ceiling_height: f64,
}

impl Default for BuildingConfig {
    fn default() -> Self {
        // Passive House family home
        Self {
            floor_area: 150.0,
            wall_r: 5.0,
            roof_r: 7.0,
            floor_r: 4.0,
            window_u: 0.8,
            window_area: 20.0,
            infiltration_rate: 0.3,
            ceiling_height: 2.5,
        }
    }
}

impl BuildingConfig {
    pub fn volume_m3(&self) -> f64 {
        self.floor_area * self.ceiling_height
    }

    pub fn window_to_floor_ratio_pct(&self) -> f64 {
        self.window_area / self.floor_area * 100.0
    }

    pub fn envelope(&self) -> BuildingEnvelope {
        BuildingEnvelope {
            floor_area: self.floor_area,
            wall_r: self.wall_r,
            roof_r: self.roof_r,
            floor_r: self.floor_r,
            window_u: self.window_u,
            window_area: self.window_area,
            infiltration_rate: self.infiltration_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_target_band"))]
pub struct HeatPumpSpec {
    /// kW
    #[validate(range(min = 1.0, max = 10.0, message = "Valid range: 1 - 10 kW"))]
    pub capacity: f64,
    #[validate(range(min = 2.0, max = 6.0, message = "Valid range: 2 - 6"))]
    pub cop_heating: f64,
    #[validate(range(min = 2.5, max = 7.0, message = "Valid range: 2.5 - 7"))]
    pub cop_cooling: f64,
    /// °C
    #[validate(range(min = 16.0, max = 22.0, message = "Valid range: 16 - 22 °C"))]
    pub target_temp_min: f64,
    #[validate(range(min = 20.0, max = 26.0, message = "Valid range: 20 - 26 °C"))]
    pub target_temp_max: f64,
}

fn validate_target_band(spec: &HeatPumpSpec) -> Result<(), ValidationError> {
    if spec.target_temp_min > spec.target_temp_max {
        let mut err = ValidationError::new("target_band");
        err.message = Some("target_temp_min must not exceed target_temp_max".into());
        return Err(err);
    }
    Ok(())
}

impl Default for HeatPumpSpec {
    fn default() -> Self {
        Self {
            capacity: 10.0,
            cop_heating: 3.5,
            cop_cooling: 4.0,
            target_temp_min: 19.0,
            target_temp_max: 22.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HvacConfig {
    #[validate(nested)]
    pub heat_pump: HeatPumpSpec,
    #[validate(nested)]
    pub erv: ErvConfig,
    #[validate(nested)]
    pub solar: SolarConfig,
    #[validate(nested)]
    pub battery: BatteryConfig,
}

/// Occupancy and internal heat sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BuildingZones {
    #[validate(range(min = 1, max = 20))]
    pub occupancy: u32,
    /// W per person
    pub people_w: f64,
    /// W/m²
    pub lighting_w_m2: f64,
    /// W/m²
    pub equipment_w_m2: f64,
}

impl Default for BuildingZones {
    fn default() -> Self {
        Self {
            occupancy: 4,
            people_w: 70.0,
            lighting_w_m2: 3.0,
            equipment_w_m2: 5.0,
        }
    }
}

impl BuildingZones {
    pub fn total_internal_gains_w(&self, floor_area: f64) -> f64 {
        self.occupancy as f64 * self.people_w
            + floor_area * (self.lighting_w_m2 + self.equipment_w_m2)
    }
}

/// Linear thermal bridge coefficients in W/K
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ThermalBridges {
    #[validate(range(min = 0.0))]
    pub foundation: f64,
    #[validate(range(min = 0.0))]
    pub balcony: f64,
    #[validate(range(min = 0.0))]
    pub roof: f64,
    #[validate(range(min = 0.0))]
    pub windows: f64,
}

impl Default for ThermalBridges {
    fn default() -> Self {
        Self {
            foundation: 8.0,
            balcony: 2.0,
            roof: 4.0,
            windows: 6.0,
        }
    }
}

impl ThermalBridges {
    pub fn total_w_per_k(&self) -> f64 {
        self.foundation + self.balcony + self.roof + self.windows
    }
}

/// Named starting points for common construction standards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    /// Just meets the Passive House standard
    MinimalPh,
    /// Exceeds the standard
    PremiumPh,
    /// EnerPHit retrofit
    Retrofit,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Configuration {
    #[validate(nested)]
    pub building: BuildingConfig,
    #[validate(nested)]
    pub hvac: HvacConfig,
    #[validate(nested)]
    pub zones: BuildingZones,
    #[validate(nested)]
    pub thermal_bridges: ThermalBridges,
}

impl Configuration {
    /// Validate every section, reporting the first offending field with its range
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(first_out_of_range)
    }

    pub fn total_internal_gains_w(&self) -> f64 {
        self.zones.total_internal_gains_w(self.building.floor_area)
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        match preset {
            Preset::MinimalPh => {
                self.building.wall_r = 4.0;
                self.building.roof_r = 6.0;
                self.building.window_u = 1.0;
                self.hvac.heat_pump.capacity = 2.0;
                self.hvac.erv.efficiency = 0.75;
            }
            Preset::PremiumPh => {
                self.building.wall_r = 8.0;
                self.building.roof_r = 12.0;
                self.building.window_u = 0.6;
                self.hvac.heat_pump.capacity = 2.5;
                self.hvac.erv.efficiency = 0.85;
            }
            Preset::Retrofit => {
                self.building.wall_r = 3.0;
                self.building.roof_r = 4.5;
                self.building.window_u = 1.2;
                self.building.infiltration_rate = 0.6;
                self.hvac.heat_pump.capacity = 4.0;
            }
        }
    }
}

/// Flatten validator's nested error tree into the first field that failed
pub(crate) fn first_out_of_range(errors: validator::ValidationErrors) -> ConfigError {
    fn walk(
        section: &str,
        errors: &validator::ValidationErrors,
    ) -> Option<(String, String, String)> {
        for (field, kind) in errors.errors() {
            match kind {
                validator::ValidationErrorsKind::Field(list) => {
                    if let Some(e) = list.first() {
                        let message = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string());
                        return Some((section.to_string(), field.to_string(), message));
                    }
                }
                validator::ValidationErrorsKind::Struct(inner) => {
                    if let Some(found) = walk(field, inner) {
                        return Some(found);
                    }
                }
                validator::ValidationErrorsKind::List(items) => {
                    for inner in items.values() {
                        if let Some(found) = walk(field, inner) {
                            return Some(found);
                        }
                    }
                }
            }
        }
        None
    }

    match walk("configuration", &errors) {
        Some((section, field, message)) => ConfigError::OutOfRange {
            section,
            field,
            message,
        },
        None => ConfigError::Invalid(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_configuration_is_valid() {
        assert!(Configuration::default().check().is_ok());
    }

    #[test]
    fn test_derived_quantities() {
        let config = Configuration::default();
        assert_eq!(config.building.volume_m3(), 375.0);
        assert_eq!(config.total_internal_gains_w(), 1480.0);
        assert_eq!(config.thermal_bridges.total_w_per_k(), 20.0);
    }

    #[test]
    fn test_out_of_range_reports_valid_range() {
        let mut config = Configuration::default();
        config.building.floor_area = 20.0;
        match config.check() {
            Err(ConfigError::OutOfRange {
                section,
                field,
                message,
            }) => {
                assert_eq!(section, "building");
                assert_eq!(field, "floor_area");
                assert!(message.contains("50 - 500"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_inverted_target_band_rejected() {
        let mut config = Configuration::default();
        config.hvac.heat_pump.target_temp_min = 22.0;
        config.hvac.heat_pump.target_temp_max = 20.0;
        assert!(config.check().is_err());
    }

    #[rstest]
    #[case(Preset::MinimalPh, 4.0, 2.0)]
    #[case(Preset::PremiumPh, 8.0, 2.5)]
    #[case(Preset::Retrofit, 3.0, 4.0)]
    fn test_presets(#[case] preset: Preset, #[case] wall_r: f64, #[case] capacity: f64) {
        let mut config = Configuration::default();
        config.apply_preset(preset);
        assert_eq!(config.building.wall_r, wall_r);
        assert_eq!(config.hvac.heat_pump.capacity, capacity);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_preset_names() {
        assert_eq!("premium-ph".parse::<Preset>().unwrap(), Preset::PremiumPh);
        assert_eq!(Preset::Retrofit.to_string(), "retrofit");
    }
}
