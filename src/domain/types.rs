use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ============================================================================
// Calendar Helper Types
// ============================================================================

/// Astronomical season used to pick climate profile ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Meteorological season for a day of year (1-365)
    pub fn from_day_of_year(day_of_year: u32) -> Self {
        match day_of_year {
            d if d >= 355 || d <= 60 => Season::Winter,
            61..=152 => Season::Spring,
            153..=244 => Season::Summer,
            _ => Season::Fall,
        }
    }
}

// ============================================================================
// House State
// ============================================================================

/// Geographic position of the dwelling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    /// Catalog city id, selects the enhanced climate profile
    pub city_id: Option<String>,
    pub city_name: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        // Denver
        Self {
            lat: 39.7392,
            lon: -104.9903,
            city_id: None,
            city_name: None,
        }
    }
}

/// Outdoor conditions, overwritten by the climate generator every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutdoorConditions {
    /// °C
    pub temperature: f64,
    /// Relative humidity as a fraction (0-1)
    pub humidity: f64,
    /// W/m²
    pub solar_radiation: f64,
    /// AQI units, higher is worse
    pub air_quality_index: f64,
    /// m/s
    pub wind_speed: f64,
}

impl Default for OutdoorConditions {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 0.45,
            solar_radiation: 800.0,
            air_quality_index: 50.0,
            wind_speed: 2.0,
        }
    }
}

/// Indoor conditions, mutated incrementally by physics and modules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndoorConditions {
    /// °C
    pub temperature: f64,
    /// Relative humidity as a fraction, kept within [0.2, 0.8]
    pub humidity: f64,
    /// Normalized air quality, kept within [0.3, 1.0]
    pub air_quality: f64,
}

impl IndoorConditions {
    pub const MIN_HUMIDITY: f64 = 0.2;
    pub const MAX_HUMIDITY: f64 = 0.8;
    pub const MIN_AIR_QUALITY: f64 = 0.3;
    pub const MAX_AIR_QUALITY: f64 = 1.0;

    /// Force humidity and air quality back into their physical bands
    pub fn clamp_bands(&mut self) {
        self.humidity = self.humidity.clamp(Self::MIN_HUMIDITY, Self::MAX_HUMIDITY);
        self.air_quality = self
            .air_quality
            .clamp(Self::MIN_AIR_QUALITY, Self::MAX_AIR_QUALITY);
    }
}

impl Default for IndoorConditions {
    fn default() -> Self {
        Self {
            temperature: 21.0,
            humidity: 0.4,
            air_quality: 0.9,
        }
    }
}

/// Static building geometry and insulation, read-only during a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingEnvelope {
    /// m²
    pub floor_area: f64,
    /// m²·K/W
    pub wall_r: f64,
    pub roof_r: f64,
    pub floor_r: f64,
    /// W/m²·K
    pub window_u: f64,
    /// m²
    pub window_area: f64,
    /// Air changes per hour
    pub infiltration_rate: f64,
}

impl BuildingEnvelope {
    pub const CEILING_HEIGHT_M: f64 = 2.5;

    pub fn volume_m3(&self) -> f64 {
        self.floor_area * Self::CEILING_HEIGHT_M
    }

    /// Simplified lumped thermal mass used to turn kWh into °C
    pub fn thermal_proxy_kwh_per_k(&self) -> f64 {
        self.floor_area * 0.3
    }
}

impl Default for BuildingEnvelope {
    fn default() -> Self {
        Self {
            floor_area: 150.0,
            wall_r: 5.0,
            roof_r: 7.0,
            floor_r: 4.0,
            window_u: 0.8,
            window_area: 20.0,
            infiltration_rate: 0.3,
        }
    }
}

/// Per-category energy flows for the current hour.
///
/// Every counter except `battery_kwh` is reset at the start of a tick.
/// `battery_kwh` is the persistent state of charge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyState {
    pub heat_pump_kwh: f64,
    pub erv_kwh: f64,
    pub solar_kwh: f64,
    pub battery_kwh: f64,
    /// Grid exchange after the battery, import > 0, export < 0
    pub net_kwh: f64,
}

impl EnergyState {
    /// Zero the hour-local counters, keep the battery state of charge
    pub fn reset_hourly(&mut self) {
        self.heat_pump_kwh = 0.0;
        self.erv_kwh = 0.0;
        self.solar_kwh = 0.0;
        self.net_kwh = 0.0;
    }

    pub fn consumption_kwh(&self) -> f64 {
        self.heat_pump_kwh + self.erv_kwh
    }

    pub fn generation_kwh(&self) -> f64 {
        self.solar_kwh
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyState {
    pub sprinklers_active: bool,
    pub smoke_event: bool,
}

/// The single mutable aggregate stepped by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseState {
    /// Simulated hour of day (0-23)
    pub time: u32,
    pub date: NaiveDate,
    pub season: Season,
    pub seasonal_date_id: Option<String>,
    pub day_length_h: Option<f64>,
    pub solar_elevation_deg: Option<f64>,
    pub location: Location,
    pub outdoor: OutdoorConditions,
    pub indoor: IndoorConditions,
    pub envelope: BuildingEnvelope,
    pub energy: EnergyState,
    pub safety: SafetyState,
    /// Derived comfort score (0-100)
    pub comfort_score: u8,
}

impl Default for HouseState {
    fn default() -> Self {
        Self {
            time: 12,
            // Summer solstice
            date: NaiveDate::from_ymd_opt(2025, 6, 21).unwrap_or_default(),
            season: Season::Summer,
            seasonal_date_id: None,
            day_length_h: None,
            solar_elevation_deg: None,
            location: Location::default(),
            outdoor: OutdoorConditions::default(),
            indoor: IndoorConditions::default(),
            envelope: BuildingEnvelope::default(),
            energy: EnergyState::default(),
            safety: SafetyState::default(),
            comfort_score: 100,
        }
    }
}

impl HouseState {
    /// Default state with the envelope taken from configuration
    pub fn with_envelope(envelope: BuildingEnvelope) -> Self {
        Self {
            envelope,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_boundaries() {
        assert_eq!(Season::from_day_of_year(355), Season::Winter);
        assert_eq!(Season::from_day_of_year(15), Season::Winter);
        assert_eq!(Season::from_day_of_year(79), Season::Spring);
        assert_eq!(Season::from_day_of_year(172), Season::Summer);
        assert_eq!(Season::from_day_of_year(266), Season::Fall);
    }

    #[test]
    fn test_reset_hourly_keeps_battery() {
        let mut energy = EnergyState {
            heat_pump_kwh: 1.0,
            erv_kwh: 0.2,
            solar_kwh: 3.0,
            battery_kwh: 12.5,
            net_kwh: -1.8,
        };
        energy.reset_hourly();
        assert_eq!(energy.heat_pump_kwh, 0.0);
        assert_eq!(energy.erv_kwh, 0.0);
        assert_eq!(energy.solar_kwh, 0.0);
        assert_eq!(energy.net_kwh, 0.0);
        assert_eq!(energy.battery_kwh, 12.5);
    }

    #[test]
    fn test_partial_state_deserializes_with_defaults() {
        let state: HouseState =
            serde_json::from_str(r#"{"time": 5, "indoor": {"temperature": 18.5}}"#).unwrap();
        assert_eq!(state.time, 5);
        assert_eq!(state.indoor.temperature, 18.5);
        assert_eq!(state.indoor.humidity, 0.4);
        assert_eq!(state.envelope.floor_area, 150.0);
    }

    #[test]
    fn test_clamp_bands() {
        let mut indoor = IndoorConditions {
            temperature: 21.0,
            humidity: 0.95,
            air_quality: 0.1,
        };
        indoor.clamp_bands();
        assert_eq!(indoor.humidity, 0.8);
        assert_eq!(indoor.air_quality, 0.3);
    }
}
