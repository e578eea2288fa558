//! # Climate Generator
//!
//! Hourly outdoor conditions for a catalog city on a seasonal reference date.
//! Output is a pure function of (seed, city, date, hour). When no city is
//! selected, or an id is unknown, callers fall back to [`legacy_climate`].

pub mod catalog;
pub mod solar;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::domain::{OutdoorConditions, Season};
use crate::error::ClimateError;

pub use catalog::{city_by_id, seasonal_date_by_id, City, ClimateProfile, SeasonalDate, CITIES, SEASONAL_DATES};

/// One hour of generated weather plus solar diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedClimateData {
    pub hour: u32,
    pub temperature: f64,
    pub humidity: f64,
    pub solar_radiation: f64,
    pub air_quality_index: f64,
    pub wind_speed: f64,
    /// Degrees above the horizon
    pub solar_elevation: f64,
    /// Hours of daylight
    pub day_length: f64,
    pub season: Season,
    pub city_id: String,
    pub seasonal_date: NaiveDate,
}

impl EnhancedClimateData {
    pub fn outdoor(&self) -> OutdoorConditions {
        OutdoorConditions {
            temperature: self.temperature,
            humidity: self.humidity,
            solar_radiation: self.solar_radiation,
            air_quality_index: self.air_quality_index,
            wind_speed: self.wind_speed,
        }
    }
}

/// Degraded-mode weather (no wind component)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyClimate {
    pub temperature: f64,
    pub humidity: f64,
    pub solar_radiation: f64,
    pub air_quality_index: f64,
}

impl LegacyClimate {
    /// Overwrite the fields this model knows about, keep wind as-is
    pub fn apply_to(&self, outdoor: &mut OutdoorConditions) {
        outdoor.temperature = self.temperature;
        outdoor.humidity = self.humidity;
        outdoor.solar_radiation = self.solar_radiation;
        outdoor.air_quality_index = self.air_quality_index;
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fixed Denver-like summer sinusoid, used whenever the catalog path is unavailable
pub fn legacy_climate(hour: u32) -> LegacyClimate {
    let h = hour as f64;

    let temperature = round_to(25.0 + 7.5 * ((h - 6.0) / 24.0 * 2.0 * PI).sin(), 1);
    let humidity = round_to(0.6 - (temperature - 15.0) * 0.01, 2);
    let solar_radiation = if (6..=18).contains(&hour) {
        (1000.0 * ((h - 6.0) / 12.0 * PI).sin()).round().max(0.0)
    } else {
        0.0
    };
    let air_quality_index = (50.0 + (h * 0.5).sin() * 10.0).round();

    LegacyClimate {
        temperature,
        humidity,
        solar_radiation,
        air_quality_index,
    }
}

/// Climate generator with an explicit cloud-cover seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimateGenerator {
    seed: u64,
}

impl Default for ClimateGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}

impl ClimateGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate(
        &self,
        city_id: &str,
        seasonal_date_id: &str,
        hour: u32,
    ) -> Result<EnhancedClimateData, ClimateError> {
        let city = city_by_id(city_id).ok_or_else(|| ClimateError::UnknownCity(city_id.to_string()))?;
        let date = seasonal_date_by_id(seasonal_date_id)
            .ok_or_else(|| ClimateError::UnknownSeasonalDate(seasonal_date_id.to_string()))?;
        if hour > 23 {
            return Err(ClimateError::InvalidHour(hour));
        }
        let seasonal_date = NaiveDate::parse_from_str(date.date, "%Y-%m-%d")
            .map_err(|_| ClimateError::UnknownSeasonalDate(seasonal_date_id.to_string()))?;

        let climate = &city.climate;
        let season = Season::from_day_of_year(date.day_of_year);
        let range = climate.temperature_range(season);
        let h = hour as f64;

        // Continental climates swing wider, peak around 15:00
        let daily_range = (range.max - range.min) * (1.0 + climate.continentality * 0.3);
        let temperature = range.min + daily_range / 2.0 * (1.0 + ((h - 6.0) / 24.0 * 2.0 * PI).sin());

        // Humidity falls as the day warms, damped near the sea
        let diurnal_position = if daily_range > 0.0 {
            (temperature - range.min) / daily_range
        } else {
            0.0
        };
        let humidity = climate.base_humidity(season)
            - diurnal_position * 0.2 * (1.0 - climate.maritime_influence);

        let solar_elevation = solar::solar_elevation_deg(city.lat, date.solar_declination, h);
        let day_length = solar::day_length_h(city.lat, date.solar_declination);

        let base_aqi = climate.aqi_typical + climate.pollution_level * 30.0;
        let air_quality_index =
            (base_aqi + ((h - 8.0) * 0.5).sin() * climate.aqi_variation).max(20.0);

        let cloud = solar::cloud_factor(self.seed, city.id, city.lat, season, hour);
        let solar_radiation =
            solar::solar_radiation(solar_elevation, city.lat, season, air_quality_index, cloud);

        let wind_speed = 2.0 + (h * 0.3).sin() * 3.0 * (1.0 - climate.maritime_influence);

        Ok(EnhancedClimateData {
            hour,
            temperature: round_to(temperature, 1),
            humidity: round_to(humidity, 2).clamp(0.2, 0.95),
            solar_radiation,
            air_quality_index: air_quality_index.round(),
            wind_speed: round_to(wind_speed, 1),
            solar_elevation: round_to(solar_elevation, 1),
            day_length,
            season,
            city_id: city.id.to_string(),
            seasonal_date,
        })
    }
}
