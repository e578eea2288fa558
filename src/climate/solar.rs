//! # Solar Geometry and Irradiance
//!
//! Solar elevation, day length and surface irradiance for a latitude, a
//! declination and an hour of day. Cloud cover is drawn from a seeded RNG
//! keyed on city, season and a 3-hour time bucket, so the same inputs always
//! produce the same radiation.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::domain::Season;

/// Solar constant at the top of the atmosphere (W/m²)
pub const SOLAR_CONSTANT: f64 = 1361.0;

/// Clear-air transmission per unit air mass
const BASE_TRANSMISSION: f64 = 0.78;

/// Latitude of Denver, used for the high-altitude clear-air bonus
const HIGH_ALTITUDE_LAT: f64 = 39.74;

/// Hours sharing one cloud draw
const CLOUD_BUCKET_HOURS: u32 = 3;

/// Cloud cover level affecting solar radiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudCover {
    Clear,
    PartlyCloudy,
    Overcast,
}

impl CloudCover {
    /// Radiation transmission factor (0.0 = blocked, 1.0 = full)
    pub fn transmission_factor(&self) -> f64 {
        match self {
            CloudCover::Clear => 0.95,
            CloudCover::PartlyCloudy => 0.7,
            CloudCover::Overcast => 0.3,
        }
    }

    /// Draw cover for a high-altitude dry climate (~300 sunny days a year)
    pub fn draw<R: Rng>(rng: &mut R, season: Season) -> Self {
        let (clear, partly) = match season {
            Season::Winter => (0.7, 0.2),
            _ => (0.8, 0.15),
        };
        let roll: f64 = rng.gen();
        if roll < clear {
            CloudCover::Clear
        } else if roll < clear + partly {
            CloudCover::PartlyCloudy
        } else {
            CloudCover::Overcast
        }
    }
}

fn is_high_altitude(latitude_deg: f64) -> bool {
    (latitude_deg - HIGH_ALTITUDE_LAT).abs() < 1.0
}

/// Solar elevation above the horizon in degrees, never negative
pub fn solar_elevation_deg(latitude_deg: f64, declination_deg: f64, hour: f64) -> f64 {
    let lat = latitude_deg.to_radians();
    let decl = declination_deg.to_radians();
    // Solar noon = 0, morning negative
    let hour_angle = ((hour - 12.0) * 15.0).to_radians();

    let elevation = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos())
        .clamp(-1.0, 1.0)
        .asin();
    (elevation * 180.0 / PI).max(0.0)
}

/// Hours of daylight, saturating at polar night (0) and polar day (24)
pub fn day_length_h(latitude_deg: f64, declination_deg: f64) -> f64 {
    let cos_hour_angle = -latitude_deg.to_radians().tan() * declination_deg.to_radians().tan();
    if cos_hour_angle > 1.0 {
        return 0.0;
    }
    if cos_hour_angle < -1.0 {
        return 24.0;
    }
    let day_length = 2.0 * cos_hour_angle.acos() * 12.0 / PI;
    (day_length * 10.0).round() / 10.0
}

/// Stable 64-bit FNV-1a, independent of std's randomized hasher
fn fnv1a(bytes: &[u8], mut hash: u64) -> u64 {
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Deterministic cloud transmission factor for a city, season and hour.
///
/// Near Denver the cover is drawn per 3-hour bucket from `seed`; elsewhere a
/// latitude-dependent constant cloudiness applies.
pub fn cloud_factor(seed: u64, city_id: &str, latitude_deg: f64, season: Season, hour: u32) -> f64 {
    if !is_high_altitude(latitude_deg) {
        let base_cloudiness = 0.2 + 0.3 * (latitude_deg / 180.0 * PI).sin();
        return 1.0 - base_cloudiness * 0.6;
    }

    let bucket = hour / CLOUD_BUCKET_HOURS;
    let mut key = fnv1a(city_id.as_bytes(), 0xcbf2_9ce4_8422_2325 ^ seed);
    key = fnv1a(season.to_string().as_bytes(), key);
    key = fnv1a(&bucket.to_le_bytes(), key);

    let mut rng = StdRng::seed_from_u64(key);
    CloudCover::draw(&mut rng, season).transmission_factor()
}

fn seasonal_factor(season: Season) -> f64 {
    match season {
        Season::Winter => 0.95,
        Season::Summer => 1.0,
        _ => 0.98,
    }
}

/// Surface irradiance in W/m², rounded to the nearest watt
pub fn solar_radiation(
    elevation_deg: f64,
    latitude_deg: f64,
    season: Season,
    air_quality_index: f64,
    cloud_factor: f64,
) -> f64 {
    if elevation_deg <= 0.0 {
        return 0.0;
    }

    let elevation_factor = elevation_deg.to_radians().sin();
    let air_mass = 1.0 / (elevation_factor + 0.01);
    let altitude_bonus = if is_high_altitude(latitude_deg) { 1.1 } else { 1.0 };
    let transmission = BASE_TRANSMISSION.powf(air_mass) * altitude_bonus;

    // Smog attenuates, but not below half
    let aqi_factor = (1.0 - (air_quality_index - 50.0) / 300.0).max(0.5);

    let radiation = SOLAR_CONSTANT
        * elevation_factor
        * transmission
        * aqi_factor
        * seasonal_factor(season)
        * cloud_factor;
    radiation.max(0.0).round()
}
