//! Synthesized multi-day weather shared by both comparison runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::f64::consts::PI;

use crate::domain::OutdoorConditions;

const DAYS_PER_YEAR: f64 = 365.0;

/// Jitter standard deviations; draws are clamped to ±2σ
const TEMPERATURE_SIGMA_C: f64 = 1.5;
const RADIATION_SIGMA_W_M2: f64 = 60.0;
const AQI_SIGMA: f64 = 8.0;
const JITTER_BOUND_SIGMAS: f64 = 2.0;

pub type DayWeather = [OutdoorConditions; 24];

/// Seasonal sinusoid by day of year plus a diurnal sinusoid by hour,
/// perturbed by bounded seeded jitter
#[derive(Debug, Clone)]
pub struct WeatherSynthesizer {
    rng: StdRng,
}

/// Zero-mean normal draw with standard deviation `sigma`, clamped to ±2σ
fn bounded(rng: &mut StdRng, sigma: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    z.clamp(-JITTER_BOUND_SIGMAS, JITTER_BOUND_SIGMAS) * sigma
}

/// Daily mean temperature, coldest mid-January, warmest mid-July (°C)
pub fn seasonal_mean_temperature(day_of_year: u32) -> f64 {
    10.0 + 12.0 * (2.0 * PI * (day_of_year as f64 - 105.0) / DAYS_PER_YEAR).sin()
}

/// Clear-sky noon radiation for the day (W/m²)
pub fn seasonal_peak_radiation(day_of_year: u32) -> f64 {
    650.0 + 300.0 * (2.0 * PI * (day_of_year as f64 - 80.0) / DAYS_PER_YEAR).sin()
}

impl WeatherSynthesizer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Twenty-four hours of weather for `day_of_year` (1-365, wraps)
    pub fn day(&mut self, day_of_year: u32) -> DayWeather {
        let day_of_year = (day_of_year.max(1) - 1) % 365 + 1;
        let mean = seasonal_mean_temperature(day_of_year);
        let peak = seasonal_peak_radiation(day_of_year);
        let day_offset = bounded(&mut self.rng, TEMPERATURE_SIGMA_C);

        let mut hours = [OutdoorConditions::default(); 24];
        for (hour, slot) in hours.iter_mut().enumerate() {
            let h = hour as f64;
            // Diurnal swing peaks at 15:00
            let temperature = mean + day_offset + 6.0 * ((h - 9.0) / 24.0 * 2.0 * PI).sin();
            let solar_radiation = if (6..=18).contains(&hour) {
                let clear = peak * ((h - 6.0) / 12.0 * PI).sin();
                (clear + bounded(&mut self.rng, RADIATION_SIGMA_W_M2)).max(0.0)
            } else {
                0.0
            };
            let air_quality_index =
                (50.0 + 15.0 * (h * 0.5).sin() + bounded(&mut self.rng, AQI_SIGMA)).max(20.0);

            *slot = OutdoorConditions {
                temperature,
                humidity: (0.6 - (temperature - 15.0) * 0.01).clamp(0.2, 0.9),
                solar_radiation,
                air_quality_index,
                wind_speed: 2.0 + (h * 0.3).sin(),
            };
        }
        hours
    }

    /// Consecutive days starting at `start_day_of_year`
    pub fn days(&mut self, start_day_of_year: u32, count: u32) -> Vec<DayWeather> {
        (0..count).map(|d| self.day(start_day_of_year + d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_weather() {
        let a = WeatherSynthesizer::new(3).days(100, 3);
        let b = WeatherSynthesizer::new(3).days(100, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_night_has_no_sun() {
        let day = WeatherSynthesizer::new(1).day(172);
        assert_eq!(day[2].solar_radiation, 0.0);
        assert_eq!(day[22].solar_radiation, 0.0);
        assert!(day[12].solar_radiation > 500.0);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut synth = WeatherSynthesizer::new(99);
        for d in 0..50 {
            let day = synth.day(d * 7);
            let mean = seasonal_mean_temperature((d * 7).max(1));
            for (hour, w) in day.iter().enumerate() {
                let diurnal = 6.0 * ((hour as f64 - 9.0) / 24.0 * 2.0 * PI).sin();
                assert!((w.temperature - mean - diurnal).abs() <= 2.0 * TEMPERATURE_SIGMA_C + 1e-9);
                assert!(w.air_quality_index >= 20.0);
                assert!(w.temperature.is_finite());
            }
        }
    }

    #[test]
    fn test_winter_colder_than_summer() {
        assert!(seasonal_mean_temperature(15) < seasonal_mean_temperature(196));
    }
}
