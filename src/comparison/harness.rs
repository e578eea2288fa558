//! Baseline-versus-Henri multi-day runs over identical weather.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::metrics::{ComparisonMetrics, DailyMetrics, DaySamples, Tariff};
use super::weather::{DayWeather, WeatherSynthesizer};
use crate::climate::ClimateGenerator;
use crate::controller::{Mode, Simulator};
use crate::domain::{configuration::first_out_of_range, Configuration};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ComparisonOptions {
    #[validate(range(min = 1, max = 365))]
    pub days: u32,
    #[validate(range(min = 1, max = 365))]
    pub start_day_of_year: u32,
    /// Weather jitter seed
    pub seed: u64,
    /// Simulated hours between cooperative yields
    #[validate(range(min = 1, max = 24))]
    pub yield_every_hours: u32,
    pub tariff: Tariff,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            days: 7,
            start_day_of_year: 172,
            seed: 42,
            yield_every_hours: 6,
            tariff: Tariff::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub run_id: Uuid,
    pub days: u32,
    pub baseline: Vec<DailyMetrics>,
    pub henri: Vec<DailyMetrics>,
    pub metrics: ComparisonMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arm {
    Baseline,
    Henri,
}

async fn run_arm(
    arm: Arm,
    config: &Configuration,
    weather: &[DayWeather],
    options: &ComparisonOptions,
) -> Result<Vec<DailyMetrics>> {
    let mut sim = Simulator::new(config.clone(), ClimateGenerator::default());
    sim.register_default_modules()?;
    if arm == Arm::Baseline {
        sim.force_mode(Mode::Normal);
    }

    let yield_every = options.yield_every_hours.max(1);
    let mut elapsed_hours = 0u32;
    let mut days = Vec::with_capacity(weather.len());

    for (day, hours) in weather.iter().enumerate() {
        let changes_at_start = sim.engine().mode_changes();
        let mut samples = DaySamples::with_capacity(hours.len());

        for (hour, outdoor) in hours.iter().enumerate() {
            sim.advance_with_outdoor(hour as u32, *outdoor)?;
            let state = sim.state();
            samples.comfort.push(state.comfort_score);
            samples.indoor_temperature.push(state.indoor.temperature);
            samples.consumed_kwh += state.energy.consumption_kwh();
            samples.produced_kwh += state.energy.generation_kwh();
            samples.imported_kwh += state.energy.net_kwh.max(0.0);

            elapsed_hours += 1;
            if elapsed_hours % yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        let adaptive_actions = sim.engine().mode_changes() - changes_at_start;
        days.push(DailyMetrics::from_samples(day as u32, &samples, adaptive_actions, options.tariff));
    }
    Ok(days)
}

/// Run the baseline (Henri pinned to normal) and the adaptive arm.
///
/// Both arms see the same synthesized weather and start from the same
/// default state.
pub async fn run_comparison(config: &Configuration, options: &ComparisonOptions) -> Result<ComparisonReport> {
    config.check()?;
    options
        .validate()
        .map_err(|e| crate::error::SimulationError::Config(first_out_of_range(e)))?;

    let run_id = Uuid::new_v4();
    info!(%run_id, days = options.days, start_day = options.start_day_of_year, seed = options.seed, "comparison started");

    let weather = WeatherSynthesizer::new(options.seed).days(options.start_day_of_year, options.days);
    let baseline = run_arm(Arm::Baseline, config, &weather, options).await?;
    let henri = run_arm(Arm::Henri, config, &weather, options).await?;
    let metrics = ComparisonMetrics::aggregate(&baseline, &henri);

    info!(
        %run_id,
        energy_improvement_pct = metrics.energy.improvement_pct,
        comfort_hours_baseline = metrics.comfort_hours.baseline,
        comfort_hours_henri = metrics.comfort_hours.henri,
        adaptive_actions = metrics.adaptive_actions.henri,
        "comparison finished"
    );

    Ok(ComparisonReport {
        run_id,
        days: options.days,
        baseline,
        henri,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_baseline_takes_no_adaptive_actions() {
        let options = ComparisonOptions {
            days: 2,
            ..Default::default()
        };
        let report = run_comparison(&Configuration::default(), &options).await.unwrap();
        assert_eq!(report.baseline.len(), 2);
        assert_eq!(report.henri.len(), 2);
        assert_eq!(report.metrics.adaptive_actions.baseline, 0.0);
        assert!(report.baseline.iter().all(|d| d.adaptive_actions == 0));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let options = ComparisonOptions {
            days: 0,
            ..Default::default()
        };
        assert!(run_comparison(&Configuration::default(), &options).await.is_err());
    }

    #[test]
    fn test_options_validate() {
        assert!(ComparisonOptions::default().validate().is_ok());
        let bad = ComparisonOptions {
            yield_every_hours: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
