//! Per-day and aggregate comparison metrics.

use serde::{Deserialize, Serialize};

/// Comfort threshold for "good" hours and drop episodes
pub const COMFORT_GOOD: u8 = 80;
pub const COMFORT_EXCELLENT: u8 = 90;

/// Hourly samples collected during one simulated day
#[derive(Debug, Clone, Default)]
pub struct DaySamples {
    pub comfort: Vec<u8>,
    pub indoor_temperature: Vec<f64>,
    pub consumed_kwh: f64,
    pub produced_kwh: f64,
    pub imported_kwh: f64,
}

impl DaySamples {
    pub fn with_capacity(hours: usize) -> Self {
        Self {
            comfort: Vec::with_capacity(hours),
            indoor_temperature: Vec::with_capacity(hours),
            ..Default::default()
        }
    }
}

/// Grid price and emission factors applied to imported energy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tariff {
    pub price_per_kwh: f64,
    pub co2_kg_per_kwh: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            price_per_kwh: 0.15,
            co2_kg_per_kwh: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub day: u32,
    pub energy_consumed_kwh: f64,
    pub energy_produced_kwh: f64,
    pub grid_import_kwh: f64,
    pub average_comfort: f64,
    pub hours_above_90: u32,
    pub hours_above_80: u32,
    /// Population variance of the hourly comfort scores
    pub comfort_variance: f64,
    /// Mean hours from a drop below 80 until recovery
    pub recovery_time_h: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub adaptive_actions: u64,
    pub cost: f64,
    pub co2_kg: f64,
}

/// Mean length of the below-threshold episodes in `scores`.
///
/// An episode still open at the end of the day counts up to the last hour.
pub fn recovery_time(scores: &[u8], threshold: u8) -> f64 {
    let mut episodes = Vec::new();
    let mut started: Option<usize> = None;
    for (hour, score) in scores.iter().enumerate() {
        match (started, *score < threshold) {
            (None, true) => started = Some(hour),
            (Some(start), false) => {
                episodes.push((hour - start) as f64);
                started = None;
            }
            _ => {}
        }
    }
    if let Some(start) = started {
        episodes.push((scores.len() - start) as f64);
    }
    if episodes.is_empty() {
        0.0
    } else {
        episodes.iter().sum::<f64>() / episodes.len() as f64
    }
}

impl DailyMetrics {
    pub fn from_samples(day: u32, samples: &DaySamples, adaptive_actions: u64, tariff: Tariff) -> Self {
        use itertools::{Itertools, MinMaxResult};
        use statrs::statistics::Statistics;

        let scores: Vec<f64> = samples.comfort.iter().map(|s| f64::from(*s)).collect();
        let (average_comfort, comfort_variance) = if scores.is_empty() {
            (0.0, 0.0)
        } else {
            (scores.iter().mean(), scores.iter().population_variance())
        };

        let (min_temperature, max_temperature) =
            match samples.indoor_temperature.iter().copied().minmax_by(f64::total_cmp) {
                MinMaxResult::MinMax(min, max) => (min, max),
                MinMaxResult::OneElement(t) => (t, t),
                MinMaxResult::NoElements => (0.0, 0.0),
            };

        let count_at_least = |threshold: u8| samples.comfort.iter().filter(|s| **s >= threshold).count() as u32;

        Self {
            day,
            energy_consumed_kwh: samples.consumed_kwh,
            energy_produced_kwh: samples.produced_kwh,
            grid_import_kwh: samples.imported_kwh,
            average_comfort,
            hours_above_90: count_at_least(COMFORT_EXCELLENT),
            hours_above_80: count_at_least(COMFORT_GOOD),
            comfort_variance,
            recovery_time_h: recovery_time(&samples.comfort, COMFORT_GOOD),
            min_temperature,
            max_temperature,
            adaptive_actions,
            cost: samples.imported_kwh * tariff.price_per_kwh,
            co2_kg: samples.imported_kwh * tariff.co2_kg_per_kwh,
        }
    }
}

/// One metric for both runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPair {
    pub baseline: f64,
    pub henri: f64,
    /// Positive when Henri did better
    pub improvement_pct: f64,
}

impl MetricPair {
    fn relative(baseline: f64, henri: f64, gain: f64) -> Self {
        let improvement_pct = if baseline.abs() > f64::EPSILON {
            gain / baseline.abs() * 100.0
        } else {
            0.0
        };
        Self {
            baseline,
            henri,
            improvement_pct,
        }
    }

    pub fn lower_is_better(baseline: f64, henri: f64) -> Self {
        Self::relative(baseline, henri, baseline - henri)
    }

    pub fn higher_is_better(baseline: f64, henri: f64) -> Self {
        Self::relative(baseline, henri, henri - baseline)
    }

    pub fn is_finite(&self) -> bool {
        self.baseline.is_finite() && self.henri.is_finite() && self.improvement_pct.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetrics {
    /// Total consumption (kWh)
    pub energy: MetricPair,
    /// Grid import cost
    pub cost: MetricPair,
    /// Hours at or above 80 % comfort
    pub comfort_hours: MetricPair,
    /// Mean daily comfort variance
    pub stability: MetricPair,
    /// Mean recovery time (h)
    pub recovery_time: MetricPair,
    pub adaptive_actions: MetricPair,
    /// Comfortable hours per kWh consumed
    pub efficiency: MetricPair,
    /// Grid import emissions (kg)
    pub co2: MetricPair,
}

fn mean_of(days: &[DailyMetrics], f: impl Fn(&DailyMetrics) -> f64) -> f64 {
    if days.is_empty() {
        0.0
    } else {
        days.iter().map(f).sum::<f64>() / days.len() as f64
    }
}

fn sum_of(days: &[DailyMetrics], f: impl Fn(&DailyMetrics) -> f64) -> f64 {
    days.iter().map(f).sum()
}

fn efficiency(days: &[DailyMetrics]) -> f64 {
    let consumed = sum_of(days, |d| d.energy_consumed_kwh);
    if consumed > f64::EPSILON {
        sum_of(days, |d| f64::from(d.hours_above_80)) / consumed
    } else {
        0.0
    }
}

impl ComparisonMetrics {
    pub fn aggregate(baseline: &[DailyMetrics], henri: &[DailyMetrics]) -> Self {
        let total = |f: fn(&DailyMetrics) -> f64| (sum_of(baseline, f), sum_of(henri, f));
        let mean = |f: fn(&DailyMetrics) -> f64| (mean_of(baseline, f), mean_of(henri, f));

        let (b, h) = total(|d| d.energy_consumed_kwh);
        let energy = MetricPair::lower_is_better(b, h);
        let (b, h) = total(|d| d.cost);
        let cost = MetricPair::lower_is_better(b, h);
        let (b, h) = total(|d| f64::from(d.hours_above_80));
        let comfort_hours = MetricPair::higher_is_better(b, h);
        let (b, h) = mean(|d| d.comfort_variance);
        let stability = MetricPair::lower_is_better(b, h);
        let (b, h) = mean(|d| d.recovery_time_h);
        let recovery_time = MetricPair::lower_is_better(b, h);
        let (b, h) = total(|d| d.adaptive_actions as f64);
        let adaptive_actions = MetricPair {
            baseline: b,
            henri: h,
            improvement_pct: 0.0,
        };
        let efficiency = MetricPair::higher_is_better(efficiency(baseline), efficiency(henri));
        let (b, h) = total(|d| d.co2_kg);
        let co2 = MetricPair::lower_is_better(b, h);

        Self {
            energy,
            cost,
            comfort_hours,
            stability,
            recovery_time,
            adaptive_actions,
            efficiency,
            co2,
        }
    }

    /// Every metric by its report key
    pub fn entries(&self) -> [(&'static str, MetricPair); 8] {
        [
            ("energy", self.energy),
            ("cost", self.cost),
            ("comfortHours", self.comfort_hours),
            ("stability", self.stability),
            ("recoveryTime", self.recovery_time),
            ("adaptiveActions", self.adaptive_actions),
            ("efficiency", self.efficiency),
            ("co2Savings", self.co2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[100, 100, 100], 0.0)]
    #[case(&[90, 70, 75, 85, 60, 95], 1.5)] // episodes of 2 and 1 hours
    #[case(&[90, 70, 70], 2.0)] // open at end of day
    fn test_recovery_time(#[case] scores: &[u8], #[case] expected: f64) {
        assert_eq!(recovery_time(scores, COMFORT_GOOD), expected);
    }

    #[test]
    fn test_daily_metrics_from_samples() {
        let samples = DaySamples {
            comfort: vec![100, 90, 80, 70],
            indoor_temperature: vec![20.0, 21.5, 19.0, 22.0],
            consumed_kwh: 10.0,
            produced_kwh: 6.0,
            imported_kwh: 4.0,
        };
        let m = DailyMetrics::from_samples(0, &samples, 3, Tariff::default());
        assert_eq!(m.average_comfort, 85.0);
        assert_eq!(m.comfort_variance, 125.0);
        assert_eq!(m.hours_above_90, 2);
        assert_eq!(m.hours_above_80, 3);
        assert_eq!((m.min_temperature, m.max_temperature), (19.0, 22.0));
        assert!((m.cost - 0.6).abs() < 1e-12);
        assert!((m.co2_kg - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_empty_day_is_finite() {
        let m = DailyMetrics::from_samples(0, &DaySamples::default(), 0, Tariff::default());
        assert_eq!(m.average_comfort, 0.0);
        assert_eq!(m.comfort_variance, 0.0);
        let agg = ComparisonMetrics::aggregate(&[m.clone()], &[m]);
        assert!(agg.entries().iter().all(|(_, pair)| pair.is_finite()));
    }

    #[test]
    fn test_improvement_direction() {
        let pair = MetricPair::lower_is_better(10.0, 8.0);
        assert!((pair.improvement_pct - 20.0).abs() < 1e-12);
        let pair = MetricPair::higher_is_better(10.0, 8.0);
        assert!((pair.improvement_pct + 20.0).abs() < 1e-12);
        assert_eq!(MetricPair::lower_is_better(0.0, 5.0).improvement_pct, 0.0);
    }
}
