//! # Multi-Day Comparison
//!
//! Runs the house twice over the same synthesized weather, once with the
//! decision engine pinned to normal and once adaptive, and compares the
//! per-day results.

pub mod harness;
pub mod metrics;
pub mod weather;

pub use harness::{run_comparison, ComparisonOptions, ComparisonReport};
pub use metrics::{ComparisonMetrics, DailyMetrics, MetricPair, Tariff};
pub use weather::WeatherSynthesizer;
