//! # Henri Home Simulator
//!
//! Hour-by-hour building physics for a single dwelling, pluggable HVAC and
//! energy devices, and the Henri adaptive decision engine layered on top.
//!
//! - [`climate`]: outdoor conditions from a city catalog and seasonal dates
//! - [`simulation`]: passive physics, device modules, energy ledger, comfort
//! - [`controller`]: the orchestrator, decision engine, scenarios and playback
//! - [`comparison`]: multi-day baseline-versus-Henri harness

pub mod climate;
pub mod comparison;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod simulation;
pub mod telemetry;

pub use controller::{Mode, Simulator};
pub use error::{Result, SimulationError};
