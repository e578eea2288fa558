//! # Simulation Orchestrator
//!
//! Owns the [`HouseState`], the module registry and the decision engine, and
//! runs the fixed per-tick pipeline:
//!
//! 1. Snapshot the pre-tick state into the bounded history
//! 2. Reset the hour-local energy counters
//! 3. Passive physics
//! 4. Decision engine analysis
//! 5. Enabled modules in registration order, each isolated from the others' failures
//! 6. Energy balance ledger
//! 7. Comfort score

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::henri::{Decision, DecisionEngine, Mode, EMERGENCY_FLOW_FACTOR};
use super::scenario::Scenario;
use crate::climate::{city_by_id, legacy_climate, seasonal_date_by_id, ClimateGenerator};
use crate::domain::{Configuration, EnergyState, ErvConfig, HouseState, ModuleConfig, ModuleConfigs, ModuleKind};
use crate::error::{ClimateError, ConfigError, Result, SimulationError};
use crate::simulation::{
    apply_passive_physics, comfort_score, default_modules, EnergyBalance, EnergyBalanceCalculator,
    HvacMetrics, ModuleRegistry, PassiveHouseMetrics, PassiveInputs, PassiveStepReport, SimulationModule,
};

/// Maximum number of pre-tick snapshots retained
pub const HISTORY_CAPACITY: usize = 24;

/// Comfort score above which the house counts as comfortable
pub const COMFORTABLE_SCORE: u8 = 70;

/// One simulated hour per tick
const TIMESTEP_HOURS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleFailure {
    pub module: ModuleKind,
    pub message: String,
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub hour: u32,
    pub mode: Mode,
    pub mode_changed: bool,
    pub passive: PassiveStepReport,
    /// Energy counters after the hourly reset, before any module ran
    pub counters_after_reset: EnergyState,
    pub failures: Vec<ModuleFailure>,
    pub comfort_score: u8,
    /// Set when the catalog climate was unavailable and the legacy model was used
    pub climate_fallback: Option<ClimateError>,
}

/// Save/restore payload for a host application.
///
/// Every field is optional so partial or older payloads still restore. The
/// playing flag and the module list are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    pub house_state: Option<HouseState>,
    pub module_configs: Option<ModuleConfigs>,
    pub mode: Option<Mode>,
    pub decisions: Option<Vec<Decision>>,
    /// ERV flow to put back once a persisted emergency ends
    pub saved_erv_flow: Option<f64>,
}

/// Engine-side state a tick may rewrite, kept so a rerun starts clean
#[derive(Debug, Clone)]
struct TickEntry {
    configs: ModuleConfigs,
    engine: DecisionEngine,
}

pub struct Simulator {
    config: Configuration,
    climate: ClimateGenerator,
    calculator: EnergyBalanceCalculator,
    state: HouseState,
    modules: ModuleRegistry,
    configs: ModuleConfigs,
    engine: DecisionEngine,
    history: VecDeque<HouseState>,
    balances: VecDeque<EnergyBalance>,
    last_entry: Option<TickEntry>,
    active_scenario: Option<Scenario>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("hour", &self.state.time)
            .field("mode", &self.engine.mode())
            .field("modules", &self.modules)
            .field("history", &self.history.len())
            .finish()
    }
}

/// Per-module change over one step
fn log_module_step(module: ModuleKind, before: &HouseState, after: &HouseState, started: Instant) {
    let soc_delta_kwh = after.energy.battery_kwh - before.energy.battery_kwh;
    let battery = if soc_delta_kwh > 0.0 {
        "charging"
    } else if soc_delta_kwh < 0.0 {
        "discharging"
    } else {
        "idle"
    };
    debug!(
        module = %module,
        delta_c = after.indoor.temperature - before.indoor.temperature,
        heat_pump_kwh = after.energy.heat_pump_kwh - before.energy.heat_pump_kwh,
        erv_kwh = after.energy.erv_kwh - before.energy.erv_kwh,
        solar_kwh = after.energy.solar_kwh - before.energy.solar_kwh,
        soc_delta_kwh,
        battery,
        air_quality_delta = after.indoor.air_quality - before.indoor.air_quality,
        elapsed_us = started.elapsed().as_micros() as u64,
        "module step"
    );
}

/// Module knobs derived from the building configuration
fn configs_from(config: &Configuration, current: &ModuleConfigs) -> ModuleConfigs {
    let hp = &config.hvac.heat_pump;
    let mut configs = *current;
    configs.heat_pump.capacity = hp.capacity;
    configs.heat_pump.efficiency = hp.cop_heating;
    configs.heat_pump.target_temperature = current
        .heat_pump
        .target_temperature
        .clamp(hp.target_temp_min, hp.target_temp_max);
    configs.erv = config.hvac.erv;
    configs.solar = config.hvac.solar;
    configs.battery = config.hvac.battery;
    configs
}

impl Simulator {
    /// Build a simulator for `config` with no modules registered
    pub fn new(config: Configuration, climate: ClimateGenerator) -> Self {
        let state = HouseState::with_envelope(config.building.envelope());
        let configs = configs_from(&config, &ModuleConfigs::default());
        Self {
            calculator: EnergyBalanceCalculator::new(&config),
            config,
            climate,
            state,
            modules: ModuleRegistry::new(),
            configs,
            engine: DecisionEngine::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            balances: VecDeque::with_capacity(HISTORY_CAPACITY),
            last_entry: None,
            active_scenario: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> &HouseState {
        &self.state
    }

    /// Direct state access for hosts and tests; the next tick sees the edits
    pub fn state_mut(&mut self) -> &mut HouseState {
        &mut self.state
    }

    pub fn hour(&self) -> u32 {
        self.state.time
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn module_configs(&self) -> &ModuleConfigs {
        &self.configs
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn mode(&self) -> Mode {
        self.engine.mode()
    }

    pub fn history(&self) -> impl Iterator<Item = &HouseState> {
        self.history.iter()
    }

    pub fn active_scenario(&self) -> Option<Scenario> {
        self.active_scenario
    }

    pub fn last_energy_balance(&self) -> Option<&EnergyBalance> {
        self.balances.back()
    }

    pub fn balance_history(&self) -> impl Iterator<Item = &EnergyBalance> {
        self.balances.iter()
    }

    pub fn is_comfortable(&self) -> bool {
        self.state.comfort_score > COMFORTABLE_SCORE
    }

    /// Heat pump plus ERV consumption this hour (kWh)
    pub fn total_energy_used(&self) -> f64 {
        self.state.energy.consumption_kwh()
    }

    /// Generation minus consumption this hour (kWh)
    pub fn net_energy_flow(&self) -> f64 {
        self.state.energy.generation_kwh() - self.state.energy.consumption_kwh()
    }

    /// Comfort scores of the history window followed by the live state
    pub fn comfort_trend(&self) -> Vec<u8> {
        self.history
            .iter()
            .map(|s| s.comfort_score)
            .chain(std::iter::once(self.state.comfort_score))
            .collect()
    }

    /// Change in comfort score over the last tick, `None` before the first one
    pub fn comfort_delta(&self) -> Option<i16> {
        self.history
            .back()
            .map(|previous| i16::from(self.state.comfort_score) - i16::from(previous.comfort_score))
    }

    /// Certification-style indicators over the retained ledger window
    pub fn passive_house_metrics(&self) -> PassiveHouseMetrics {
        let ledger: Vec<EnergyBalance> = self.balances.iter().cloned().collect();
        let temperatures: Vec<f64> = self
            .history
            .iter()
            .map(|s| s.indoor.temperature)
            .chain(std::iter::once(self.state.indoor.temperature))
            .collect();
        let hvac = HvacMetrics {
            seasonal_cop: self.configs.heat_pump.efficiency,
            heat_recovery_efficiency: self.configs.erv.efficiency,
        };
        self.calculator.passive_house_metrics(&ledger, &temperatures, hvac)
    }

    // ------------------------------------------------------------------
    // Module registration
    // ------------------------------------------------------------------

    pub fn register_module(&mut self, module: Box<dyn SimulationModule>, enabled: bool) -> Result<()> {
        let name = module.name();
        self.register_module_as(name, module, enabled)
    }

    /// Register into an explicit slot.
    ///
    /// A slot whose module reports a different name is caught at the next
    /// tick, which then drops every module.
    pub fn register_module_as(
        &mut self,
        name: ModuleKind,
        module: Box<dyn SimulationModule>,
        enabled: bool,
    ) -> Result<()> {
        self.modules.register_as(name, module)?;
        self.modules.set_enabled(name, enabled)?;
        info!(module = %name, enabled, "module registered");
        Ok(())
    }

    /// Register heat pump, ERV, solar and battery, all enabled
    pub fn register_default_modules(&mut self) -> Result<()> {
        for module in default_modules() {
            self.register_module(module, true)?;
        }
        Ok(())
    }

    /// Flip a module's enabled flag and recompute the current hour.
    ///
    /// The rerun starts from the pre-tick snapshot, with the module knobs and
    /// engine state as they were before the discarded tick, and does not
    /// append history. Knobs or a mode set by hand since that tick are kept.
    pub fn toggle_module(&mut self, name: ModuleKind) -> Result<TickReport> {
        let enabled = self.modules.toggle(name)?;
        info!(module = %name, enabled, "module toggled");
        if let Some(snapshot) = self.history.back() {
            self.state = snapshot.clone();
            self.balances.pop_back();
            if let Some(entry) = self.last_entry.take() {
                self.configs = entry.configs;
                self.engine = entry.engine;
            }
        }
        self.execute_tick(false, None)
    }

    pub fn set_module_enabled(&mut self, name: ModuleKind, enabled: bool) -> Result<()> {
        self.modules.set_enabled(name, enabled)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Replace one module's knobs after range validation
    pub fn update_module_config(&mut self, config: ModuleConfig) -> Result<()> {
        if let Err(errors) = config.validate_ranges() {
            let error = crate::domain::configuration::first_out_of_range(errors);
            warn!(module = %config.kind(), error = %error, "module config rejected");
            return Err(error.into());
        }
        self.configs.apply(config);
        self.last_entry = None;
        info!(module = %config.kind(), "module config updated");
        Ok(())
    }

    /// Swap in a new building configuration.
    ///
    /// Validated first; the envelope, the energy ledger and the module knobs
    /// are re-pulled from it.
    pub fn sync_config_changes(&mut self, config: Configuration) -> Result<()> {
        if let Err(e) = config.check() {
            warn!(error = %e, "configuration rejected");
            return Err(e.into());
        }
        self.state.envelope = config.building.envelope();
        self.calculator = EnergyBalanceCalculator::new(&config);
        self.configs = configs_from(&config, &self.configs);
        self.config = config;
        self.last_entry = None;
        info!(
            floor_area = self.state.envelope.floor_area,
            hp_capacity = self.configs.heat_pump.capacity,
            battery_capacity = self.configs.battery.capacity,
            "configuration synced"
        );
        Ok(())
    }

    pub fn set_city(&mut self, city_id: &str) -> Result<TickReport> {
        let city = city_by_id(city_id).ok_or_else(|| ClimateError::UnknownCity(city_id.to_string()))?;
        self.state.location.lat = city.lat;
        self.state.location.lon = city.lon;
        self.state.location.city_id = Some(city.id.to_string());
        self.state.location.city_name = Some(city.name.to_string());
        if self.state.seasonal_date_id.is_none() {
            self.state.seasonal_date_id = Some("summer-solstice".to_string());
        }
        info!(city = city.id, "city selected");
        let fallback = self.refresh_climate();
        self.execute_tick(true, fallback)
    }

    pub fn set_seasonal_date(&mut self, seasonal_date_id: &str) -> Result<TickReport> {
        let date = seasonal_date_by_id(seasonal_date_id)
            .ok_or_else(|| ClimateError::UnknownSeasonalDate(seasonal_date_id.to_string()))?;
        self.state.seasonal_date_id = Some(date.id.to_string());
        if let Ok(parsed) = chrono::NaiveDate::parse_from_str(date.date, "%Y-%m-%d") {
            self.state.date = parsed;
        }
        self.state.season = crate::domain::Season::from_day_of_year(date.day_of_year);
        info!(seasonal_date = date.id, "seasonal date selected");
        let fallback = self.refresh_climate();
        self.execute_tick(true, fallback)
    }

    // ------------------------------------------------------------------
    // Time
    // ------------------------------------------------------------------

    /// Jump to `hour` (clamped to 0-23), refresh climate and tick once
    pub fn set_time(&mut self, hour: u32) -> Result<TickReport> {
        self.state.time = hour.min(23);
        let fallback = self.refresh_climate();
        self.execute_tick(true, fallback)
    }

    /// Tick at `hour` with externally supplied outdoor conditions
    pub fn advance_with_outdoor(
        &mut self,
        hour: u32,
        outdoor: crate::domain::OutdoorConditions,
    ) -> Result<TickReport> {
        self.state.time = hour.min(23);
        self.state.outdoor = outdoor;
        self.execute_tick(true, None)
    }

    /// Run the pipeline on the current state without touching the climate
    pub fn run_tick(&mut self) -> Result<TickReport> {
        self.execute_tick(true, None)
    }

    /// Back to the default state for the current configuration.
    ///
    /// Keeps the selected city and seasonal date and the module registry;
    /// clears history, the decision engine and any active scenario.
    pub fn reset(&mut self) {
        let location = self.state.location.clone();
        let seasonal_date_id = self.state.seasonal_date_id.clone();
        let (date, season) = (self.state.date, self.state.season);

        self.state = HouseState::with_envelope(self.config.building.envelope());
        self.state.location = location;
        self.state.seasonal_date_id = seasonal_date_id;
        if self.state.seasonal_date_id.is_some() {
            self.state.date = date;
            self.state.season = season;
        }
        self.configs = configs_from(&self.config, &ModuleConfigs::default());
        self.engine.reset();
        self.history.clear();
        self.balances.clear();
        self.last_entry = None;
        self.active_scenario = None;
        info!("simulation reset");
    }

    /// Overwrite the outdoor conditions from the climate source.
    ///
    /// Returns the reason when the legacy model had to stand in.
    fn refresh_climate(&mut self) -> Option<ClimateError> {
        let hour = self.state.time;
        let Some(city_id) = self.state.location.city_id.clone() else {
            legacy_climate(hour).apply_to(&mut self.state.outdoor);
            return None;
        };
        let seasonal_date_id = self
            .state
            .seasonal_date_id
            .clone()
            .unwrap_or_else(|| "summer-solstice".to_string());

        match self.climate.generate(&city_id, &seasonal_date_id, hour) {
            Ok(data) => {
                self.state.outdoor = data.outdoor();
                self.state.season = data.season;
                self.state.date = data.seasonal_date;
                self.state.day_length_h = Some(data.day_length);
                self.state.solar_elevation_deg = Some(data.solar_elevation);
                None
            }
            Err(e) => {
                warn!(error = %e, city = %city_id, hour, "climate generation failed, using legacy model");
                legacy_climate(hour).apply_to(&mut self.state.outdoor);
                Some(e)
            }
        }
    }

    fn execute_tick(&mut self, record_history: bool, climate_fallback: Option<ClimateError>) -> Result<TickReport> {
        if let Err(e) = self.modules.verify() {
            error!(error = %e, "module registry failed verification, dropping all modules");
            self.modules.clear();
            return Err(e);
        }

        let cycle_start = Instant::now();
        if record_history {
            self.history.push_back(self.state.clone());
            while self.history.len() > HISTORY_CAPACITY {
                self.history.pop_front();
            }
        }
        self.last_entry = Some(TickEntry {
            configs: self.configs,
            engine: self.engine.clone(),
        });

        self.state.energy.reset_hourly();
        let counters_after_reset = self.state.energy;

        let inputs = PassiveInputs {
            heat_pump_enabled: self.modules.is_enabled(ModuleKind::HeatPump),
            erv_enabled: self.modules.is_enabled(ModuleKind::Erv),
        };
        let passive = apply_passive_physics(&mut self.state, TIMESTEP_HOURS, inputs);

        let mode_changed = self
            .engine
            .analyze(&mut self.state, &mut self.configs, inputs.erv_enabled);

        let mut failures = Vec::new();
        let mut battery_settled = false;
        for entry in self.modules.enabled() {
            let slice = self.configs.slice_for(entry.name);
            // Work on a copy so a failing module leaves no partial writes
            let mut scratch = self.state.clone();
            let module_start = Instant::now();
            match entry.module().simulate(&mut scratch, TIMESTEP_HOURS, Some(&slice)) {
                Ok(()) => {
                    log_module_step(entry.name, &self.state, &scratch, module_start);
                    self.state = scratch;
                    if entry.name == ModuleKind::Battery {
                        battery_settled = true;
                    }
                }
                Err(e) => {
                    error!(module = %entry.name, error = %e, hour = self.state.time, "module failed");
                    failures.push(ModuleFailure {
                        module: entry.name,
                        message: e.to_string(),
                    });
                }
            }
        }
        if !battery_settled {
            self.state.energy.net_kwh = self.state.energy.consumption_kwh() - self.state.energy.generation_kwh();
        }

        let balance = self.calculator.calculate(&self.state, TIMESTEP_HOURS);
        self.balances.push_back(balance);
        while self.balances.len() > HISTORY_CAPACITY {
            self.balances.pop_front();
        }

        self.state.comfort_score = comfort_score(&self.state, self.configs.heat_pump.target_temperature);

        debug!(
            hour = self.state.time,
            mode = %self.engine.mode(),
            indoor_c = self.state.indoor.temperature,
            outdoor_c = self.state.outdoor.temperature,
            net_kwh = self.state.energy.net_kwh,
            soc_kwh = self.state.energy.battery_kwh,
            comfort = self.state.comfort_score,
            failures = failures.len(),
            "tick complete"
        );
        info!(
            hour = self.state.time,
            date = %self.state.date,
            mode = %self.engine.mode(),
            comfort = self.state.comfort_score,
            comfort_delta = self.comfort_delta().unwrap_or(0),
            cycle_us = cycle_start.elapsed().as_micros() as u64,
            "simulation cycle"
        );

        Ok(TickReport {
            hour: self.state.time,
            mode: self.engine.mode(),
            mode_changed,
            passive,
            counters_after_reset,
            failures,
            comfort_score: self.state.comfort_score,
            climate_fallback,
        })
    }

    // ------------------------------------------------------------------
    // Safety events and scenarios
    // ------------------------------------------------------------------

    pub fn trigger_smoke_event(&mut self) -> Result<TickReport> {
        warn!(hour = self.state.time, "smoke event triggered");
        self.state.safety.smoke_event = true;
        self.run_tick()
    }

    pub fn clear_smoke_event(&mut self) -> Result<TickReport> {
        info!(hour = self.state.time, "smoke event cleared");
        self.state.safety.smoke_event = false;
        self.state.safety.sprinklers_active = false;
        self.run_tick()
    }

    /// Inject a stress preset and re-evaluate the decision engine at once
    pub fn trigger_scenario(&mut self, scenario: Scenario) -> Result<()> {
        if scenario == Scenario::SmokeAlarm {
            self.trigger_smoke_event()?;
        } else {
            scenario.apply(&mut self.state);
        }
        self.engine.record(self.state.time, scenario.action(), scenario.description());
        self.active_scenario = Some(scenario);
        self.last_entry = None;
        let erv_enabled = self.modules.is_enabled(ModuleKind::Erv);
        self.engine.analyze(&mut self.state, &mut self.configs, erv_enabled);
        info!(scenario = %scenario, mode = %self.engine.mode(), "test scenario applied");
        Ok(())
    }

    /// Drop the active scenario and return to climate-driven conditions.
    ///
    /// Returns `None` when no scenario was active.
    pub fn clear_scenario(&mut self) -> Result<Option<TickReport>> {
        let Some(scenario) = self.active_scenario.take() else {
            return Ok(None);
        };
        self.engine.record(self.state.time, "Test scenario cleared", "Returning to normal conditions");
        if scenario == Scenario::SmokeAlarm {
            self.state.safety.smoke_event = false;
            self.state.safety.sprinklers_active = false;
        }
        info!(scenario = %scenario, "test scenario cleared");
        let fallback = self.refresh_climate();
        self.execute_tick(true, fallback).map(Some)
    }

    // ------------------------------------------------------------------
    // Manual override
    // ------------------------------------------------------------------

    pub fn force_mode(&mut self, mode: Mode) -> bool {
        let erv_enabled = self.modules.is_enabled(ModuleKind::Erv);
        self.last_entry = None;
        self.engine.force_mode(mode, &mut self.state, &mut self.configs, erv_enabled)
    }

    pub fn clear_override(&mut self) {
        self.last_entry = None;
        self.engine.clear_override(self.state.time);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            house_state: Some(self.state.clone()),
            module_configs: Some(self.configs),
            mode: Some(self.engine.mode()),
            decisions: Some(self.engine.decisions().cloned().collect()),
            saved_erv_flow: self.engine.saved_erv_flow(),
        }
    }

    /// Apply whatever parts of a persisted payload are present.
    ///
    /// The envelope always follows the current configuration, and restored
    /// module knobs must pass range validation. During an emergency the ERV
    /// flow is checked through its pre-emergency baseline instead, and may sit
    /// at most [`EMERGENCY_FLOW_FACTOR`] above it.
    pub fn restore(&mut self, persisted: PersistedState) -> Result<()> {
        let emergency = persisted.mode == Some(Mode::Emergency);
        if let Some(configs) = persisted.module_configs {
            let mut checked = configs;
            if emergency {
                let baseline = persisted.saved_erv_flow.unwrap_or(ErvConfig::NOMINAL_FLOW_RATE);
                let flow = configs.erv.flow_rate;
                if !flow.is_finite() || flow > baseline * EMERGENCY_FLOW_FACTOR {
                    return Err(ConfigError::OutOfRange {
                        section: "erv".into(),
                        field: "flow_rate".into(),
                        message: format!(
                            "emergency flow {flow} exceeds {EMERGENCY_FLOW_FACTOR}x the {baseline} m³/h baseline"
                        ),
                    }
                    .into());
                }
                checked.erv.flow_rate = baseline;
            }
            for kind in [ModuleKind::HeatPump, ModuleKind::Erv, ModuleKind::Solar, ModuleKind::Battery] {
                checked
                    .slice_for(kind)
                    .validate_ranges()
                    .map_err(|e| SimulationError::Config(ConfigError::from(e)))?;
            }
            self.configs = configs;
        }
        if let Some(mut state) = persisted.house_state {
            state.time = state.time.min(23);
            state.envelope = self.config.building.envelope();
            state.indoor.clamp_bands();
            state.energy.battery_kwh = state.energy.battery_kwh.clamp(0.0, self.configs.battery.capacity);
            self.state = state;
        }
        self.engine
            .restore(persisted.mode, persisted.decisions, persisted.saved_erv_flow);
        self.last_entry = None;
        info!(hour = self.state.time, mode = %self.engine.mode(), "persisted state restored");
        Ok(())
    }
}
