//! # Henri Adaptive Decision Engine
//!
//! A priority-ordered mode state machine evaluated once per tick, before the
//! device modules run. Each mode rewrites a few module knobs on entry and
//! restores them on exit. Entry and exit thresholds are separated by a
//! hysteresis band, and a lower-priority mode never preempts an active one.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use strum::{Display, EnumIter, EnumString};
use tracing::info;

use crate::domain::{ErvConfig, HeatPumpConfig, HouseState, ModuleConfigs};

/// Decisions retained for observability
pub const DECISION_LOG_CAPACITY: usize = 10;

const HIGH_SOLAR_ENTRY_W_M2: f64 = 700.0;
const HIGH_SOLAR_EXIT_W_M2: f64 = 500.0;
const HIGH_SOLAR_COP: f64 = 2.8;
/// Hour after which solar load is expected to fade
const SOLAR_PEAK_HOUR: u32 = 16;

const LOW_BATTERY_ENTRY_PCT: f64 = 20.0;
const LOW_BATTERY_EXIT_PCT: f64 = 30.0;
const LOW_BATTERY_TARGET_FLOOR_C: f64 = 20.0;
const LOW_BATTERY_COP_BOOST: f64 = 1.2;
const LOW_BATTERY_COP_CAP: f64 = 4.5;

const AQ_ENTRY_AQI: f64 = 100.0;
const AQ_EXIT_AQI: f64 = 75.0;
const AQ_FLOW_FACTOR: f64 = 0.6;
const AQ_MIN_FLOW_M3H: f64 = 100.0;

const COMFORT_ENTRY_SCORE: u8 = 60;
const COMFORT_EXIT_SCORE: u8 = 80;
const COMFORT_ENTRY_ERROR_C: f64 = 3.0;
const COMFORT_EXIT_ERROR_C: f64 = 1.0;
const COMFORT_COP: f64 = 4.2;
const COMFORT_ERV_EFFICIENCY: f64 = 0.8;

/// ERV flow multiplier while purging smoke
pub const EMERGENCY_FLOW_FACTOR: f64 = 2.0;

/// Operating mode, exactly one active at a time
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    #[default]
    Normal,
    HighSolar,
    LowBattery,
    AirQualityProtection,
    ComfortPriority,
    Emergency,
}

impl Mode {
    /// Higher wins
    pub fn priority(self) -> u8 {
        match self {
            Mode::Normal => 0,
            Mode::ComfortPriority => 1,
            Mode::AirQualityProtection => 2,
            Mode::LowBattery => 3,
            Mode::HighSolar => 4,
            Mode::Emergency => 5,
        }
    }
}

/// Automatic candidates, highest priority first
const CANDIDATES: [Mode; 4] = [
    Mode::HighSolar,
    Mode::LowBattery,
    Mode::AirQualityProtection,
    Mode::ComfortPriority,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: u64,
    /// Simulated hour the decision was taken
    pub timestamp: u32,
    pub action: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    mode: Mode,
    decisions: VecDeque<Decision>,
    next_id: u64,
    next_adaptation: Option<String>,
    manual_override: bool,
    /// ERV flow in effect before an emergency doubled it
    saved_erv_flow: Option<f64>,
    mode_changes: u64,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.decisions.iter()
    }

    pub fn next_adaptation(&self) -> Option<&str> {
        self.next_adaptation.as_deref()
    }

    pub fn is_overridden(&self) -> bool {
        self.manual_override
    }

    /// Mode transitions since construction or the last reset
    pub fn mode_changes(&self) -> u64 {
        self.mode_changes
    }

    /// Pre-emergency ERV flow, held until the emergency is released
    pub fn saved_erv_flow(&self) -> Option<f64> {
        self.saved_erv_flow
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Append to the bounded decision log
    pub fn record(&mut self, hour: u32, action: impl Into<String>, reason: impl Into<String>) {
        let decision = Decision {
            id: self.next_id,
            timestamp: hour,
            action: action.into(),
            reason: reason.into(),
        };
        self.next_id += 1;
        info!(
            id = decision.id,
            hour,
            mode = %self.mode,
            action = %decision.action,
            reason = %decision.reason,
            "henri decision"
        );
        self.decisions.push_back(decision);
        while self.decisions.len() > DECISION_LOG_CAPACITY {
            self.decisions.pop_front();
        }
    }

    /// Reinstate persisted engine state.
    ///
    /// The saved ERV flow only means something while in emergency.
    pub fn restore(&mut self, mode: Option<Mode>, decisions: Option<Vec<Decision>>, saved_erv_flow: Option<f64>) {
        if let Some(mode) = mode {
            self.mode = mode;
            self.saved_erv_flow = (mode == Mode::Emergency).then_some(saved_erv_flow).flatten();
        }
        if let Some(decisions) = decisions {
            self.next_id = decisions.iter().map(|d| d.id + 1).max().unwrap_or(0);
            let skip = decisions.len().saturating_sub(DECISION_LOG_CAPACITY);
            self.decisions = decisions.into_iter().skip(skip).collect();
        }
    }

    fn battery_percent(state: &HouseState, configs: &ModuleConfigs) -> f64 {
        configs.battery.percent(state.energy.battery_kwh)
    }

    fn temperature_error(state: &HouseState, configs: &ModuleConfigs) -> f64 {
        (state.indoor.temperature - configs.heat_pump.target_temperature).abs()
    }

    fn entry_condition(&self, mode: Mode, state: &HouseState, configs: &ModuleConfigs) -> Option<String> {
        match mode {
            Mode::HighSolar if state.outdoor.solar_radiation > HIGH_SOLAR_ENTRY_W_M2 => Some(format!(
                "Solar radiation: {:.0} W/m²",
                state.outdoor.solar_radiation
            )),
            Mode::LowBattery => {
                let pct = Self::battery_percent(state, configs);
                (pct < LOW_BATTERY_ENTRY_PCT).then(|| format!("Battery at {pct:.0}%"))
            }
            Mode::AirQualityProtection if state.outdoor.air_quality_index > AQ_ENTRY_AQI => {
                Some(format!("Outdoor AQI: {:.0}", state.outdoor.air_quality_index))
            }
            Mode::ComfortPriority => {
                let error = Self::temperature_error(state, configs);
                (state.comfort_score < COMFORT_ENTRY_SCORE || error > COMFORT_ENTRY_ERROR_C).then(|| {
                    format!(
                        "Comfort score: {}%, temperature error {:.1} °C",
                        state.comfort_score, error
                    )
                })
            }
            _ => None,
        }
    }

    fn exit_condition(&self, mode: Mode, state: &HouseState, configs: &ModuleConfigs) -> bool {
        match mode {
            Mode::Normal => false,
            Mode::HighSolar => state.outdoor.solar_radiation < HIGH_SOLAR_EXIT_W_M2,
            Mode::LowBattery => Self::battery_percent(state, configs) > LOW_BATTERY_EXIT_PCT,
            Mode::AirQualityProtection => state.outdoor.air_quality_index < AQ_EXIT_AQI,
            Mode::ComfortPriority => {
                state.comfort_score > COMFORT_EXIT_SCORE
                    && Self::temperature_error(state, configs) < COMFORT_EXIT_ERROR_C
            }
            Mode::Emergency => !state.safety.smoke_event,
        }
    }

    /// Write a mode's knob settings into the module configs
    fn apply(&mut self, mode: Mode, state: &mut HouseState, configs: &mut ModuleConfigs, erv_enabled: bool) {
        let hour = state.time;
        match mode {
            Mode::Normal => {}
            Mode::HighSolar => {
                configs.heat_pump.efficiency = HIGH_SOLAR_COP;
                self.record(hour, "Heat pump efficiency reduced", "Compensating for solar heat gain");
            }
            Mode::LowBattery => {
                let hp = &mut configs.heat_pump;
                hp.target_temperature = (hp.target_temperature - 1.0).max(LOW_BATTERY_TARGET_FLOOR_C);
                hp.efficiency = (hp.efficiency * LOW_BATTERY_COP_BOOST).min(LOW_BATTERY_COP_CAP);
                let reason = format!(
                    "Conserving battery: target {:.1} °C, COP {:.2}",
                    hp.target_temperature, hp.efficiency
                );
                self.record(hour, "Temperature setpoint lowered", reason);
            }
            Mode::AirQualityProtection => {
                let erv = &mut configs.erv;
                erv.flow_rate = (erv.flow_rate * AQ_FLOW_FACTOR).max(AQ_MIN_FLOW_M3H);
                let reason = format!("Limiting outdoor air intake to {:.0} m³/h", erv.flow_rate);
                self.record(hour, "ERV flow reduced", reason);
            }
            Mode::ComfortPriority => {
                configs.heat_pump.efficiency = COMFORT_COP;
                configs.erv.efficiency = COMFORT_ERV_EFFICIENCY;
                self.record(hour, "Heat pump efficiency boosted", "Prioritizing occupant comfort");
                self.record(hour, "ERV efficiency increased", "Improving air quality");
            }
            Mode::Emergency => {
                state.safety.sprinklers_active = true;
                self.record(hour, "Sprinklers activated", "Fire safety protocol");
                self.saved_erv_flow = Some(configs.erv.flow_rate);
                if erv_enabled {
                    configs.erv.flow_rate *= EMERGENCY_FLOW_FACTOR;
                    let reason = format!("Evacuating contaminated air at {:.0} m³/h", configs.erv.flow_rate);
                    self.record(hour, "ERV emergency ventilation", reason);
                }
            }
        }
    }

    /// Undo a mode's knob settings
    fn release(&mut self, mode: Mode, state: &mut HouseState, configs: &mut ModuleConfigs) {
        match mode {
            Mode::Normal => {}
            Mode::HighSolar => configs.heat_pump.efficiency = HeatPumpConfig::NOMINAL_COP,
            Mode::LowBattery => {
                configs.heat_pump.target_temperature = HeatPumpConfig::NOMINAL_TARGET_C;
                configs.heat_pump.efficiency = HeatPumpConfig::NOMINAL_COP;
            }
            Mode::AirQualityProtection => configs.erv.flow_rate = ErvConfig::NOMINAL_FLOW_RATE,
            Mode::ComfortPriority => {
                configs.heat_pump.efficiency = HeatPumpConfig::NOMINAL_COP;
                configs.erv.efficiency = ErvConfig::NOMINAL_EFFICIENCY;
            }
            Mode::Emergency => {
                configs.erv.flow_rate = self.saved_erv_flow.take().unwrap_or(ErvConfig::NOMINAL_FLOW_RATE);
                state.safety.sprinklers_active = false;
            }
        }
    }

    fn transition(
        &mut self,
        to: Mode,
        state: &mut HouseState,
        configs: &mut ModuleConfigs,
        erv_enabled: bool,
        reason: String,
    ) {
        let from = self.mode;
        if from == to {
            return;
        }
        self.release(from, state, configs);
        self.mode = to;
        self.mode_changes += 1;
        let action = match to {
            Mode::Normal => "Normal operation restored".to_string(),
            other => format!("{other} mode activated"),
        };
        self.record(state.time, action, reason);
        self.apply(to, state, configs, erv_enabled);
    }

    fn update_hint(&mut self, state: &HouseState) {
        self.next_adaptation = match self.mode {
            Mode::Emergency => Some("Will restore ventilation once smoke clears".into()),
            Mode::HighSolar if state.time < SOLAR_PEAK_HOUR => {
                Some("Will reduce solar heat gain at peak (15:00)".into())
            }
            Mode::LowBattery => Some("Will restore normal temperature when battery > 30%".into()),
            Mode::AirQualityProtection => Some("Will restore ventilation when AQI < 75".into()),
            Mode::ComfortPriority => Some("Will return to normal when comfort > 80%".into()),
            _ => None,
        };
    }

    /// Evaluate the environment and adapt module configuration.
    ///
    /// Returns true if the mode changed. Does nothing while a manual override
    /// is active.
    pub fn analyze(&mut self, state: &mut HouseState, configs: &mut ModuleConfigs, erv_enabled: bool) -> bool {
        self.next_adaptation = None;
        if self.manual_override {
            return false;
        }
        let start = self.mode;

        if state.safety.smoke_event {
            if self.mode != Mode::Emergency {
                self.transition(Mode::Emergency, state, configs, erv_enabled, "Smoke event detected".into());
            }
            self.update_hint(state);
            return self.mode != start;
        }

        if self.mode != Mode::Normal && self.exit_condition(self.mode, state, configs) {
            let reason = match self.mode {
                Mode::Emergency => "Smoke cleared".to_string(),
                other => format!("Exit {other}: environmental conditions normalized"),
            };
            self.transition(Mode::Normal, state, configs, erv_enabled, reason);
        }

        for candidate in CANDIDATES {
            if candidate.priority() <= self.mode.priority() {
                break;
            }
            if let Some(reason) = self.entry_condition(candidate, state, configs) {
                let reason = if self.mode == Mode::Normal {
                    reason
                } else {
                    format!("{reason} (preempts {})", self.mode)
                };
                self.transition(candidate, state, configs, erv_enabled, reason);
                break;
            }
        }

        self.update_hint(state);
        self.mode != start
    }

    /// Apply a mode directly and suspend automatic evaluation
    pub fn force_mode(
        &mut self,
        mode: Mode,
        state: &mut HouseState,
        configs: &mut ModuleConfigs,
        erv_enabled: bool,
    ) -> bool {
        self.manual_override = true;
        let changed = self.mode != mode;
        self.transition(mode, state, configs, erv_enabled, "Manual override".into());
        if !changed {
            self.record(state.time, format!("Override holds {mode}"), "Manual override");
        }
        self.update_hint(state);
        changed
    }

    /// Resume automatic evaluation on the next analyze
    pub fn clear_override(&mut self, hour: u32) {
        if self.manual_override {
            self.manual_override = false;
            self.record(hour, "Manual override cleared", "Automatic adaptation resumed");
        }
    }
}
