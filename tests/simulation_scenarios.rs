//! End-to-end behavior of the simulator pipeline.

use henri_home_sim::climate::ClimateGenerator;
use henri_home_sim::controller::{Mode, Scenario, Simulator};
use henri_home_sim::domain::{Configuration, HouseState, ModuleConfig, ModuleKind, OutdoorConditions};
use henri_home_sim::simulation::{comfort_score, HeatPumpModule, SimulationModule};
use henri_home_sim::SimulationError;
use proptest::prelude::*;
use rstest::rstest;

const ALL_MODULES: [ModuleKind; 4] = [
    ModuleKind::HeatPump,
    ModuleKind::Erv,
    ModuleKind::Solar,
    ModuleKind::Battery,
];

fn simulator() -> Simulator {
    let mut sim = Simulator::new(Configuration::default(), ClimateGenerator::new(1234));
    sim.register_default_modules().unwrap();
    sim
}

fn only_enabled(sim: &mut Simulator, enabled: &[ModuleKind]) {
    for kind in ALL_MODULES {
        sim.set_module_enabled(kind, enabled.contains(&kind)).unwrap();
    }
}

#[test]
fn energy_counters_are_zero_before_modules_run() {
    let mut sim = simulator();
    sim.set_city("chicago").unwrap();
    for hour in (0..48).map(|h| h % 24) {
        let report = sim.set_time(hour).unwrap();
        let counters = report.counters_after_reset;
        assert_eq!(counters.heat_pump_kwh, 0.0);
        assert_eq!(counters.erv_kwh, 0.0);
        assert_eq!(counters.solar_kwh, 0.0);
        assert_eq!(counters.net_kwh, 0.0);
    }
}

#[rstest]
#[case(0.0)]
#[case(0.05)]
#[case(-0.09)]
fn heat_pump_is_noop_inside_deadband(#[case] offset: f64) {
    let mut state = HouseState::default();
    state.indoor.temperature = 21.0 + offset;
    let before = state.clone();
    let config = ModuleConfig::HeatPump(Default::default());
    HeatPumpModule.simulate(&mut state, 1.0, Some(&config)).unwrap();
    assert_eq!(state, before);
}

#[test]
fn erv_air_quality_never_exceeds_cap() {
    let mut sim = simulator();
    only_enabled(&mut sim, &[ModuleKind::Erv]);
    let clean = OutdoorConditions {
        air_quality_index: 10.0,
        ..Default::default()
    };
    for tick in 0..500u32 {
        sim.advance_with_outdoor(tick % 24, clean).unwrap();
        assert!(sim.state().indoor.air_quality <= 0.95);
    }
}

#[test]
fn low_battery_mode_holds_through_oscillating_trace() {
    // No modules, so the scripted charge level is all the engine sees
    let mut sim = Simulator::new(Configuration::default(), ClimateGenerator::default());
    let calm = OutdoorConditions {
        solar_radiation: 100.0,
        ..Default::default()
    };
    let trace = [18.0, 25.0, 19.0, 24.0, 18.0, 25.0, 21.0, 29.0, 18.0, 25.0];
    for (i, pct) in trace.iter().enumerate() {
        sim.state_mut().energy.battery_kwh = 20.0 * pct / 100.0;
        sim.advance_with_outdoor(i as u32, calm).unwrap();
        assert_eq!(sim.mode(), Mode::LowBattery, "battery at {pct}%");
    }

    sim.state_mut().energy.battery_kwh = 20.0 * 0.31;
    sim.advance_with_outdoor(12, calm).unwrap();
    assert_eq!(sim.mode(), Mode::Normal);
}

#[test]
fn reset_reproduces_fresh_trajectory() {
    let script = [6, 7, 8, 12, 13, 20, 3];

    let mut replayed = simulator();
    replayed.set_city("denver").unwrap();
    for hour in [10, 14, 2] {
        replayed.set_time(hour).unwrap();
    }
    replayed.trigger_smoke_event().unwrap();
    replayed.reset();
    let replayed_states: Vec<HouseState> = script
        .iter()
        .map(|h| {
            replayed.set_time(*h).unwrap();
            replayed.state().clone()
        })
        .collect();

    let mut fresh = simulator();
    fresh.state_mut().location = replayed.state().location.clone();
    fresh.state_mut().seasonal_date_id = replayed.state().seasonal_date_id.clone();
    let fresh_states: Vec<HouseState> = script
        .iter()
        .map(|h| {
            fresh.set_time(*h).unwrap();
            fresh.state().clone()
        })
        .collect();

    assert_eq!(replayed_states, fresh_states);
}

#[test]
fn solar_surplus_charges_battery_and_exports() {
    let mut sim = simulator();
    only_enabled(&mut sim, &[ModuleKind::Solar, ModuleKind::Battery]);
    sim.state_mut().energy.battery_kwh = 5.0;
    sim.state_mut().outdoor.solar_radiation = 900.0;

    sim.run_tick().unwrap();
    let energy = sim.state().energy;
    assert!(energy.solar_kwh > 0.0);
    assert!(energy.battery_kwh > 5.0);
    assert!(energy.net_kwh <= 0.0);
}

#[test]
fn smoke_event_triggers_emergency_in_same_tick() {
    let mut sim = simulator();
    let report = sim.trigger_smoke_event().unwrap();
    assert_eq!(report.mode, Mode::Emergency);
    assert_eq!(sim.mode(), Mode::Emergency);
    assert!(sim.state().safety.sprinklers_active);
    assert_eq!(sim.module_configs().erv.flow_rate, 400.0);
    assert!(sim.state().comfort_score <= 30);

    sim.clear_smoke_event().unwrap();
    assert_ne!(sim.mode(), Mode::Emergency);
    assert!(!sim.state().safety.sprinklers_active);
    assert_eq!(sim.module_configs().erv.flow_rate, 200.0);
}

#[test]
fn passive_only_decay_approaches_colder_outdoor() {
    let mut sim = simulator();
    only_enabled(&mut sim, &[]);
    let cold = OutdoorConditions {
        temperature: 2.0,
        solar_radiation: 0.0,
        ..Default::default()
    };

    let mut previous = sim.state().indoor.temperature;
    for hour in 0..24 {
        sim.advance_with_outdoor(hour, cold).unwrap();
        let indoor = sim.state().indoor.temperature;
        assert!(indoor <= previous, "hour {hour}: {indoor} > {previous}");
        assert!(indoor >= cold.temperature - 5.0);
        previous = indoor;
    }
    assert!(previous < 21.0);
}

#[rstest]
#[case(Scenario::HeatWave, Mode::HighSolar)]
#[case(Scenario::PoorAirQuality, Mode::AirQualityProtection)]
#[case(Scenario::SmokeAlarm, Mode::Emergency)]
fn scenario_forces_reevaluation(#[case] scenario: Scenario, #[case] expected: Mode) {
    let mut sim = simulator();
    sim.state_mut().energy.battery_kwh = 15.0;
    sim.set_time(20).unwrap();
    sim.trigger_scenario(scenario).unwrap();
    assert_eq!(sim.mode(), expected);
    assert!(sim
        .engine()
        .decisions()
        .any(|d| d.action.starts_with("TEST:")));

    let report = sim.clear_scenario().unwrap();
    assert!(report.is_some());
    assert!(sim.active_scenario().is_none());
    assert!(!sim.state().safety.smoke_event);
}

#[test]
fn manual_override_pins_mode_until_cleared() {
    let mut sim = simulator();
    sim.state_mut().energy.battery_kwh = 15.0;
    sim.force_mode(Mode::ComfortPriority);
    assert_eq!(sim.module_configs().heat_pump.efficiency, 4.2);

    sim.set_time(12).unwrap();
    assert_eq!(sim.mode(), Mode::ComfortPriority);

    sim.clear_override();
    sim.set_time(13).unwrap();
    assert_eq!(sim.mode(), Mode::HighSolar);
}

#[test]
fn corrupted_registry_drops_all_modules() {
    let mut sim = Simulator::new(Configuration::default(), ClimateGenerator::default());
    sim.register_module(Box::new(HeatPumpModule), true).unwrap();
    sim.register_module_as(ModuleKind::Solar, Box::new(HeatPumpModule), true)
        .unwrap();

    let err = sim.run_tick().unwrap_err();
    assert!(matches!(err, SimulationError::RegistryCorrupted(_)));
    assert!(sim.modules().is_empty());

    sim.register_default_modules().unwrap();
    assert!(sim.run_tick().is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn comfort_stays_in_range_through_ticks(
        weather in proptest::collection::vec(
            (-30.0f64..45.0, 0.0f64..1100.0, 0.0f64..300.0, 0.05f64..0.95),
            1..30,
        ),
        indoor in 5.0f64..35.0,
        smoke in any::<bool>(),
    ) {
        let mut sim = simulator();
        sim.state_mut().indoor.temperature = indoor;
        sim.state_mut().safety.smoke_event = smoke;
        for (i, (temperature, radiation, aqi, humidity)) in weather.into_iter().enumerate() {
            let outdoor = OutdoorConditions {
                temperature,
                solar_radiation: radiation,
                air_quality_index: aqi,
                humidity,
                wind_speed: 2.0,
            };
            sim.advance_with_outdoor((i % 24) as u32, outdoor).unwrap();
            let state = sim.state();
            prop_assert!(state.comfort_score <= 100);
            prop_assert_eq!(
                state.comfort_score,
                comfort_score(state, sim.module_configs().heat_pump.target_temperature)
            );
            prop_assert!((0.2..=0.8).contains(&state.indoor.humidity));
            prop_assert!((0.3..=1.0).contains(&state.indoor.air_quality));
        }
    }

    #[test]
    fn battery_soc_stays_within_capacity(
        weather in proptest::collection::vec((-20.0f64..40.0, 0.0f64..1100.0), 1..48),
        start_soc in 0.0f64..20.0,
    ) {
        let mut sim = simulator();
        sim.state_mut().energy.battery_kwh = start_soc;
        let capacity = sim.module_configs().battery.capacity;
        for (i, (temperature, radiation)) in weather.into_iter().enumerate() {
            let outdoor = OutdoorConditions {
                temperature,
                solar_radiation: radiation,
                ..Default::default()
            };
            sim.advance_with_outdoor((i % 24) as u32, outdoor).unwrap();
            let soc = sim.state().energy.battery_kwh;
            prop_assert!((0.0..=capacity).contains(&soc));
        }
    }
}
