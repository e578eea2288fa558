use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, warn};

use henri_home_sim::climate::ClimateGenerator;
use henri_home_sim::comparison::run_comparison;
use henri_home_sim::config::AppConfig;
use henri_home_sim::controller::{Playback, Simulator};
use henri_home_sim::telemetry::{init_tracing, shutdown_signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
enum RunMode {
    Playback,
    Compare,
    PrintConfig,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let arg = std::env::args().nth(1).unwrap_or_else(|| "playback".to_string());
    let mode: RunMode = arg
        .parse()
        .map_err(|_| anyhow!("unknown run mode '{arg}' (expected playback, compare or print-config)"))?;

    let cfg = AppConfig::load().context("loading configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run(mode, cfg))
}

async fn run(mode: RunMode, cfg: AppConfig) -> Result<()> {
    info!(%mode, "starting Henri home simulator");
    match mode {
        RunMode::PrintConfig => {
            println!("{}", cfg.to_toml()?);
        }
        RunMode::Compare => {
            let report = run_comparison(&cfg.house, &cfg.comparison).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        RunMode::Playback => playback(cfg).await?,
    }
    Ok(())
}

async fn playback(cfg: AppConfig) -> Result<()> {
    let mut sim = Simulator::new(cfg.house.clone(), ClimateGenerator::new(cfg.simulation.cloud_seed));
    sim.register_default_modules()?;
    if let Some(city) = &cfg.simulation.city_id {
        sim.set_city(city)?;
    }
    if let Some(date) = &cfg.simulation.seasonal_date_id {
        sim.set_seasonal_date(date)?;
    }
    sim.set_time(cfg.simulation.start_hour)?;

    let shared = Arc::new(Mutex::new(sim));
    let mut playback = Playback::new(Arc::clone(&shared), cfg.simulation.playback_speed)?;
    playback.start();

    shutdown_signal().await;
    playback.pause();

    if let Some(fault) = playback.fault() {
        warn!(error = %fault, "playback had stopped on a fault");
    }
    let persisted = shared.lock().persisted();
    println!("{}", serde_json::to_string_pretty(&persisted)?);
    warn!("shutdown complete");
    Ok(())
}
