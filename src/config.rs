use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::comparison::ComparisonOptions;
use crate::domain::Configuration;
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "HENRI__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub comparison: ComparisonOptions,
    pub house: Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Catalog city; the legacy climate model is used when absent
    pub city_id: Option<String>,
    pub seasonal_date_id: Option<String>,
    pub cloud_seed: u64,
    pub playback_speed: f64,
    pub start_hour: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            city_id: None,
            seasonal_date_id: None,
            cloud_seed: 42,
            playback_speed: 1.0,
            start_hour: 6,
        }
    }
}

impl AppConfig {
    /// Defaults, then `config/default.toml`, then `HENRI__*` environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.house.check()?;
        Ok(config)
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
