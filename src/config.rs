use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::{ChargeRateSeries, PriceSeries, ScheduleData, StorageParameters};
use crate::optimizer::{GoodLpSolver, OptimizerError, SolverBackend};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "DISPATCH__";

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub storage: StorageConfig,
    #[validate(nested)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    #[validate(nested)]
    pub solver: SolverConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct StorageConfig {
    #[validate(range(exclusive_min = 0.0))]
    pub capacity: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub max_power: f64,
    /// Defaults to `capacity` (storage starts full)
    #[validate(range(min = 0.0))]
    pub initial_storage: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_schedule_lengths"))]
pub struct ScheduleConfig {
    #[validate(length(min = 1))]
    pub prices: Vec<f64>,
    pub charge_rates: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct SolverConfig {
    #[serde(default)]
    pub backend: SolverBackend,
    #[validate(range(min = 1))]
    pub time_limit_seconds: Option<u64>,
}

fn validate_schedule_lengths(schedule: &ScheduleConfig) -> Result<(), ValidationError> {
    if schedule.prices.len() != schedule.charge_rates.len() {
        return Err(ValidationError::new("schedule_length_mismatch"));
    }
    Ok(())
}

impl Config {
    /// Layer the TOML file at `path` and `DISPATCH__*` environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let config: Config = figment
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub fn storage_parameters(&self) -> StorageParameters {
        let params = StorageParameters::new(self.storage.capacity, self.storage.max_power);
        match self.storage.initial_storage {
            Some(initial) => params.with_initial_storage(initial),
            None => params,
        }
    }

    pub fn schedule_data(&self) -> Result<ScheduleData, OptimizerError> {
        Ok(ScheduleData::new(
            PriceSeries::new(self.schedule.prices.clone())?,
            ChargeRateSeries::new(self.schedule.charge_rates.clone())?,
        ))
    }

    pub fn solver(&self) -> GoodLpSolver {
        let solver = GoodLpSolver::new(self.solver.backend);
        match self.solver.time_limit_seconds {
            Some(seconds) => solver.with_time_limit(Duration::from_secs(seconds)),
            None => solver,
        }
    }
}
