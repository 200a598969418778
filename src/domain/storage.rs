use serde::{Deserialize, Serialize};

use crate::optimizer::OptimizerError;

/// Physical limits of the storage, constant over the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageParameters {
    /// Maximum inventory (energy units)
    pub capacity: f64,

    /// Maximum discharge power sold per step (power units)
    pub max_power: f64,

    /// Inventory before the first step
    pub initial_storage: f64,
}

impl StorageParameters {
    /// Storage that starts the horizon full.
    pub fn new(capacity: f64, max_power: f64) -> Self {
        Self {
            capacity,
            max_power,
            initial_storage: capacity,
        }
    }

    pub fn with_initial_storage(mut self, initial_storage: f64) -> Self {
        self.initial_storage = initial_storage;
        self
    }

    /// Validate that the parameters describe a usable storage
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if !self.capacity.is_finite() || self.capacity <= 0.0 {
            return Err(OptimizerError::Configuration(format!(
                "capacity must be positive, got {}",
                self.capacity
            )));
        }

        if !self.max_power.is_finite() || self.max_power <= 0.0 {
            return Err(OptimizerError::Configuration(format!(
                "max_power must be positive, got {}",
                self.max_power
            )));
        }

        if !self.initial_storage.is_finite()
            || self.initial_storage < 0.0
            || self.initial_storage > self.capacity
        {
            return Err(OptimizerError::Configuration(format!(
                "initial_storage must be within [0, {}], got {}",
                self.capacity, self.initial_storage
            )));
        }

        Ok(())
    }

    /// Energy injected at a step by external charging at `charge_rate`.
    pub fn injection(&self, charge_rate: f64) -> f64 {
        charge_rate * self.capacity
    }
}
