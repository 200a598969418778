use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::optimizer::OptimizerError;

/// Index of one interval of the scheduling horizon, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStep(pub usize);

impl TimeStep {
    pub fn index(self) -> usize {
        self.0
    }

    /// The step immediately before this one, `None` at the start of the horizon.
    pub fn previous(self) -> Option<TimeStep> {
        self.0.checked_sub(1).map(TimeStep)
    }
}

impl std::fmt::Display for TimeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market price at every step. Non-negative and finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries(Vec<f64>);

/// Fraction of capacity injected by external charging at every step, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeRateSeries(Vec<f64>);

impl PriceSeries {
    pub fn new(values: Vec<f64>) -> Result<Self, OptimizerError> {
        for (t, price) in values.iter().enumerate() {
            if !price.is_finite() || *price < 0.0 {
                return Err(OptimizerError::Configuration(format!(
                    "price at step {t} must be finite and non-negative, got {price}"
                )));
            }
        }
        Ok(Self(values))
    }

    /// Build from an index → value map; every index in `[0, len)` must be present.
    pub fn from_indexed(entries: &BTreeMap<usize, f64>) -> Result<Self, OptimizerError> {
        Self::new(dense_values("price", entries)?)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn at(&self, t: TimeStep) -> f64 {
        self.0[t.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl ChargeRateSeries {
    pub fn new(values: Vec<f64>) -> Result<Self, OptimizerError> {
        for (t, rate) in values.iter().enumerate() {
            if !rate.is_finite() || !(0.0..=1.0).contains(rate) {
                return Err(OptimizerError::Configuration(format!(
                    "charge rate at step {t} must be within [0, 1], got {rate}"
                )));
            }
        }
        Ok(Self(values))
    }

    pub fn from_indexed(entries: &BTreeMap<usize, f64>) -> Result<Self, OptimizerError> {
        Self::new(dense_values("charge rate", entries)?)
    }

    /// A horizon of `nt` steps with no external charging.
    pub fn idle(nt: usize) -> Self {
        Self(vec![0.0; nt])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn at(&self, t: TimeStep) -> f64 {
        self.0[t.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

fn dense_values(what: &str, entries: &BTreeMap<usize, f64>) -> Result<Vec<f64>, OptimizerError> {
    // BTreeMap keys are unique and sorted, so a gap shows up as a key that
    // does not match its position.
    entries
        .iter()
        .enumerate()
        .map(|(position, (&t, &value))| {
            if position == t {
                Ok(value)
            } else {
                Err(OptimizerError::Configuration(format!(
                    "{what} series has no entry for step {position}"
                )))
            }
        })
        .collect()
}

/// Price and charging schedule over the horizon.
///
/// The two series are checked against each other only when a model is built,
/// so a mismatched pair can still be carried around and reported on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleData {
    pub prices: PriceSeries,
    pub charge_rates: ChargeRateSeries,
}

impl ScheduleData {
    pub fn new(prices: PriceSeries, charge_rates: ChargeRateSeries) -> Self {
        Self { prices, charge_rates }
    }

    /// Number of steps in the horizon, taken from the price series.
    pub fn horizon(&self) -> usize {
        self.prices.len()
    }

    pub fn time_steps(&self) -> impl Iterator<Item = TimeStep> {
        (0..self.horizon()).map(TimeStep)
    }
}
