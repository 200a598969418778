use chrono::{DateTime, Utc};
use itertools::izip;
use serde::Serialize;
use uuid::Uuid;

use super::model::{DispatchModel, ModelState};
use super::OptimizerError;
use crate::domain::{ScheduleData, StorageParameters, TimeStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRow {
    pub time_step: TimeStep,
    pub price: f64,
    pub charge_rate: f64,
    pub power: f64,
    pub storage: f64,
}

impl DispatchRow {
    pub fn revenue(&self) -> f64 {
        self.power * self.price
    }
}

/// Solved dispatch schedule, one row per step in chronological order
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub solver: String,
    pub objective_value: f64,
    pub rows: Vec<DispatchRow>,
}

/// Read the bound decision variables of a solved model.
pub fn extract(model: &DispatchModel, solver: &str) -> Result<DispatchReport, OptimizerError> {
    let (objective_value, bindings) = match model.state() {
        ModelState::Solved {
            objective_value,
            bindings,
        } => (*objective_value, bindings),
        ModelState::Unsolved => {
            return Err(OptimizerError::InvalidState("model has not been solved".to_string()))
        }
        ModelState::Failed(outcome) => {
            return Err(OptimizerError::InvalidState(format!(
                "model has no optimal solution ({outcome})"
            )))
        }
    };

    let schedule = model.schedule();
    let rows = izip!(
        schedule.time_steps(),
        schedule.prices.values(),
        schedule.charge_rates.values()
    )
    .map(|(t, &price, &charge_rate)| DispatchRow {
        time_step: t,
        price,
        charge_rate,
        power: bindings.value(model.power_var(t)),
        storage: bindings.value(model.storage_var(t)),
    })
    .collect();

    Ok(DispatchReport {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        solver: solver.to_string(),
        objective_value,
        rows,
    })
}

impl DispatchReport {
    pub fn total_power(&self) -> f64 {
        self.rows.iter().map(|r| r.power).sum()
    }

    pub fn peak_row(&self) -> Option<&DispatchRow> {
        self.rows
            .iter()
            .max_by(|a, b| a.power.partial_cmp(&b.power).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Re-check the solution against the model equations within `tolerance`.
    pub fn verify(
        &self,
        parameters: &StorageParameters,
        schedule: &ScheduleData,
        tolerance: f64,
    ) -> Result<(), OptimizerError> {
        if self.rows.len() != schedule.horizon() {
            return Err(OptimizerError::Verification(format!(
                "report has {} rows for a horizon of {} steps",
                self.rows.len(),
                schedule.horizon()
            )));
        }

        let mut previous = parameters.initial_storage;
        for (i, row) in self.rows.iter().enumerate() {
            if row.time_step.index() != i {
                return Err(OptimizerError::Verification(format!(
                    "row {i} holds step {}",
                    row.time_step
                )));
            }
            if row.power < -tolerance || row.power > parameters.max_power + tolerance {
                return Err(OptimizerError::Verification(format!(
                    "power[{i}] = {} outside [0, {}]",
                    row.power, parameters.max_power
                )));
            }
            if row.storage < -tolerance || row.storage > parameters.capacity + tolerance {
                return Err(OptimizerError::Verification(format!(
                    "storage[{i}] = {} outside [0, {}]",
                    row.storage, parameters.capacity
                )));
            }

            let expected = previous - row.power + parameters.injection(row.charge_rate);
            if (row.storage - expected).abs() > tolerance {
                return Err(OptimizerError::Verification(format!(
                    "balance at step {i}: storage {} but inflow implies {expected}",
                    row.storage
                )));
            }
            previous = row.storage;
        }

        let revenue: f64 = self.rows.iter().map(DispatchRow::revenue).sum();
        if (revenue - self.objective_value).abs() > tolerance * (1.0 + revenue.abs()) {
            return Err(OptimizerError::Verification(format!(
                "objective {} does not match revenue {revenue}",
                self.objective_value
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargeRateSeries, PriceSeries};
    use crate::optimizer::solver::{MockLpSolver, SolveOutcome};

    fn solved_model(values: Vec<f64>) -> DispatchModel {
        let schedule = ScheduleData::new(
            PriceSeries::new(vec![1.0, 5.0, 1.0]).unwrap(),
            ChargeRateSeries::idle(3),
        );
        let mut model = DispatchModel::build(StorageParameters::new(10.0, 10.0), schedule).unwrap();
        let mut solver = MockLpSolver::new();
        solver
            .expect_solve()
            .returning(move |program| SolveOutcome::optimal(program, values.clone()));
        model.solve(&solver);
        model
    }

    #[test]
    fn test_extract_rows_in_order() {
        let model = solved_model(vec![0.0, 10.0, 0.0, 10.0, 0.0, 0.0]);
        let report = extract(&model, "mock").unwrap();

        assert_eq!(report.objective_value, 50.0);
        assert_eq!(report.solver, "mock");
        let steps: Vec<_> = report.rows.iter().map(|r| r.time_step.index()).collect();
        assert_eq!(steps, vec![0, 1, 2]);
        assert_eq!(report.rows[1].power, 10.0);
        assert_eq!(report.rows[1].price, 5.0);
        assert_eq!(report.rows[0].storage, 10.0);
        assert_eq!(report.total_power(), 10.0);
        assert_eq!(report.peak_row().unwrap().time_step, TimeStep(1));
    }

    #[test]
    fn test_extract_requires_solve() {
        let schedule =
            ScheduleData::new(PriceSeries::new(vec![1.0]).unwrap(), ChargeRateSeries::idle(1));
        let model = DispatchModel::build(StorageParameters::new(10.0, 10.0), schedule).unwrap();
        assert!(matches!(extract(&model, "none"), Err(OptimizerError::InvalidState(_))));
    }

    #[test]
    fn test_extract_after_failed_solve() {
        let schedule =
            ScheduleData::new(PriceSeries::new(vec![1.0]).unwrap(), ChargeRateSeries::idle(1));
        let mut model = DispatchModel::build(StorageParameters::new(10.0, 10.0), schedule).unwrap();
        let mut solver = MockLpSolver::new();
        solver
            .expect_solve()
            .returning(|_| SolveOutcome::SolverError("cbc: executable not found".to_string()));
        model.solve(&solver);

        let err = extract(&model, "mock").unwrap_err();
        assert!(err.to_string().contains("executable not found"));
    }

    #[test]
    fn test_verify_accepts_consistent_solution() {
        let model = solved_model(vec![0.0, 10.0, 0.0, 10.0, 0.0, 0.0]);
        let report = extract(&model, "mock").unwrap();
        assert!(report.verify(model.parameters(), model.schedule(), 1e-6).is_ok());
    }

    #[test]
    fn test_verify_detects_broken_balance() {
        // storage[1] should be 0 after selling 10
        let model = solved_model(vec![0.0, 10.0, 0.0, 10.0, 5.0, 5.0]);
        let report = extract(&model, "mock").unwrap();
        let err = report.verify(model.parameters(), model.schedule(), 1e-6).unwrap_err();
        assert!(err.to_string().contains("balance at step 1"));
    }
}
