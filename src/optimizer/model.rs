//! Storage dispatch model
//!
//! Sells stored energy across a fixed horizon at known prices. The formulation:
//! - `power[t] >= 0`: discharge power sold at step t
//! - `storage[t] >= 0`: inventory after step t
//! - maximize `Σ power[t] * price[t]`
//! - `storage[t] <= capacity`, `power[t] <= max_power`
//! - `storage[t] = storage[t-1] - power[t] + charge_rate[t] * capacity`,
//!   with `storage[-1] = initial_storage`
//!
//! The balance chain couples every step to the previous one, so the schedule
//! has to be solved over the whole horizon at once.

use tracing::{debug, warn};

use super::program::{LinearConstraint, LinearExpr, LinearProgram, Sense, VariableId};
use super::solver::{Bindings, LpSolver, SolveOutcome};
use super::OptimizerError;
use crate::domain::{ScheduleData, StorageParameters, TimeStep};

pub const CAPACITY_FAMILY: &str = "capacity";
pub const POWER_LIMIT_FAMILY: &str = "power_limit";
pub const BALANCE_FAMILY: &str = "balance";

/// Where a model is in its build → solve → extract lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum ModelState {
    Unsolved,
    Solved { objective_value: f64, bindings: Bindings },
    Failed(SolveOutcome),
}

#[derive(Debug, Clone)]
pub struct DispatchModel {
    parameters: StorageParameters,
    schedule: ScheduleData,
    program: LinearProgram,
    power: Vec<VariableId>,
    storage: Vec<VariableId>,
    state: ModelState,
}

impl DispatchModel {
    /// Validate the inputs and assemble variables, objective and constraints.
    pub fn build(
        parameters: StorageParameters,
        schedule: ScheduleData,
    ) -> Result<Self, OptimizerError> {
        let nt = schedule.prices.len();
        if nt == 0 {
            return Err(OptimizerError::Configuration(
                "horizon must contain at least one step".to_string(),
            ));
        }
        if schedule.charge_rates.len() != nt {
            return Err(OptimizerError::Configuration(format!(
                "charge rate series has {} entries, price series has {nt}",
                schedule.charge_rates.len()
            )));
        }
        parameters.validate()?;

        let mut program = LinearProgram::new(Sense::Maximize);
        let power = program.add_indexed_variables("power", nt);
        let storage = program.add_indexed_variables("storage", nt);

        let revenue = schedule
            .time_steps()
            .map(|t| (power[t.index()], schedule.prices.at(t)))
            .collect();
        program.set_objective(revenue)?;

        for t in schedule.time_steps() {
            let i = t.index();
            program.add_constraint(
                CAPACITY_FAMILY,
                LinearConstraint::leq(
                    format!("{CAPACITY_FAMILY}[{t}]"),
                    LinearExpr::new().term(storage[i], 1.0),
                    parameters.capacity,
                ),
            )?;
        }

        for t in schedule.time_steps() {
            let i = t.index();
            program.add_constraint(
                POWER_LIMIT_FAMILY,
                LinearConstraint::leq(
                    format!("{POWER_LIMIT_FAMILY}[{t}]"),
                    LinearExpr::new().term(power[i], 1.0),
                    parameters.max_power,
                ),
            )?;
        }

        // storage[t] + power[t] - storage[t-1] == injection[t]  (+ initial at t = 0)
        for t in schedule.time_steps() {
            let i = t.index();
            let injection = parameters.injection(schedule.charge_rates.at(t));
            let mut expr = LinearExpr::new().term(storage[i], 1.0).term(power[i], 1.0);
            let rhs = match t.previous() {
                Some(prev) => {
                    expr.add_term(storage[prev.index()], -1.0);
                    injection
                }
                None => parameters.initial_storage + injection,
            };
            program.add_constraint(
                BALANCE_FAMILY,
                LinearConstraint::equal(format!("{BALANCE_FAMILY}[{t}]"), expr, rhs),
            )?;
        }

        debug!(
            steps = nt,
            variables = program.num_variables(),
            constraints = program.num_constraints(),
            capacity = parameters.capacity,
            max_power = parameters.max_power,
            initial_storage = parameters.initial_storage,
            "built dispatch model"
        );

        Ok(Self {
            parameters,
            schedule,
            program,
            power,
            storage,
            state: ModelState::Unsolved,
        })
    }

    /// Hand the program to `solver` and bind the values on success.
    ///
    /// A model is solved once; later calls return the recorded outcome
    /// without calling the solver again.
    pub fn solve(&mut self, solver: &dyn LpSolver) -> SolveOutcome {
        match &self.state {
            ModelState::Solved {
                objective_value,
                bindings,
            } => {
                return SolveOutcome::Optimal {
                    objective_value: *objective_value,
                    bindings: bindings.clone(),
                }
            }
            ModelState::Failed(outcome) => return outcome.clone(),
            ModelState::Unsolved => {}
        }

        let outcome = match solver.solve(&self.program) {
            SolveOutcome::Optimal { bindings, .. }
                if bindings.len() != self.program.num_variables() =>
            {
                SolveOutcome::SolverError(format!(
                    "solver returned {} values for {} variables",
                    bindings.len(),
                    self.program.num_variables()
                ))
            }
            other => other,
        };

        self.state = match &outcome {
            SolveOutcome::Optimal {
                objective_value,
                bindings,
            } => ModelState::Solved {
                objective_value: *objective_value,
                bindings: bindings.clone(),
            },
            other => {
                warn!(outcome = %other, "dispatch model has no optimal solution");
                ModelState::Failed(other.clone())
            }
        };
        outcome
    }

    pub fn parameters(&self) -> &StorageParameters {
        &self.parameters
    }

    pub fn schedule(&self) -> &ScheduleData {
        &self.schedule
    }

    pub fn program(&self) -> &LinearProgram {
        &self.program
    }

    pub fn horizon(&self) -> usize {
        self.power.len()
    }

    pub fn power_var(&self, t: TimeStep) -> VariableId {
        self.power[t.index()]
    }

    pub fn storage_var(&self, t: TimeStep) -> VariableId {
        self.storage[t.index()]
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    /// Bound values, only after an optimal solve.
    pub fn bindings(&self) -> Option<&Bindings> {
        match &self.state {
            ModelState::Solved { bindings, .. } => Some(bindings),
            _ => None,
        }
    }

    pub fn objective_value(&self) -> Option<f64> {
        match &self.state {
            ModelState::Solved { objective_value, .. } => Some(*objective_value),
            _ => None,
        }
    }

    pub fn power_value(&self, t: TimeStep) -> Option<f64> {
        self.bindings().map(|b| b.value(self.power_var(t)))
    }

    pub fn storage_value(&self, t: TimeStep) -> Option<f64> {
        self.bindings().map(|b| b.value(self.storage_var(t)))
    }
}
