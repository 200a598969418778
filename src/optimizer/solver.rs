//! LP solver adapter.
//!
//! [`LpSolver`] is the only seam between model construction and a concrete
//! solver: a [`LinearProgram`] goes in, a [`SolveOutcome`] comes out.
//! [`GoodLpSolver`] implements it on top of `good_lp`, either with the
//! in-process `minilp` simplex or by driving an external solver executable
//! (CBC, GLPK, Gurobi) through the `lp-solvers` bridge.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, warn};

use super::program::{LinearProgram, VariableId};
use super::OptimizerError;

/// Values chosen by the solver, indexed by [`VariableId`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bindings(Vec<f64>);

impl Bindings {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn value(&self, var: VariableId) -> f64 {
        self.0[var.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of one solve attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal { objective_value: f64, bindings: Bindings },
    Infeasible,
    Unbounded,
    SolverError(String),
}

impl SolveOutcome {
    /// Optimal outcome whose objective is evaluated from `values`.
    pub fn optimal(program: &LinearProgram, values: Vec<f64>) -> Self {
        let objective_value = program.objective().eval(&values);
        Self::Optimal {
            objective_value,
            bindings: Bindings::new(values),
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, Self::Optimal { .. })
    }

    pub fn objective_value(&self) -> Option<f64> {
        match self {
            Self::Optimal { objective_value, .. } => Some(*objective_value),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Optimal { .. } => "optimal",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::SolverError(_) => "solver_error",
        }
    }

    /// Turn anything but an optimum into an error for callers that cannot branch.
    pub fn into_result(self) -> Result<(f64, Bindings), OptimizerError> {
        match self {
            Self::Optimal {
                objective_value,
                bindings,
            } => Ok((objective_value, bindings)),
            Self::Infeasible => Err(OptimizerError::Solver("problem is infeasible".to_string())),
            Self::Unbounded => Err(OptimizerError::Solver("problem is unbounded".to_string())),
            Self::SolverError(message) => Err(OptimizerError::Solver(message)),
        }
    }
}

impl std::fmt::Display for SolveOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal { objective_value, .. } => {
                write!(f, "optimal (objective {objective_value})")
            }
            Self::Infeasible => write!(f, "infeasible"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::SolverError(message) => write!(f, "solver error: {message}"),
        }
    }
}

/// Anything that can solve a [`LinearProgram`].
#[cfg_attr(test, mockall::automock)]
pub trait LpSolver: Send + Sync {
    /// Short label recorded in reports.
    fn name(&self) -> String;

    fn solve(&self, program: &LinearProgram) -> SolveOutcome;
}

/// Backend used by [`GoodLpSolver`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Pure-Rust simplex, runs in-process
    #[default]
    Minilp,
    /// COIN-OR CBC executable (`cbc`)
    Cbc,
    /// GNU Linear Programming Kit executable (`glpsol`)
    Glpk,
    /// Gurobi command line (`gurobi_cl`)
    Gurobi,
}

#[derive(Debug, Clone, Default)]
pub struct GoodLpSolver {
    backend: SolverBackend,
    time_limit: Option<Duration>,
}

impl GoodLpSolver {
    pub fn new(backend: SolverBackend) -> Self {
        Self {
            backend,
            time_limit: None,
        }
    }

    /// Give up on solves that take longer than `limit`.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn backend(&self) -> SolverBackend {
        self.backend
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }
}

impl LpSolver for GoodLpSolver {
    fn name(&self) -> String {
        format!("good_lp/{}", self.backend)
    }

    fn solve(&self, program: &LinearProgram) -> SolveOutcome {
        info!(
            backend = %self.backend,
            variables = program.num_variables(),
            constraints = program.num_constraints(),
            "solving linear program"
        );

        let started = Instant::now();
        let outcome = match self.time_limit {
            None => solve_program(program, self.backend),
            Some(limit) => {
                let program = program.clone();
                let backend = self.backend;
                solve_with_deadline(backend, limit, move || solve_program(&program, backend))
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            SolveOutcome::Optimal { objective_value, .. } => {
                info!(backend = %self.backend, elapsed_ms, objective_value, "solve finished")
            }
            other => warn!(
                backend = %self.backend,
                elapsed_ms,
                outcome = %other,
                "solve did not reach an optimum"
            ),
        }
        outcome
    }
}

/// Run `solve` on a worker thread and give up after `limit`.
///
/// The worker is detached on timeout; it keeps running until the backend returns.
fn solve_with_deadline<F>(backend: SolverBackend, limit: Duration, solve: F) -> SolveOutcome
where
    F: FnOnce() -> SolveOutcome + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("lp-solve-{backend}"))
        .spawn(move || {
            // The receiver is gone once the deadline passed.
            let _ = tx.send(solve());
        });
    if let Err(err) = spawned {
        return SolveOutcome::SolverError(format!("failed to start solver thread: {err}"));
    }

    match rx.recv_timeout(limit) {
        Ok(outcome) => outcome,
        Err(RecvTimeoutError::Timeout) => SolveOutcome::SolverError(format!(
            "{backend} solver timed out after {}s",
            limit.as_secs_f64()
        )),
        Err(RecvTimeoutError::Disconnected) => {
            SolveOutcome::SolverError(format!("{backend} solver thread exited without a result"))
        }
    }
}

#[cfg(feature = "optimization")]
fn solve_program(program: &LinearProgram, backend: SolverBackend) -> SolveOutcome {
    use good_lp::solvers::lp_solvers::{
        CbcSolver, GlpkSolver, GurobiSolver, LpSolver as ExternalSolver,
    };

    match backend {
        SolverBackend::Minilp => run_good_lp(program, good_lp::solvers::minilp::minilp),
        SolverBackend::Cbc => run_good_lp(program, ExternalSolver(CbcSolver::new())),
        SolverBackend::Glpk => run_good_lp(program, ExternalSolver(GlpkSolver::new())),
        SolverBackend::Gurobi => run_good_lp(program, ExternalSolver(GurobiSolver::new())),
    }
}

#[cfg(feature = "optimization")]
fn run_good_lp<S>(program: &LinearProgram, solver: S) -> SolveOutcome
where
    S: good_lp::solvers::Solver,
    S::Model: good_lp::SolverModel<Error = good_lp::ResolutionError>,
{
    use good_lp::{
        constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
        Variable,
    };

    use super::program::{LinearExpr, Relation, Sense};

    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = (0..program.num_variables())
        .map(|_| problem.add(variable().min(0.0)))
        .collect();

    // Constants are folded into the right-hand side and left out of the
    // objective; the reported objective is evaluated from the bindings.
    let affine = |expr: &LinearExpr| -> Expression {
        expr.terms()
            .iter()
            .map(|&(var, coefficient)| coefficient * vars[var.index()])
            .sum::<Expression>()
    };

    let objective = affine(program.objective());
    let unsolved = match program.sense() {
        Sense::Maximize => problem.maximise(objective),
        Sense::Minimize => problem.minimise(objective),
    };

    let mut model = unsolved.using(solver);
    for c in program.constraints() {
        let lhs = affine(&c.expr);
        let rhs = c.rhs - c.expr.offset();
        model = model.with(match c.relation {
            Relation::LessOrEqual => constraint!(lhs <= rhs),
            Relation::Equal => constraint!(lhs == rhs),
            Relation::GreaterOrEqual => constraint!(lhs >= rhs),
        });
    }

    match model.solve() {
        Ok(solution) => {
            let values = vars.iter().map(|&v| solution.value(v)).collect();
            SolveOutcome::optimal(program, values)
        }
        Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
        Err(ResolutionError::Unbounded) => SolveOutcome::Unbounded,
        Err(err) => SolveOutcome::SolverError(err.to_string()),
    }
}

#[cfg(not(feature = "optimization"))]
fn solve_program(_program: &LinearProgram, backend: SolverBackend) -> SolveOutcome {
    SolveOutcome::SolverError(format!(
        "{backend} backend requires the 'optimization' feature to be enabled"
    ))
}
