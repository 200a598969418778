//! Two-variable LP used to exercise the solver wiring end to end.
//!
//! ```text
//! maximize  x1 + 10 x2
//! s.t.      10 x1 + 1 >= x2
//!            0.2 x1 + 4 >= x2
//!           -0.2 x1 + 6 >= x2
//!           x1, x2 >= 0
//! ```
//!
//! The optimum sits where the last two constraints cross: `x1 = x2 = 5`.

use serde::Serialize;

use super::program::{LinearConstraint, LinearExpr, LinearProgram, Sense, VariableId};
use super::solver::LpSolver;
use super::OptimizerError;

pub const DEMO_FAMILY: &str = "c";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DemoSolution {
    pub x1: f64,
    pub x2: f64,
    pub objective_value: f64,
}

pub struct DemoProgram {
    pub program: LinearProgram,
    pub x1: VariableId,
    pub x2: VariableId,
}

pub fn build_demo_program() -> Result<DemoProgram, OptimizerError> {
    let mut program = LinearProgram::new(Sense::Maximize);
    let x1 = program.add_variable("x1");
    let x2 = program.add_variable("x2");

    // Each row reads `slope * x1 + intercept >= x2`.
    for (i, (slope, intercept)) in [(10.0, 1.0), (0.2, 4.0), (-0.2, 6.0)].into_iter().enumerate() {
        program.add_constraint(
            DEMO_FAMILY,
            LinearConstraint::geq(
                format!("{DEMO_FAMILY}[{}]", i + 1),
                LinearExpr::new().term(x1, slope).term(x2, -1.0).plus(intercept),
                0.0,
            ),
        )?;
    }
    program.set_objective(LinearExpr::new().term(x1, 1.0).term(x2, 10.0))?;

    Ok(DemoProgram { program, x1, x2 })
}

pub fn run_demo(solver: &dyn LpSolver) -> Result<DemoSolution, OptimizerError> {
    let demo = build_demo_program()?;
    let (objective_value, bindings) = solver.solve(&demo.program).into_result()?;
    Ok(DemoSolution {
        x1: bindings.value(demo.x1),
        x2: bindings.value(demo.x2),
        objective_value,
    })
}
