#![cfg(feature = "optimization")]

use storage_dispatch::optimizer::demo::{build_demo_program, run_demo};
use storage_dispatch::optimizer::{GoodLpSolver, LpSolver, SolverBackend};

#[test]
fn test_demo_reaches_known_optimum() {
    let solution = run_demo(&GoodLpSolver::new(SolverBackend::Minilp)).unwrap();
    assert!((solution.x1 - 5.0).abs() < 1e-6);
    assert!((solution.x2 - 5.0).abs() < 1e-6);
    assert!((solution.objective_value - 55.0).abs() < 1e-6);
}

#[test]
fn test_demo_solution_is_feasible() {
    let demo = build_demo_program().unwrap();
    let (_, bindings) = GoodLpSolver::default().solve(&demo.program).into_result().unwrap();
    assert!(demo.program.first_violation(bindings.values(), 1e-6).is_none());
}
