#![cfg(feature = "optimization")]

use proptest::prelude::*;
use rstest::rstest;
use storage_dispatch::domain::{
    ChargeRateSeries, PriceSeries, ScheduleData, StorageParameters, TimeStep,
};
use storage_dispatch::optimizer::program::LinearProgram;
use storage_dispatch::optimizer::{
    extract, DispatchModel, GoodLpSolver, LpSolver, ModelState, OptimizerError, SolveOutcome,
};

const TOLERANCE: f64 = 1e-6;

fn schedule(prices: Vec<f64>, charge_rates: Vec<f64>) -> ScheduleData {
    ScheduleData::new(
        PriceSeries::new(prices).unwrap(),
        ChargeRateSeries::new(charge_rates).unwrap(),
    )
}

fn solve(parameters: StorageParameters, schedule: ScheduleData) -> (DispatchModel, SolveOutcome) {
    let mut model = DispatchModel::build(parameters, schedule).unwrap();
    let outcome = model.solve(&GoodLpSolver::default());
    (model, outcome)
}

#[test]
fn test_sells_everything_at_price_peak() {
    let (model, outcome) = solve(
        StorageParameters::new(10.0, 10.0),
        schedule(vec![1.0, 5.0, 1.0], vec![0.0, 0.0, 0.0]),
    );
    assert!(outcome.is_optimal());

    let report = extract(&model, "minilp").unwrap();
    let power: Vec<f64> = report.rows.iter().map(|r| r.power).collect();
    let storage: Vec<f64> = report.rows.iter().map(|r| r.storage).collect();

    for (actual, expected) in power.iter().zip([0.0, 10.0, 0.0]) {
        assert!((actual - expected).abs() < TOLERANCE, "power {power:?}");
    }
    for (actual, expected) in storage.iter().zip([10.0, 0.0, 0.0]) {
        assert!((actual - expected).abs() < TOLERANCE, "storage {storage:?}");
    }
    assert!((report.objective_value - 50.0).abs() < TOLERANCE);
}

#[test]
fn test_reference_schedule_is_consistent() {
    let prices = vec![0.5, 0.6, 1.0, 1.0, 0.9, 1.1, 1.8, 1.5, 0.9, 0.8, 0.7, 1.0];
    let charge = vec![0.0, 0.0, 0.0, 0.0, 0.3, 0.15, 0.15, 0.05, 0.05, 0.05, 0.0, 0.0];
    let params = StorageParameters::new(500.0, 150.0);
    let (model, outcome) = solve(params, schedule(prices, charge));
    assert!(outcome.is_optimal(), "{outcome}");

    let report = extract(&model, "minilp").unwrap();
    assert_eq!(report.rows.len(), 12);
    report.verify(&params, model.schedule(), 1e-5).unwrap();

    // Total energy available is the initial 500 plus 0.75 * 500 injected.
    assert!(report.total_power() <= 875.0 + 1e-5);
    assert!(report.objective_value > 0.0);
}

#[test]
fn test_initial_storage_limits_sales() {
    let params = StorageParameters::new(10.0, 10.0).with_initial_storage(4.0);
    let (model, outcome) = solve(params, schedule(vec![1.0, 5.0, 1.0], vec![0.0; 3]));
    assert!((outcome.objective_value().unwrap() - 20.0).abs() < TOLERANCE);
    assert!((model.power_value(TimeStep(1)).unwrap() - 4.0).abs() < TOLERANCE);
}

#[test]
fn test_overflowing_injection_is_infeasible() {
    let (model, outcome) = solve(StorageParameters::new(10.0, 1.0), schedule(vec![1.0], vec![0.5]));
    assert_eq!(outcome, SolveOutcome::Infeasible);
    assert!(matches!(model.state(), ModelState::Failed(SolveOutcome::Infeasible)));
    assert!(matches!(extract(&model, "minilp"), Err(OptimizerError::InvalidState(_))));
}

#[test]
fn test_zero_prices_give_zero_objective() {
    let (_, outcome) = solve(
        StorageParameters::new(10.0, 3.0),
        schedule(vec![0.0; 4], vec![0.0; 4]),
    );
    assert!(outcome.objective_value().unwrap().abs() < TOLERANCE);
}

#[rstest]
#[case::price_too_short(vec![1.0; 4], vec![0.0; 5], StorageParameters::new(10.0, 10.0))]
#[case::charge_too_short(vec![1.0; 5], vec![0.0; 4], StorageParameters::new(10.0, 10.0))]
#[case::empty(vec![], vec![], StorageParameters::new(10.0, 10.0))]
#[case::zero_capacity(vec![1.0], vec![0.0], StorageParameters::new(0.0, 10.0))]
#[case::zero_power(vec![1.0], vec![0.0], StorageParameters::new(10.0, 0.0))]
#[case::overfull(
    vec![1.0],
    vec![0.0],
    StorageParameters::new(10.0, 1.0).with_initial_storage(12.0)
)]
fn test_build_rejects_bad_input(
    #[case] prices: Vec<f64>,
    #[case] charge: Vec<f64>,
    #[case] parameters: StorageParameters,
) {
    let result = DispatchModel::build(parameters, schedule(prices, charge));
    assert!(matches!(result, Err(OptimizerError::Configuration(_))));
}

struct UnlicensedSolver;

impl LpSolver for UnlicensedSolver {
    fn name(&self) -> String {
        "unlicensed".to_string()
    }

    fn solve(&self, _program: &LinearProgram) -> SolveOutcome {
        SolveOutcome::SolverError("gurobi_cl: no license found".to_string())
    }
}

#[test]
fn test_solver_failure_is_recoverable() {
    let mut model = DispatchModel::build(
        StorageParameters::new(10.0, 10.0),
        schedule(vec![1.0, 2.0], vec![0.0, 0.0]),
    )
    .unwrap();

    let outcome = model.solve(&UnlicensedSolver);
    assert!(matches!(&outcome, SolveOutcome::SolverError(m) if m.contains("no license")));
    let err = extract(&model, &UnlicensedSolver.name()).unwrap_err();
    assert!(matches!(err, OptimizerError::InvalidState(_)));

    // A fresh model solves fine with another backend.
    let mut retry = DispatchModel::build(*model.parameters(), model.schedule().clone()).unwrap();
    assert!(retry.solve(&GoodLpSolver::default()).is_optimal());
}

/// Charging never exceeds what full-power selling can absorb, so every case is feasible.
fn feasible_case() -> impl Strategy<Value = (StorageParameters, ScheduleData)> {
    (1usize..8, 1.0f64..100.0, 1.0f64..100.0, 0.0f64..=1.0).prop_flat_map(
        |(nt, capacity, max_power, initial_fraction)| {
            let max_rate = (max_power / capacity).min(1.0);
            (
                proptest::collection::vec(0.0f64..10.0, nt),
                proptest::collection::vec(0.0f64..=1.0, nt),
            )
                .prop_map(move |(prices, fractions)| {
                    let charge = fractions.into_iter().map(|f| f * max_rate).collect();
                    let params = StorageParameters::new(capacity, max_power)
                        .with_initial_storage(capacity * initial_fraction);
                    (params, schedule(prices, charge))
                })
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_optimal_schedule_satisfies_model((params, data) in feasible_case()) {
        let (model, outcome) = solve(params, data.clone());
        prop_assert!(outcome.is_optimal(), "outcome: {}", outcome);

        let report = extract(&model, "minilp").unwrap();
        let tolerance = 1e-6 * (1.0 + params.capacity + params.max_power);
        prop_assert!(report.verify(&params, &data, tolerance).is_ok());

        let revenue: f64 = report.rows.iter().map(|r| r.power * r.price).sum();
        prop_assert!((revenue - report.objective_value).abs() <= tolerance * 10.0);
    }

    #[test]
    fn prop_raising_a_price_never_lowers_the_optimum(
        (params, data) in feasible_case(),
        step in 0usize..8,
        bump in 0.0f64..5.0,
    ) {
        let step = step % data.horizon();
        let (_, base) = solve(params, data.clone());

        let mut prices = data.prices.values().to_vec();
        prices[step] += bump;
        let raised =
            ScheduleData::new(PriceSeries::new(prices).unwrap(), data.charge_rates.clone());
        let (_, bumped) = solve(params, raised);

        let base = base.objective_value().unwrap();
        let bumped = bumped.objective_value().unwrap();
        prop_assert!(bumped >= base - 1e-6 * (1.0 + base.abs()));
    }
}
