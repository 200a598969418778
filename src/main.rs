use anyhow::{Context, Result};
use clap::Parser;
use storage_dispatch::{
    cli::{Args, Command},
    config::Config,
    optimizer::{demo, extract, DispatchModel, LpSolver},
    tables, telemetry,
};
use tracing::info;

/// Tolerance used when re-checking a solved schedule.
const VERIFY_TOLERANCE: f64 = 1e-6;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    telemetry::init_tracing(args.log_json);

    let cfg = Config::load(&args.config)?;
    let solver = cfg.solver();

    match args.command {
        Command::Dispatch(output) => {
            let parameters = cfg.storage_parameters();
            let schedule = cfg.schedule_data()?;
            let mut model = DispatchModel::build(parameters, schedule)
                .context("failed to build dispatch model")?;

            let outcome = model.solve(&solver);
            if !outcome.is_optimal() {
                anyhow::bail!("dispatch model is {}: {outcome}", outcome.kind());
            }

            let report = extract(&model, &solver.name())?;
            report
                .verify(model.parameters(), model.schedule(), VERIFY_TOLERANCE)
                .context("solver returned an inconsistent schedule")?;
            info!(
                id = %report.id,
                objective_value = report.objective_value,
                "dispatch schedule ready"
            );

            if output.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", tables::build_dispatch_table(&report, model.parameters().capacity));
                println!("Objective: {:.3}", report.objective_value);
            }
        }
        Command::Demo(output) => {
            let solution = demo::run_demo(&solver).context("demo LP failed")?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&solution)?);
            } else {
                println!("{}", tables::build_demo_table(&solution));
            }
        }
    }

    Ok(())
}
