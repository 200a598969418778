use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Configuration file with storage, schedule and solver sections.
    #[clap(long, default_value = DEFAULT_CONFIG_PATH, env = "DISPATCH_CONFIG")]
    pub config: PathBuf,

    /// Emit logs as JSON lines.
    #[clap(long = "log-json", env = "DISPATCH_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Optimize the discharge schedule and print it.
    #[clap(name = "dispatch")]
    Dispatch(OutputArgs),

    /// Solve the two-variable demonstration LP.
    #[clap(name = "demo")]
    Demo(OutputArgs),
}

#[derive(Parser)]
pub struct OutputArgs {
    /// Print JSON instead of a table.
    #[clap(long)]
    pub json: bool,
}
