use crate::commands::{run_config, run_select, run_simulate, ConfigArgs, SelectArgs, SimulateArgs};
use clap::{Parser, Subcommand};
use payment_router::config::AppConfig;
use payment_router::error::AppError;
use payment_router::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "payment-router",
    about = "Select payin endpoints and payout agents from a routing snapshot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one selection and print the decision with its explanation
    Select(SelectArgs),
    /// Repeat a selection many times and compare observed with expected frequencies
    Simulate(SimulateArgs),
    /// Print the selection configuration resolved for a router
    Config(ConfigArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Select(args) => run_select(args, &config.routing),
        Command::Simulate(args) => run_simulate(args, &config.routing),
        Command::Config(args) => run_config(args, &config.routing),
    }
}
