mod cli;
mod commands;
mod infra;

use payment_router::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
