mod cli;
mod commands;
mod exporter;
mod render;

use apptrack::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
