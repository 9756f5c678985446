use clap::Parser;
use std::process::ExitCode;
use txt2md::cli::{run, Cli, EXIT_ERROR};
use txt2md::load_config::load_log_settings;
use txt2md::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logging settings come from the same config file; fall back to defaults
    // so that a broken config still gets reported.
    let log_settings = load_log_settings(cli.command.config_path());
    if let Err(e) = init_logging(&log_settings) {
        eprintln!("{e}");
    }
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let code = match run(cli).await {
        Ok(code) => {
            tracing::info!(exit_code = code, "CLI completed");
            code
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "CLI exited with error");
            eprintln!("Error: {e:#}");
            EXIT_ERROR
        }
    };
    ExitCode::from(code as u8)
}
