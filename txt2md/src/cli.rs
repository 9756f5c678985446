///
/// This module implements the CLI interface for txt2md: command parsing,
/// applying command-line overrides on top of the loaded settings, and
/// printing the run summary.
///
/// All conversion logic (path mirroring, staleness, the pipeline itself) lives
/// in the [`txt2md-core`] crate. This module is glue only.
///
/// ## How To Use
/// - For command-line users: use the installed `txt2md` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`txt2md-core`]: ../../txt2md-core/
use crate::client::ChatClient;
use crate::load_config::{load_config, DEFAULT_CONFIG_PATH};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use txt2md_core::config::RunSettings;
use txt2md_core::pipeline::run as run_pipeline;
use txt2md_core::summary::RunSummary;

/// Exit code for configuration and run-level errors.
pub const EXIT_ERROR: i32 = 2;

/// CLI for txt2md: convert a tree of text files into Markdown with an LLM.
#[derive(Parser)]
#[clap(
    name = "txt2md",
    version,
    about = "Convert a directory tree of plain-text files into Markdown via a local LLM server"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every new or changed input file into a mirrored Markdown file
    Convert {
        /// Path to the YAML config file
        #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Reprocess every file regardless of timestamps
        #[clap(long)]
        force: bool,
        /// Disable the timestamp cache for this run
        #[clap(long)]
        no_cache: bool,
        /// Maximum number of conversion requests in flight
        #[clap(long, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: Option<u16>,
        /// Print the summary as JSON on stdout
        #[clap(long)]
        json: bool,
    },
    /// Load and validate the config file, then print the effective settings
    CheckConfig {
        /// Path to the YAML config file
        #[clap(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

impl Commands {
    pub fn config_path(&self) -> &Path {
        match self {
            Commands::Convert { config, .. } => config,
            Commands::CheckConfig { config } => config,
        }
    }
}

/// Applies `--force`, `--no-cache` and `--concurrency` on top of the file settings.
pub fn apply_overrides(
    settings: RunSettings,
    force: bool,
    no_cache: bool,
    concurrency: Option<u16>,
) -> RunSettings {
    let enabled = settings.cache.enabled && !no_cache;
    let force_all = settings.cache.force_reprocess_all || force;
    let mut settings = settings.with_cache(enabled, force_all);
    if let Some(n) = concurrency {
        settings = settings.with_concurrency(usize::from(n));
    }
    settings
}

fn print_connection_hint(settings: &RunSettings) {
    let endpoint = &settings.endpoint;
    eprintln!();
    eprintln!("Could not reach the {:?} server at {}.", endpoint.server, endpoint.api_url);
    eprintln!("Check that:");
    eprintln!("  - the server application is running");
    eprintln!("  - a model is loaded and the local server is started");
    eprintln!("  - api_url in the [{}] section is correct", endpoint.server.section());
}

fn report(summary: &RunSummary, settings: &RunSettings, json: bool) -> Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(summary).context("Failed to serialise run summary")?;
        println!("{rendered}");
    } else {
        print!("{summary}");
    }
    if summary.connection_failure {
        tracing::error!(api_url = %settings.endpoint.api_url, "Endpoint was unreachable during the run");
        print_connection_hint(settings);
    }
    Ok(())
}

/// Extracted async CLI logic entrypoint for integration tests and main().
///
/// Returns the process exit code: 0 when nothing failed, 1 when at least one
/// file failed. Configuration and run-level errors come back as `Err`.
pub async fn run(cli: Cli) -> Result<i32> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Convert {
            config,
            force,
            no_cache,
            concurrency,
            json,
        } => {
            let settings = load_config(&config)?;
            let settings = apply_overrides(settings, force, no_cache, concurrency);
            settings.trace_loaded();
            tracing::info!(command = "convert", "Starting conversion run");

            let client = ChatClient::new();
            match run_pipeline(&settings, &client).await {
                Ok(summary) => {
                    tracing::info!(
                        command = "convert",
                        converted = summary.converted,
                        skipped = summary.skipped,
                        failed = summary.failed(),
                        "Conversion run complete"
                    );
                    report(&summary, &settings, json)?;
                    Ok(summary.exit_code())
                }
                Err(e) => {
                    tracing::error!(command = "convert", error = %e, "Conversion run aborted");
                    Err(anyhow::Error::new(e))
                }
            }
        }
        Commands::CheckConfig { config } => {
            let settings = load_config(&config)?;
            settings.trace_loaded();
            let rendered = serde_yaml::to_string(&settings)
                .context("Failed to render effective settings")?;
            println!("Configuration OK: {}", config.display());
            print!("{rendered}");
            Ok(0)
        }
    }
}
