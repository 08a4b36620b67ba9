//! rsvp - correlation registry tooling
//!
//! Main entry point for the rsvp CLI.

mod cli;
mod soak;

use std::sync::OnceLock;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use rsvp_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use rsvp_registry::CancellationToken;

use cli::{Cli, Commands, SoakArgs};

/// Initialize tracing with console output and, when `logging.dir` is set,
/// a daily rolling log file.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match &logging.dir {
        Some(dir) => {
            let log_dir = ConfigLoader::expand_path(&dir.to_string_lossy());
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("rsvp")
                .filename_suffix("log")
                .max_log_files(14)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer flushing for the life of the process.
            static GUARD: OnceLock<WorkerGuard> = OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::load_or_default(&cli.config)?;

    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Soak(args) => run_soak(&mut config, args).await,
        Commands::Config { validate } => show_config(&config, validate),
    }
}

/// Run the soak workload and print its report.
async fn run_soak(config: &mut Config, args: SoakArgs) -> Result<(), Box<dyn std::error::Error>> {
    args.apply(&mut config.soak);

    let validation = ConfigValidator::validate(config);
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !validation.is_valid() {
        for err in &validation.errors {
            error!(path = %err.path, "{}", err.message);
        }
        return Err(format!("invalid configuration ({} errors)", validation.errors.len()).into());
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping soak run");
                shutdown.cancel();
            }
        });
    }

    let report = soak::run(config.registry.clone(), config.soak.clone(), shutdown).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render_text());
    }

    if !report.is_healthy() {
        return Err(format!(
            "soak run unhealthy: {} mismatches, {} leaked entries",
            report.mismatches, report.leaked_entries
        )
        .into());
    }
    Ok(())
}

/// Print the effective configuration, optionally with validation findings.
fn show_config(config: &Config, validate: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", ConfigLoader::render(config)?);

    if !validate {
        return Ok(());
    }

    let validation = ConfigValidator::validate(config);
    for err in &validation.errors {
        println!("error: {}: {}", err.path, err.message);
    }
    for warning in &validation.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }

    if validation.is_valid() {
        println!("configuration is valid");
        Ok(())
    } else {
        Err(format!("invalid configuration ({} errors)", validation.errors.len()).into())
    }
}
