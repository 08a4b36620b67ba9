//! CLI definitions for rsvp.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use rsvp_config::SoakConfig;

/// rsvp CLI.
#[derive(Parser)]
#[command(name = "rsvp")]
#[command(about = "Correlation registry for asynchronous request/response matching")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (defaults apply when the file is missing)
    #[arg(short, long, default_value = "rsvp.toml", global = true, env = "RSVP_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Drive a registry with concurrent callers and a responder pool
    Soak(SoakArgs),

    /// Print the effective configuration
    Config {
        /// Also report validation errors and warnings
        #[arg(long)]
        validate: bool,
    },
}

/// Overrides for the `[soak]` configuration section.
#[derive(Args, Debug, Default)]
pub(crate) struct SoakArgs {
    /// Concurrent caller tasks
    #[arg(long)]
    pub callers: Option<usize>,

    /// Responder tasks
    #[arg(long)]
    pub responders: Option<usize>,

    /// Requests issued by each caller
    #[arg(long)]
    pub requests: Option<usize>,

    /// Responder send timeout in milliseconds
    #[arg(long)]
    pub send_timeout_ms: Option<u64>,

    /// Caller receive timeout in milliseconds
    #[arg(long)]
    pub receive_timeout_ms: Option<u64>,

    /// Fraction of callers that stop listening (0.0..=1.0)
    #[arg(long)]
    pub abandon_ratio: Option<f64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SoakArgs {
    /// Overlay the command line values onto the configured ones.
    pub fn apply(&self, soak: &mut SoakConfig) {
        if let Some(callers) = self.callers {
            soak.callers = callers;
        }
        if let Some(responders) = self.responders {
            soak.responders = responders;
        }
        if let Some(requests) = self.requests {
            soak.requests_per_caller = requests;
        }
        if let Some(timeout) = self.send_timeout_ms {
            soak.send_timeout_ms = timeout;
        }
        if let Some(timeout) = self.receive_timeout_ms {
            soak.receive_timeout_ms = timeout;
        }
        if let Some(ratio) = self.abandon_ratio {
            soak.abandon_ratio = ratio;
        }
    }
}
