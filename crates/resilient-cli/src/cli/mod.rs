//! CLI for the resilient HTTP client.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use resilient_core::config::{self, RetryConfig};

use commands::{run_backoff, run_config, run_request, RequestArgs};

/// Top-level CLI for the resilient HTTP client.
#[derive(Debug, Parser)]
#[command(name = "resilient")]
#[command(about = "resilient: HTTP requests with retries and exponential backoff", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Retry overrides shared by commands; unset flags fall back to config.toml.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct RetryArgs {
    /// Maximum retries after the first attempt.
    #[arg(long, value_name = "N")]
    pub retry_max: Option<u32>,
    /// Minimum backoff wait in seconds.
    #[arg(long, value_name = "SECS")]
    pub wait_min: Option<f64>,
    /// Maximum backoff wait in seconds.
    #[arg(long, value_name = "SECS")]
    pub wait_max: Option<f64>,
}

impl RetryArgs {
    pub fn apply(&self, mut cfg: RetryConfig) -> RetryConfig {
        if let Some(n) = self.retry_max {
            cfg.retry_max = n;
        }
        if let Some(secs) = self.wait_min {
            cfg.wait_min_secs = secs;
        }
        if let Some(secs) = self.wait_max {
            cfg.wait_max_secs = secs;
        }
        cfg
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send an HTTP request, retrying transient failures.
    Request {
        /// Absolute http:// or https:// URL.
        url: String,

        /// Request method (default GET, or POST when --data is given).
        #[arg(short = 'X', long, value_name = "METHOD")]
        method: Option<String>,

        /// Request body; kept in memory so every retry resends it.
        #[arg(short = 'd', long, value_name = "DATA")]
        data: Option<String>,

        /// Extra request header, repeatable.
        #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
        headers: Vec<String>,

        /// Print the status line and response headers before the body.
        #[arg(short = 'i', long)]
        include: bool,

        /// Give up after this many seconds, including backoff waits.
        #[arg(long, value_name = "SECS")]
        timeout: Option<f64>,

        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Print the backoff schedule for the effective retry settings.
    Backoff {
        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Show the config file path and its effective contents.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Request {
                url,
                method,
                data,
                headers,
                include,
                timeout,
                retry,
            } => {
                let args = RequestArgs {
                    url,
                    method,
                    data,
                    headers,
                    include,
                    timeout,
                    retry,
                };
                run_request(&cfg, args).await?
            }
            CliCommand::Backoff { retry } => run_backoff(&cfg, &retry)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
