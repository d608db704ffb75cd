//! brd-api binary
//!
//! Usage:
//!   brd-api serve [--config <path>] [--listen <addr>] [--data-dir <dir>]
//!   brd-api check [--config <path>] [--strict]

use anyhow::{Context, Result};
use brd_api::config::{LoggingConfig, ServiceConfig};
use brd_api::module::builtin_catalog;
use brd_api::service::{self, InitOutcome};
use brd_api::storage::Storage;
use brd_api::utils::{init_logging, init_logging_from_config, shutdown_token};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "brd-api", version, about = "BRD Generation API service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Configuration file (TOML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen address, overrides the config file
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Data directory, overrides the config file
        #[arg(long)]
        data_dir: Option<String>,

        /// Log filter, overrides the config file (RUST_LOG still wins)
        #[arg(long)]
        log_filter: Option<String>,

        /// Emit JSON log lines
        #[arg(long)]
        json_logs: bool,
    },

    /// Resolve every declared capability and report availability
    Check {
        /// Configuration file (TOML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exit non-zero if any capability is unavailable
        #[arg(long)]
        strict: bool,
    },
}

fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(ServiceConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            listen,
            data_dir,
            log_filter,
            json_logs,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if let Some(data_dir) = data_dir {
                config.storage.data_dir = data_dir;
            }
            if log_filter.is_some() || json_logs {
                let logging = config.logging.get_or_insert_with(LoggingConfig::default);
                if log_filter.is_some() {
                    logging.filter = log_filter;
                }
                logging.json_format |= json_logs;
            }
            config.validate()?;
            init_logging_from_config(config.logging.as_ref());
            run_serve(config).await
        }
        Command::Check { config, strict } => {
            init_logging(Some("warn"));
            let config = load_config(config.as_deref())?;
            Ok(run_check(&config, strict))
        }
    }
}

async fn run_serve(config: ServiceConfig) -> Result<ExitCode> {
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;

    let storage = Arc::new(Storage::new(
        &config.storage.data_dir,
        config.storage.backend.into(),
    ));
    let shutdown = shutdown_token();

    let outcome = service::serve(
        &config,
        listener,
        Arc::new(builtin_catalog()),
        Arc::clone(&storage),
        shutdown,
    )
    .await?;

    if outcome == InitOutcome::Initialized {
        if let Err(e) = storage.flush() {
            warn!("Failed to flush storage on shutdown: {}", e);
        }
    }
    info!("Exiting");
    Ok(ExitCode::SUCCESS)
}

fn run_check(config: &ServiceConfig, strict: bool) -> ExitCode {
    let outcome = service::check(config, Arc::new(builtin_catalog()), strict);

    for entry in outcome.report.entries() {
        let domain = entry.domain.to_string();
        match &entry.diagnostic {
            None => println!("[ok]   {:<12} {:<11} {}", entry.name, domain, entry.locator),
            Some(diagnostic) => println!(
                "[skip] {:<12} {:<11} {} ({})",
                entry.name, domain, entry.locator, diagnostic
            ),
        }
    }
    println!(
        "{} of {} capabilities available",
        outcome.available(),
        outcome.report.entries().len()
    );

    if outcome.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
