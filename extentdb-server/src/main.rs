//! ExtentDB Server - process entry point
//!
//! Parses the command line, validates the storage configuration, sets up
//! logging and creates or opens the database files.

use anyhow::Context;
use clap::error::ErrorKind;
use extentdb_core::cli::parse_options;
use extentdb_core::config::{build_config, ConfigSummary, StartupConfig, StartupEnvironment};
use extentdb_core::store::{create_store, open_store};
use extentdb_core::ExtentError;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let options = match parse_options(std::env::args_os()) {
        Ok(options) => options,
        Err(err) if err.kind() == ErrorKind::DisplayHelp => {
            // Usage goes to stdout but the exit status is still nonzero
            if let Err(io_err) = err.print() {
                eprintln!("Failed to print usage: {}", io_err);
            }
            std::process::exit(1);
        }
        Err(err) => err.exit(),
    };

    let config = build_config(options, StartupEnvironment::detect())?;

    init_tracing(&config)?;

    let config = if config.create_store() {
        let header = create_store(&config).map_err(|e| store_failure(e, "create"))?;
        info!("Created database with format {}", header.version);

        if config.shutdown_after_creation() {
            report(&config);
            info!("Database created, shutting down");
            return Ok(());
        }
        config
    } else {
        open_store(config).map_err(|e| store_failure(e, "open"))?
    };

    report(&config);
    log_startup(&config);

    Ok(())
}

/// Name the kind of failure in front of the underlying error
fn store_failure(err: ExtentError, action: &str) -> anyhow::Error {
    let what = if err.is_corruption() {
        "database files are damaged or do not belong together"
    } else if err.is_fatal_config() {
        "stored configuration is invalid"
    } else {
        "data file is unreadable"
    };
    anyhow::Error::new(err).context(format!("Failed to {} database: {}", action, what))
}

/// Log to the configured file, or stderr
fn init_tracing(config: &StartupConfig) -> anyhow::Result<()> {
    let default_level = if config.verbose() { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match config.log_file() {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}

/// Surface advisories and, with --verbose, the full summary
fn report(config: &StartupConfig) {
    for warning in config.warnings() {
        warn!("{}", warning);
    }
    if config.verbose() {
        print!("{}", ConfigSummary::new(config));
    }
}

fn log_startup(config: &StartupConfig) {
    let static_config = config.static_config();
    let dynamic = config.dynamic_config();

    info!("Starting ExtentDB {}...", extentdb_core::VERSION);
    info!(
        "{} workers, {} slices, {} data files",
        config.n_workers(),
        static_config.shard_count,
        dynamic.files.len()
    );
    info!("Listening port: {}", config.port());
}
