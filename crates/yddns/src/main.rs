// # yddns - Dynamic DNS client
//
// Thin integration layer around yddns-core:
// 1. Parsing the command line
// 2. Initializing logging and the runtime
// 3. Loading and validating the configuration
// 4. Running refresh cycles until shutdown
//
// ## Configuration
//
// `config.toml`, `config.json` or `config.yaml` in `/etc/yddns`, `~/.yddns`
// or the working directory, or the file given with `--config` / `YDDNS_CONFIG`.
//
// ```toml
// refresh_interval = 600
//
// [[domains]]
// domain = "home.example.org"
// username = "user"
// password = "secret"
// refresh_url = ":dyndns"
//
// [templates.dyndns]
// host = "members.dyndns.org"
// refresh_url = "<protocol>://<host>/nic/update?hostname=<domain>&myip=<ip4>"
// ```
//
// ## Example
//
// ```bash
// yddns refresh
// yddns refresh --once
// yddns domain ':dyndns' --domain home.example.org --username user --password secret
// ```

mod cli;
mod config;
mod runner;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands, DomainArgs, RefreshArgs};
use yddns_core::config::APP_NAME;

/// Exit codes for different termination scenarios
///
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum YddnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<YddnsExitCode> for ExitCode {
    fn from(code: YddnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Version stamped into the default user agent
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn main() -> ExitCode {
    let Cli { global, command } = Cli::parse();

    let Some(log_level) = parse_log_level(&global.log_level) else {
        eprintln!(
            "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            global.log_level
        );
        return YddnsExitCode::ConfigError.into();
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return YddnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return YddnsExitCode::RuntimeError.into();
        }
    };

    let search_dirs = config::search_dirs();
    let explicit = global.config.as_deref();

    let code = rt.block_on(async {
        match command {
            Commands::Refresh(args) => refresh(explicit, &search_dirs, args).await,
            Commands::Domain(args) => domain(explicit, &search_dirs, args).await,
        }
    });

    code.into()
}

async fn refresh(
    explicit: Option<&Path>,
    search_dirs: &[PathBuf],
    args: RefreshArgs,
) -> YddnsExitCode {
    let loaded = match config::load(explicit, search_dirs, true) {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return YddnsExitCode::ConfigError;
        }
    };

    if let Err(e) = loaded.config.validate() {
        error!("Configuration validation error: {}", e);
        return YddnsExitCode::ConfigError;
    }

    let config = loaded.config;
    if let Some(path) = &loaded.path {
        info!("Starting {} {} with {}", APP_NAME, APP_VERSION, path.display());
    }
    info!("Configuration loaded: {} domain(s)", config.domains.len());

    let engine = match runner::build_engine(&config, APP_VERSION, config.cache.persist).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return YddnsExitCode::ConfigError;
        }
    };

    let interval = Duration::from_secs(args.interval.unwrap_or(config.refresh_interval));

    match runner::run_refresh(&engine, &config.domains, interval, args.once).await {
        Ok(()) => {
            info!("Shutting down");
            YddnsExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Runtime error: {:#}", e);
            YddnsExitCode::RuntimeError
        }
    }
}

async fn domain(
    explicit: Option<&Path>,
    search_dirs: &[PathBuf],
    args: DomainArgs,
) -> YddnsExitCode {
    // Only templates and WAN endpoints are taken from a configuration, if any
    let config = match config::load(explicit, search_dirs, false) {
        Ok(loaded) => loaded.config,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return YddnsExitCode::ConfigError;
        }
    };

    let engine = match runner::build_engine(&config, APP_VERSION, false).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return YddnsExitCode::ConfigError;
        }
    };

    let domain = args.to_domain();
    match runner::run_single(&engine, domain).await {
        Ok(outcome) => {
            println!("{}", outcome);
            YddnsExitCode::CleanShutdown
        }
        Err(e) => {
            error!("{}: {:#}", args.refresh_url, e);
            YddnsExitCode::RuntimeError
        }
    }
}
