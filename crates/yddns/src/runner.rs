//! Engine wiring and the refresh loop.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use yddns_core::traits::{Cache, HttpTransport};
use yddns_core::{
    Domain, DomainReport, FileCache, MemoryCache, RefreshEngine, RefreshOutcome, WanIpResolver,
    YddnsConfig, prepare_domain,
};
use yddns_http::ReqwestTransport;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use crate::config::default_cache_dir;

/// Build the engine for `config`.
///
/// `persist` selects the file cache; otherwise results only live as long
/// as the process.
pub async fn build_engine(
    config: &YddnsConfig,
    app_version: &str,
    persist: bool,
) -> Result<RefreshEngine> {
    let transport: Arc<dyn HttpTransport> =
        Arc::new(ReqwestTransport::new().context("Failed to create HTTP transport")?);

    let settings = config.cache.settings(default_cache_dir());
    let cache: Box<dyn Cache> = if persist {
        Box::new(
            FileCache::new(settings)
                .await
                .context("Failed to open cache")?,
        )
    } else {
        Box::new(MemoryCache::new(settings))
    };

    let wan = WanIpResolver::with_endpoints(
        transport.clone(),
        &config.wan_ip4_url,
        &config.wan_ip6_url,
    );

    Ok(
        RefreshEngine::new(transport, cache, config.refresh_settings(app_version))
            .with_wan_resolver(wan),
    )
}

/// Run refresh cycles until a shutdown signal arrives, or once.
///
/// A signal received mid-cycle takes effect after that cycle.
pub async fn run_refresh(
    engine: &RefreshEngine,
    domains: &[Domain],
    interval: Duration,
    once: bool,
) -> Result<()> {
    if once {
        run_cycle(engine, domains).await;
        return Ok(());
    }

    info!(
        "Refreshing {} domain(s) every {}s",
        domains.len(),
        interval.as_secs()
    );

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                info!("Received shutdown signal: {}", signal?);
                return Ok(());
            }
            _ = ticker.tick() => run_cycle(engine, domains).await,
        }
    }
}

/// Refresh one domain given on the command line, bypassing the cache
pub async fn run_single(engine: &RefreshEngine, mut domain: Domain) -> Result<RefreshOutcome> {
    let settings = engine.settings();
    prepare_domain(&mut domain, &settings.templates, &settings.app_version)?;

    let outcome = engine.refresh_uncached(&domain).await?;
    info!("{}: {}", domain.display_name(), outcome);
    Ok(outcome)
}

async fn run_cycle(engine: &RefreshEngine, domains: &[Domain]) {
    let reports = engine.run_cycle(domains).await;
    let summary = CycleSummary::from_reports(&reports);

    if summary.failed > 0 {
        warn!("{}", summary);
    } else {
        info!("{}", summary);
    }
}

/// Per-cycle counters for the summary log line
#[derive(Debug, Default, PartialEq, Eq)]
struct CycleSummary {
    refreshed: usize,
    skipped: usize,
    failed: usize,
}

impl CycleSummary {
    fn from_reports(reports: &[DomainReport]) -> Self {
        reports
            .iter()
            .fold(Self::default(), |mut summary, report| {
                match &report.result {
                    Ok(RefreshOutcome::Refreshed { .. }) => summary.refreshed += 1,
                    Ok(RefreshOutcome::Skipped) => summary.skipped += 1,
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }
}

impl std::fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cycle finished: {} refreshed, {} skipped, {} failed",
            self.refreshed, self.skipped, self.failed
        )
    }
}

/// Wait for SIGTERM or SIGINT
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
