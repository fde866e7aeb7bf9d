use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use fortune_log::config::{self, Config};
use fortune_log::dashboard::{self, DashboardState};
use fortune_log::logging::{FsStore, LogService, ServiceOptions, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Ensure config and logs directories exist
    config::ensure_directories(&config)?;
    let wrote_default = config::write_default_if_missing(&config::config_file_path())?;

    // Initialize tracing BEFORE the service starts mirroring entries
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if wrote_default {
        tracing::info!(
            "Wrote default config to {}",
            config::config_file_path().display()
        );
    }

    let logs_dir = config.logs_path();
    tracing::info!("Logging to: {}", logs_dir.display());

    let (service, flush_handle) = LogService::start(
        ServiceOptions::from_config(&config),
        Arc::new(FsStore::new(&logs_dir)),
        Arc::new(SystemClock),
    );

    // Apply retention once at startup
    let report = service.cleanup_old_logs(config.retention_days);
    if !report.failed.is_empty() {
        tracing::warn!("Could not remove {} log files", report.failed.len());
    }

    let server = dashboard::start(
        config.http_port,
        DashboardState {
            service: service.clone(),
            retention_days: config.retention_days,
        },
    )
    .await?;

    service.info(
        format!("fortune-log dashboard started on {}", server.addr()),
        None,
        None,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    server.shutdown();
    // Final flush happens when the flush task exits
    flush_handle.shutdown().await;

    Ok(())
}
