use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hyperv_exporter::collectors::COLLECTOR_NAMES;
use hyperv_exporter::config::{self, ExporterConfig, SourceKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod server;

#[derive(Debug, Parser)]
#[command(
    name = "hyperv_exporter",
    version,
    about = "Prometheus exporter for Hyper-V performance counters"
)]
struct Cli {
    /// Address on which to expose metrics and web interface.
    #[arg(long = "telemetry.addr", default_value = config::DEFAULT_LISTEN_ADDRESS)]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "telemetry.path", default_value = config::DEFAULT_METRICS_PATH)]
    metrics_path: String,

    /// Comma separated list of collectors to run.
    #[arg(long = "collectors.enabled", default_value_t = COLLECTOR_NAMES.join(","))]
    collectors: String,

    /// Read counters from a JSON fixture document instead of WMI.
    #[arg(long = "source.fixture")]
    fixture: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ExporterConfig> {
        let config = ExporterConfig {
            listen_address: config::parse_listen_address(&self.listen_address)?,
            metrics_path: self.metrics_path,
            collectors: config::parse_collectors(&self.collectors)?,
            source: self.fixture.map_or(SourceKind::Wmi, SourceKind::Fixture),
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::from_default_env().add_directive("hyperv_exporter=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Cli::parse().into_config().context("invalid configuration")?;
    let source = config
        .build_source()
        .context("failed to open counter source")?;
    let scraper = Arc::new(
        config
            .build_scraper(source)
            .context("failed to build collectors")?,
    );
    info!(
        collectors = ?scraper.collector_names().collect::<Vec<_>>(),
        source = ?config.source,
        "enabled collectors"
    );

    let listener = tokio::net::TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_address))?;
    info!(
        address = %config.listen_address,
        path = %config.metrics_path,
        "starting HTTP server"
    );

    axum::serve(listener, server::router(scraper, &config.metrics_path))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
