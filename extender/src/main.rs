use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use extender::cache::LoadCache;
use extender::config::Config;
use extender::http::{router, AppState};
use extender::metrics::MetricClient;
use extender::refresh::RefreshScheduler;

#[derive(Debug, Parser)]
#[command(name = "extender", about = "Node-balance scheduler extender")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Address to bind the HTTP scoring endpoint on.
    #[arg(long, default_value = "0.0.0.0:8888")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config).context("failed to load configuration")?;

    let client = MetricClient::new(
        config.prom_addr.clone(),
        &config.prom_basic_auth_user,
        &config.prom_basic_auth_password,
    );
    let cache = Arc::new(LoadCache::new(Duration::from_secs(config.local_cache_expire_secs)));

    let refresh = RefreshScheduler::new(client, cache.clone());
    refresh
        .run_initial_tick()
        .await
        .context("initial metric refresh failed — refusing to serve on a cold cache")?;

    let _scheduler = refresh
        .start(&config.sync_status_interval)
        .await
        .context("failed to start periodic refresh scheduler")?;

    let listen = cli.listen.clone();
    let state = Arc::new(AppState { config, cache });
    let app = router(state);

    info!(addr = %listen, "extender listening");
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
