//! Service entry-point: migrates the schema, wires services and runs the
//! retention sweeper until interrupted.

use banner_service::bootstrap::BannerServices;
use banner_service::domain::request_shutdown;
use banner_service::settings::AppSettings;
use color_eyre::eyre::{Result, WrapErr};
use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os()).wrap_err("load settings")?;
    let services = BannerServices::connect(&settings)
        .await
        .wrap_err("start banner services")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = services.sweeper;
    let sweeper_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .wrap_err("listen for shutdown signal")?;
    info!("shutdown requested");

    request_shutdown(&shutdown_tx);
    sweeper_task.await.wrap_err("join retention sweeper")?;
    Ok(())
}
