use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use his_core::config::{care_location_from_env_value, data_dir_from_env_value};
use his_core::{CoreConfig, HisServices, Store};

/// Main entry point for the HIS application
///
/// Opens (or creates) the record store and serves the REST API on port 3000
/// (configurable via HIS_REST_ADDR). Every request except `/health` is authenticated with
/// HTTP Basic credentials of a stored account.
///
/// # Environment Variables
/// - `HIS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HIS_DATA_DIR`: Directory for record storage (default: "his_data")
/// - `HIS_CARE_LOCATION`: Care location recorded in every commit (default: "General Hospital")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, store opening or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("his_run=info".parse()?)
                .add_directive("his_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("HIS_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::new(
        data_dir_from_env_value(std::env::var("HIS_DATA_DIR").ok()),
        care_location_from_env_value(std::env::var("HIS_CARE_LOCATION").ok())?,
    )?);
    tracing::info!("++ Using record store at {}", cfg.data_dir().display());
    let store = Arc::new(Store::open_or_initialise(cfg)?);

    tracing::info!("++ Starting HIS REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, api_rest::app(HisServices::new(store))).await?;

    Ok(())
}
