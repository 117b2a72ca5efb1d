//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without any of the other front ends.
//!
//! ## Intended use
//! Useful during development when only the HTTP surface (with OpenAPI/Swagger UI) is needed.
//! The workspace's main `his-run` binary serves the same router.
//!
//! # Environment Variables
//! - `HIS_REST_ADDR`: listen address (default: "0.0.0.0:3000")
//! - `HIS_DATA_DIR`: record store directory (default: "his_data")
//! - `HIS_CARE_LOCATION`: care location stamped on every commit

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use his_core::config::{care_location_from_env_value, data_dir_from_env_value};
use his_core::{CoreConfig, HisServices, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("his_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("HIS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        data_dir_from_env_value(std::env::var("HIS_DATA_DIR").ok()),
        care_location_from_env_value(std::env::var("HIS_CARE_LOCATION").ok())?,
    )?);
    let store = Arc::new(Store::open_or_initialise(cfg)?);
    if store.is_empty() {
        tracing::warn!("record store has no accounts yet; run `his seed` or `his useradd-admin`");
    }

    tracing::info!("-- Starting HIS REST API on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, api_rest::app(HisServices::new(store))).await?;

    Ok(())
}
