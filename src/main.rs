// main.rs
// Loads settings, opens the configured store and serves the JSON API.

use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::info;

use echeancier::{config::Settings, routes, state, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::from_env()?;
    telemetry::init_tracing(&settings.log_level, settings.log_format);

    let state = Arc::new(
        state::init_state(&settings)
            .await
            .context("failed to initialize store")?,
    );

    let app = routes::router(state);

    let listener = TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", settings.bind_addr))?;
    info!(addr = %settings.bind_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
