use std::sync::Arc;

use anyhow::Context;

use rollcall_api::app::{build_app, services::build_services};
use rollcall_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rollcall_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "configuration loaded");

    let services = Arc::new(build_services(&config).await?);
    services
        .seed(&config.admin)
        .await
        .context("bootstrap seeding failed")?;

    let app = build_app(&config, services);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
