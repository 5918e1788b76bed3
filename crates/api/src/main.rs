use anyhow::Context;

use roster_api::app::{build_app, services::AppServices};
use roster_infra::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    roster_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let services = AppServices::from_settings(&settings)
        .await
        .context("failed to initialize storage")?;

    let app = build_app(&settings.jwt_secret, services);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        storage = settings.storage_backend.as_str(),
        cache = settings.cache_enabled,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
