use anyhow::Result;
use axum::serve;
use gsm_bot_host::{build_app, config::BotHostConfig};
use gsm_telemetry::install as init_telemetry;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry("bot-host")?;

    let config = BotHostConfig::from_env()?;
    let app = build_app(&config)?;
    let listener = TcpListener::bind(config.addr).await?;
    info!(app_id = %config.app_id, "bot-host listening on {}", config.addr);

    serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
