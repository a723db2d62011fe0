use clap::Parser;
use greenvest::{GreenvestError, GreenvestServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), GreenvestError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    tracing::info!(
        host = %config.host,
        port = config.port,
        room_ttl_secs = config.room_ttl_secs,
        "starting Greenvest"
    );

    let server = GreenvestServer::builder()
        .bind(&config.bind_addr())
        .room_config(config.room_config())
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
