use crate::config;

/// Start the server, preferring the CLI port over configuration
pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Folio API in {:?} mode", config.environment);

    crate::server::serve(config, port.unwrap_or(config.api.port)).await
}
