//! HTTP surface of the numeric service.

mod routes;
pub mod types;

pub use routes::router;

use crate::config::Config;

/// Bind `config.host:config.port` and serve until the process exits.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Numeric service listening on {}", listener.local_addr()?);

    axum::serve(listener, router()).await?;
    Ok(())
}
