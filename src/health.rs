use crate::utils::constants::HEALTH_STATUS;
use axum::{Json, Router};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthPayload {
    pub status: String,
    pub engine: String,
}

impl HealthPayload {
    pub fn new(engine: impl Into<String>) -> Self {
        Self { status: HEALTH_STATUS.to_string(), engine: engine.into() }
    }
}

/// Answers every path and method with the fixed liveness payload.
pub fn router(engine: impl Into<String>) -> Router {
    let payload = HealthPayload::new(engine);
    Router::new().fallback(move || {
        let payload = payload.clone();
        async move { Json(payload) }
    })
}

pub async fn bind(port: u16) -> Result<TcpListener> {
    Ok(TcpListener::bind(("0.0.0.0", port)).await?)
}

/// Serve the liveness endpoint until the task is dropped.
pub async fn serve(listener: TcpListener, engine: String) -> Result<()> {
    info!("Liveness endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router(engine)).await?;
    Ok(())
}
