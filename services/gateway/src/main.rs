use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;

use portico_core::tracing::init_tracing;
use portico_gateway::config::GatewayConfig;
use portico_gateway::router::build_router;
use portico_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = GatewayConfig::from_env()?;
    let state = AppState::from_config(&config)?;
    let router = build_router(state, config.request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "gateway listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}
