use std::sync::Arc;

use docket_core::config::Config;
use docket_server::{build_router, logging::LogHub, spawn_session_pruner, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let logs = LogHub::new(config.log_ring_size);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docket_server=info,docket_core=info,docket_agent=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(logs.layer())
        .init();

    let backend = docket_agent::backend_from_config(&config)?;
    info!(backend = backend.name(), "completion backend ready");

    let addr = format!("{}:{}", config.web_bind, config.web_port);
    let state = Arc::new(AppState::new(config, backend, logs));
    spawn_session_pruner(Arc::clone(&state));

    let app = build_router(state);

    info!("Listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
