use tokio::net::TcpListener;
use tracing::info;
use tvstream_core::config::Settings;

mod error;
mod middleware;
mod routes;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    let settings = Settings::from_env()?;
    let store = tvstream_db::open(&settings).await?;

    let state = AppState {
        store: store.clone(),
    };
    let app = routes::app(state, settings.admin_enabled);

    info!(
        addr = %settings.api_bind,
        env = %settings.env,
        admin = settings.admin_enabled,
        "starting api"
    );

    let listener = TcpListener::bind(settings.api_bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
