

use std::sync::Arc;

use anyhow::Context;
use memberscope::directory::TelegramConnector;
use memberscope::{AppState, CheckerConfig, create_router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env()
                .add_directive("memberscope=info".parse()?)
                .add_directive("tower_http=warn".parse()?),
        )
        .init();

    let config = CheckerConfig::load().context("loading configuration")?;
    let connector =
        TelegramConnector::from_config(&config).context("building Telegram client")?;

    let address = config.bind_address();
    let app = create_router(AppState::new(Arc::new(connector), config));

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("memberscope listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("memberscope stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
