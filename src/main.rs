use anyhow::Result;
use axum::Router;
use precog_matrix::{api, config, state, telemetry};
use config::Config;
use state::AppState;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cfg = Config::load()?;
    telemetry::init_tracing(cfg.logging.format);

    info!(
        model = %cfg.artifacts.paths().model.display(),
        scaler = %cfg.artifacts.paths().scaler.display(),
        "loading model artifacts"
    );
    let app_state = AppState::new(cfg.clone()).await?;

    #[allow(unused_mut)]
    let mut app: Router = api::router(app_state, &cfg);

    #[cfg(feature = "metrics")]
    {
        app = api::with_metrics(app);
    }

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0; the service is reachable from the network");
    }

    info!(%addr, timezone = %cfg.server.timezone, "starting PreCog Matrix");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
