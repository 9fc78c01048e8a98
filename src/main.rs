//! ZoneGuard - zone-aware helmet compliance monitor
//!
//! Main entry point for the monitoring service.

use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zoneguard::{
    frame_source::{FileFrameSource, FrameSource, HttpSnapshotSource},
    realtime_hub::RealtimeHub,
    session_controller::SessionController,
    state::{AppConfig, AppState},
    vision_client::VisionClient,
    web_api,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zoneguard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ZoneGuard v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        vision_api_url = %config.vision_api_url,
        vision_model = %config.vision_model,
        snapshot_url = %config.snapshot_url,
        snapshot_file = ?config.snapshot_file,
        tick_interval_secs = config.tick_interval.as_secs(),
        "Configuration loaded"
    );

    let api_key = config.require_vision_api_key()?;

    let vision = Arc::new(VisionClient::with_timeout(
        config.vision_api_url.clone(),
        config.vision_model.clone(),
        api_key,
        config.analysis_timeout,
    )?);
    tracing::info!(
        model = %vision.model(),
        timeout_secs = vision.timeout().as_secs(),
        "VisionClient initialized"
    );

    let frame_source: Arc<dyn FrameSource> = match config.snapshot_file {
        Some(ref path) => Arc::new(FileFrameSource::new(path.clone())),
        None => Arc::new(HttpSnapshotSource::new(
            config.snapshot_url.clone(),
            config.capture_timeout,
        )?),
    };
    tracing::info!(source = %frame_source.describe(), "FrameSource initialized");

    let realtime = Arc::new(RealtimeHub::new());

    let session = Arc::new(SessionController::new(
        frame_source,
        vision.clone(),
        realtime.clone(),
        config.tick_interval,
    ));
    tracing::info!("SessionController initialized (idle until /api/session/start)");

    let state = AppState {
        config,
        session: session.clone(),
        vision,
        realtime,
        started_at: Instant::now(),
    };

    let app = web_api::create_router(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await?;

    session.stop().await?;
    Ok(())
}
