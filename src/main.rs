use std::net::SocketAddr;

use axum::http::{header, HeaderValue};
use drowsiness_monitor::config::Config;
use drowsiness_monitor::logging::{init_tracing, LogConfig};
use drowsiness_monitor::routes::build_router;
use drowsiness_monitor::state::AppState;
use drowsiness_monitor::vision::backend_from_config;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig::from(&config));
    tracing::info!("Starting drowsiness-monitor");

    let backend = match backend_from_config(&config) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(error = %e, backend = %config.vision.backend, "Invalid vision backend");
            std::process::exit(1);
        }
    };
    tracing::info!(
        backend = backend.name(),
        camera = config.camera.index,
        ear_threshold = config.detection.ear_threshold,
        ear_consec_frames = config.detection.ear_consec_frames,
        yawn_threshold = config.detection.yawn_threshold,
        "Vision backend ready"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(&config, backend, shutdown_tx.clone());

    let cors_layer = match build_cors_layer(&config) {
        Ok(layer) => layer,
        Err(e) => {
            tracing::error!(error = %e, origin = %config.cors_origin, "Invalid CORS_ORIGIN");
            std::process::exit(1);
        }
    };

    let app = build_router(state.clone())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Listening");

    let server_future = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));

    if let Err(e) = server_future.await {
        tracing::error!(error = %e, "HTTP server crashed");
    }

    // 释放摄像头
    if state.detection().stop().await {
        tracing::info!("Detection loop stopped on shutdown");
    }
    tracing::info!("Shutdown complete");
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let origin = config.cors_origin.trim();
    if origin == "*" {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_credentials(false)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any));
    }

    let origin = origin.parse::<HeaderValue>()?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_methods(Any))
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    // 先通知 MJPEG / SSE 长连接结束，否则优雅关闭会一直等待
    let _ = shutdown_tx.send(());
}
