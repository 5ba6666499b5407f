use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use exam_practice_engine::clock::SystemClock;
use exam_practice_engine::config::Config;
use exam_practice_engine::corpus::{CorpusCache, JsonFileSource};
use exam_practice_engine::logging::init_tracing;
use exam_practice_engine::routes::build_router;
use exam_practice_engine::srs::{EngineSettings, ExamEngine};
use exam_practice_engine::state::AppState;
use exam_practice_engine::store::Store;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&config.log_config());
    tracing::info!("Starting exam-practice-engine");

    let store = match Store::open(&config.sled_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!(error = %e, path = %config.sled_path, "Failed to open sled database");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = store.run_migrations() {
        tracing::error!(error = %e, "Failed to run migrations");
        return ExitCode::FAILURE;
    }

    let clock = Arc::new(SystemClock);
    let corpus = Arc::new(CorpusCache::new(
        Arc::new(JsonFileSource::new(&config.questions_path)),
        clock.clone(),
    ));
    let engine = Arc::new(ExamEngine::new(
        store.clone(),
        corpus,
        clock,
        EngineSettings::from(&config.session),
    ));

    // Warm the corpus; a missing file only degrades readiness.
    if let Err(e) = engine.corpus() {
        tracing::warn!(error = %e, path = %config.questions_path, "Question corpus not loaded at startup");
    }

    let cors_layer = match build_cors_layer(&config) {
        Ok(layer) => layer,
        Err(message) => {
            tracing::error!(cors_origin = %config.cors_origin, "{message}");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::new(engine, store.clone());
    let app = build_router(state)
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
            HeaderValue::from_static("no-referrer"),
        ));

    let addr = SocketAddr::new(config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind TCP listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Listening");

    let exit = match axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "HTTP server crashed");
            ExitCode::FAILURE
        }
    };

    tracing::info!("Flushing store before exit");
    if let Err(e) = store.flush() {
        tracing::error!(error = %e, "Failed to flush store before exit");
    }
    tracing::info!("Shutdown complete");
    exit
}

fn build_cors_layer(config: &Config) -> Result<CorsLayer, String> {
    if config.cors_origin.trim() == "*" {
        // Wildcard origins cannot be combined with credentials.
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_credentials(false)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .allow_methods(Any));
    }

    config
        .cors_origin
        .parse::<HeaderValue>()
        .map(|origin| {
            CorsLayer::new()
                .allow_origin(origin)
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_methods(Any)
        })
        .map_err(|e| format!("Invalid CORS_ORIGIN: {e}"))
}

async fn shutdown_signal() {
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
                tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
}
