//! # Whisper ASR Webservice - Main Application Entry Point
//!
//! HTTP microservice wrapping OpenAI Whisper speech-to-text models: clients
//! upload an audio payload over REST and receive a transcript with optional
//! timestamp metadata.
//!
//! ## Application Architecture:
//! - **config**: layered configuration (TOML file, env vars, CLI flags)
//! - **state**: shared application state (config, engine, metrics)
//! - **asr**: model lifecycle and Candle-based Whisper inference
//! - **audio**: payload decoding (ffmpeg transcode or in-process WAV)
//! - **handlers**: REST endpoints (/asr, /detect-language, docs)
//! - **health** / **metrics**: observability endpoints
//! - **middleware**: request logging and metrics collection
//! - **error**: error taxonomy and HTTP error responses

mod asr;
mod audio;
mod config;
mod error;
mod handlers;
mod health;
mod metrics;
mod middleware;
mod output;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::asr::device::{select_device, DevicePreference};
use crate::asr::engine::AsrEngine;
use crate::config::AppConfig;
use crate::metrics::HttpMetrics;
use crate::state::AppState;

/// Global shutdown flag flipped by the signal handlers.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Command-line interface.
///
/// Flags take priority over environment variables and config.toml; the
/// container entrypoint is `whisper-asr-webservice --host 0.0.0.0 --port 9000`.
#[derive(Debug, Parser)]
#[command(
    name = "whisper-asr-webservice",
    version,
    about = "Whisper speech-to-text web service"
)]
struct Cli {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Skip loading the model at startup (it loads on first request instead)
    #[arg(long)]
    no_preload: bool,
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let cli = Cli::parse();
    let config = AppConfig::load(cli.host.clone(), cli.port)?;
    config.validate()?;

    info!(
        "Starting whisper-asr-webservice v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "Model: {} on device '{}', listening on {}:{}",
        config.model.name, config.model.device, config.server.host, config.server.port
    );

    let device = select_device(
        config
            .model
            .device
            .parse::<DevicePreference>()
            .unwrap_or_default(),
    );
    let engine = Arc::new(AsrEngine::new(
        config.model_kind()?,
        device,
        config.audio.sample_rate,
        config.limits.max_concurrent_inferences,
        config.model.idle_timeout_secs,
    ));
    engine.start_idle_watcher();

    if !cli.no_preload {
        // A failed preload is not fatal: the engine retries on the first
        // request, which also covers starting up without network access.
        if let Err(e) = engine.ensure_loaded().await {
            warn!("Model preload failed, will retry on first request: {}", e);
        }
    }

    let http_metrics = HttpMetrics::new()?;
    let app_state = AppState::new(config.clone(), engine, http_metrics);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .route("/", web::get().to(handlers::docs_redirect))
            .route("/docs", web::get().to(handlers::swagger_ui))
            .route("/openapi.json", web::get().to(handlers::openapi_spec))
            .route("/asr", web::post().to(handlers::transcribe_audio))
            .route("/detect-language", web::post().to(handlers::detect_language))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(metrics::metrics_handler))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Initialize structured logging.
///
/// `RUST_LOG` controls verbosity; the default keeps this crate at info and
/// quiets the frameworks.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whisper_asr_webservice=info,actix_web=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Install SIGTERM/SIGINT handlers that flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

/// Poll the shutdown flag without busy-waiting.
async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
