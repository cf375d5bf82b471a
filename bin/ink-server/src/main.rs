//! Inkwell API Server
//!
//! Serves the journaling API: entries, intentions, settings, assistant
//! (chat, analysis, transcription), account deletion and invite signup.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `INKWELL_CONFIG` | - | Path to a TOML config file |
//! | `INKWELL_HTTP_PORT` | `8080` | HTTP port |
//! | `INKWELL_HTTP_HOST` | `0.0.0.0` | Bind address |
//! | `INKWELL_CORS_ORIGINS` | `http://localhost:5173` | Comma-separated allowed origins |
//! | `INKWELL_BACKEND_URL` | - | Auth/database provider base URL |
//! | `INKWELL_BACKEND_SERVICE_KEY` | - | Provider service-role key |
//! | `INKWELL_LLM_API_KEY` | - | Language model API key |
//! | `INKWELL_LLM_MODEL` | `claude-3-5-sonnet-latest` | Model id |
//! | `LOG_FORMAT` | `text` | `json` for structured logs |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use ink_api::{build_router, AnthropicClient, AppState, SupabaseClient};
use ink_config::{AppConfig, ConfigLoader, HttpConfig};

#[tokio::main]
async fn main() -> Result<()> {
    ink_common::logging::init_logging("ink-server");

    info!("Starting Inkwell API Server");

    let config: AppConfig = ConfigLoader::new().load().context("loading configuration")?;
    config.validate().context("invalid configuration")?;

    let backend = Arc::new(SupabaseClient::new(&config.backend).context("building backend client")?);
    let llm = Arc::new(AnthropicClient::new(&config.llm).context("building language model client")?);
    info!(backend = %config.backend.url, model = %config.llm.model, "Collaborators configured");

    let state = AppState::new(backend.clone(), backend, llm, &config);
    let app = build_router(state).layer(cors_layer(&config.http));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Inkwell API Server shutdown complete");
    Ok(())
}

fn cors_layer(http: &HttpConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = http
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
