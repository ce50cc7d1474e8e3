//! REST API server for the meeting summarizer.
//!
//! Provides HTTP endpoints for:
//! - Transcript summarization (POST /api/summarize)
//! - Summary delivery by email (POST /api/send-email)
//! - Health checks (GET /health)
//!
//! Every `/api` route sits behind a fixed-window rate limiter.

pub mod error;
pub mod rate_limit;
pub mod routes;

use crate::config::{Config, ServerConfig};
use crate::email::Mailer;
use crate::summarizer::SummaryProvider;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

pub use rate_limit::RateLimiter;

/// Features whose availability is fixed at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub email: bool,
}

/// Provider clients shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub summarizer: Arc<dyn SummaryProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub capabilities: Capabilities,
}

impl AppState {
    pub fn new(summarizer: Arc<dyn SummaryProvider>, mailer: Arc<dyn Mailer>) -> Self {
        let capabilities = Capabilities {
            email: mailer.is_available(),
        };

        Self {
            summarizer,
            mailer,
            capabilities,
        }
    }
}

/// Builds the full application router.
pub fn router(state: AppState, limiter: RateLimiter, server: &ServerConfig) -> Router {
    let api = Router::new()
        .merge(routes::summarize::router())
        .merge(routes::email::router())
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state);

    let app = match &server.static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(DefaultBodyLimit::max(server.body_limit_bytes)),
    )
}

pub struct ApiServer {
    server: ServerConfig,
    limiter: RateLimiter,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: &Config, state: AppState) -> Self {
        Self {
            server: config.server.clone(),
            limiter: RateLimiter::from_config(&config.rate_limit, &config.server),
            state,
        }
    }

    pub fn router(&self) -> Router {
        router(self.state.clone(), self.limiter.clone(), &self.server)
    }

    pub async fn start(self) -> Result<()> {
        let app = self.router();
        let addr = format!("{}:{}", self.server.host, self.server.port);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET  /health          - Service info");
        info!("  POST /api/summarize   - Summarize a transcript");
        info!("  POST /api/send-email  - Email a summary");
        if let Some(dir) = &self.server.static_dir {
            info!("  GET  /*               - Static files from {:?}", dir);
        }

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("API server stopped");
        Ok(())
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "meeting-summarizer",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "email_enabled": state.capabilities.email,
    }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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
