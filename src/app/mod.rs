use crate::api::{ApiServer, AppState};
use crate::config::Config;
use crate::email::ResendMailer;
use crate::summarizer::OpenAIProvider;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub async fn run_service(config_path: Option<&Path>, port: Option<u16>) -> Result<()> {
    info!("Starting meeting-summarizer service");

    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = build_state(&config)?;
    let api_server = ApiServer::new(&config, state);

    info!("meeting-summarizer is ready!");
    info!(
        "Test manually: curl -X POST http://127.0.0.1:{}/api/summarize -H 'Content-Type: application/json' -d '{{\"transcript\":\"...\"}}'",
        config.server.port
    );

    api_server.start().await
}

/// Builds the provider clients once from configuration.
pub fn build_state(config: &Config) -> Result<AppState> {
    let timeout = config.upstream.timeout();

    let summarizer = OpenAIProvider::new(
        config.llm.api_key.clone(),
        Some(config.llm.api_endpoint.clone()),
        config.llm.model.clone(),
        timeout,
    )?;
    let mailer = ResendMailer::new(&config.email, timeout)?;

    let state = AppState::new(Arc::new(summarizer), Arc::new(mailer));

    info!(
        "Using {} for summaries (model: {}, available: {})",
        state.summarizer.name(),
        state.summarizer.model(),
        state.summarizer.is_available()
    );
    if state.capabilities.email {
        info!("Email delivery enabled via {}", state.mailer.name());
    } else {
        info!("Email delivery disabled");
    }

    Ok(state)
}
