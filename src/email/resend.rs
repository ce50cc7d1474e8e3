use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{render_html, Mailer, SUBJECT};
use crate::config::{EmailConfig, DEFAULT_EMAIL_ENDPOINT};
use crate::error::UpstreamError;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Accepts both the bare REST shape (`{id}`) and the wrapped shape
/// (`{data: {id}, error}`).
#[derive(Debug, Default, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
    data: Option<SentEmail>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SentEmail {
    id: Option<String>,
}

impl SendEmailResponse {
    fn message_id(self) -> Option<String> {
        self.id.or_else(|| self.data.and_then(|data| data.id))
    }
}

fn describe_provider_error(error: &serde_json::Value) -> String {
    error
        .get("message")
        .and_then(|message| message.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Resend-compatible email client.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from: Option<String>,
    endpoint: String,
    escape_html: bool,
}

impl ResendMailer {
    pub fn new(config: &EmailConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for Resend")?;
        let endpoint = if config.api_endpoint.is_empty() {
            DEFAULT_EMAIL_ENDPOINT.to_string()
        } else {
            config.api_endpoint.clone()
        };

        info!("Initialized Resend mailer with endpoint: {}", endpoint);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            endpoint,
            escape_html: config.escape_html,
        })
    }
}

impl Mailer for ResendMailer {
    fn name(&self) -> &'static str {
        "Resend API"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some() && self.from.is_some()
    }

    fn send<'a>(
        &'a self,
        to: &'a str,
        summary: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, UpstreamError>> + Send + 'a>> {
        Box::pin(async move {
            let (api_key, from) = match (self.api_key.as_deref(), self.from.as_deref()) {
                (Some(api_key), Some(from)) => (api_key, from),
                _ => return Err(UpstreamError::NotConfigured("Email service")),
            };

            let html = render_html(summary, self.escape_html);
            let body = SendEmailRequest {
                from,
                to: [to],
                subject: SUBJECT,
                html: &html,
            };

            debug!("Sending summary email via Resend ({} chars)", summary.len());

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let response_text = response.text().await?;

            if !status.is_success() {
                error!(
                    "Resend API request failed with status {}: {}",
                    status, response_text
                );
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body: response_text,
                });
            }

            let sent: SendEmailResponse = if response_text.trim().is_empty() {
                SendEmailResponse::default()
            } else {
                serde_json::from_str(&response_text)?
            };

            if let Some(provider_error) = sent.error.as_ref().filter(|e| !e.is_null()) {
                let message = describe_provider_error(provider_error);
                error!("Resend reported an error: {}", message);
                return Err(UpstreamError::Provider(message));
            }

            let id = sent.message_id();
            info!("Summary email accepted by Resend (id: {:?})", id);
            Ok(id)
        })
    }
}
