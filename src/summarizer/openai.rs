use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error, info};

use super::{ChatMessage, Completion, SummaryProvider, TokenUsage, MAX_TOKENS, TEMPERATURE};
use crate::config::DEFAULT_LLM_ENDPOINT;
use crate::error::UpstreamError;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl ChatCompletionResponse {
    fn into_completion(self) -> Completion {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        let usage = self
            .usage
            .map(|usage| TokenUsage {
                prompt: usage.prompt_tokens.unwrap_or(0),
                completion: usage.completion_tokens.unwrap_or(0),
            })
            .unwrap_or_default();

        Completion { content, usage }
    }
}

/// OpenAI-compatible chat-completion client.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(
        api_key: Option<String>,
        endpoint: Option<String>,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OpenAI")?;
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string());

        info!(
            "Initialized OpenAI provider with endpoint: {} (model: {})",
            endpoint, model
        );

        Ok(Self {
            client,
            api_key,
            endpoint,
            model,
        })
    }
}

impl SummaryProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "OpenAI API"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> Pin<Box<dyn Future<Output = Result<Completion, UpstreamError>> + Send + 'a>> {
        Box::pin(async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or(UpstreamError::NotConfigured("OpenAI API key"))?;

            let body = ChatCompletionRequest {
                model: &self.model,
                messages,
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            };

            debug!(
                "Sending chat completion request to OpenAI with model {}",
                self.model
            );

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
                    "OpenAI API request failed with status {}: {}",
                    status, response_text
                );
                return Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body: response_text,
                });
            }

            let completion: ChatCompletionResponse = serde_json::from_str(&response_text)?;
            Ok(completion.into_completion())
        })
    }
}
