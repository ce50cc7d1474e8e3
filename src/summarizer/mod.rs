//! Transcript summarization through a chat-completion provider.

use crate::error::UpstreamError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info};

pub mod openai;
pub mod prompt;

pub use openai::OpenAIProvider;
pub use prompt::build_messages;

/// Sampling temperature sent with every summarization request.
pub const TEMPERATURE: f32 = 0.2;
/// Upper bound on generated tokens per summary.
pub const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-reported token counts. Missing counters are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
}

/// Content and usage extracted from a single completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Response body of `POST /api/summarize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub model: String,
    pub tokens: TokenUsage,
}

pub trait SummaryProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Configured model identifier reported back to callers.
    fn model(&self) -> &str;

    fn is_available(&self) -> bool;

    fn complete<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> Pin<Box<dyn Future<Output = Result<Completion, UpstreamError>> + Send + 'a>>;
}

/// Builds the prompt and runs one completion against `provider`.
pub async fn summarize(
    provider: &dyn SummaryProvider,
    transcript: &str,
    extra: Option<&str>,
) -> Result<SummaryResult, UpstreamError> {
    let messages = build_messages(transcript, extra);

    info!(
        "Summarizing transcript ({} chars) with {}",
        transcript.len(),
        provider.name()
    );

    let completion = provider.complete(&messages).await?;

    debug!(
        "Summary complete: {} chars, {} prompt / {} completion tokens",
        completion.content.len(),
        completion.usage.prompt,
        completion.usage.completion
    );

    Ok(SummaryResult {
        summary: completion.content,
        model: provider.model().to_string(),
        tokens: completion.usage,
    })
}
