//! Transcript summarization endpoint.

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::summarizer::{self, SummaryResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::error;

/// Request body for `POST /api/summarize`.
#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    pub transcript: Option<String>,
    /// Extra instruction appended to the transcript as-is.
    pub prompt: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/summarize", post(summarize))
}

/// POST /api/summarize - Summarize a meeting transcript.
async fn summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult<Json<SummaryResult>> {
    let Json(request) = payload?;

    let transcript = request
        .transcript
        .as_deref()
        .filter(|transcript| !transcript.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Transcript is required"))?;

    let result = summarizer::summarize(
        state.summarizer.as_ref(),
        transcript,
        request.prompt.as_deref(),
    )
    .await
    .map_err(|err| {
        error!("Failed to summarize transcript: {}", err);
        ApiError::internal("Failed to summarize")
    })?;

    Ok(Json(result))
}
