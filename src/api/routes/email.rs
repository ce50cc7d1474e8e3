//! Summary email endpoint.

use crate::api::error::{ApiError, ApiResult};
use crate::api::AppState;
use crate::email::FALLBACK_MESSAGE_ID;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

const NOT_CONFIGURED: &str = "Email service not configured";

/// Request body for `POST /api/send-email`.
#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
    pub summary: Option<String>,
}

/// Response body for a delivered summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailResult {
    pub ok: bool,
    pub id: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/send-email", post(send_email))
}

/// POST /api/send-email - Email a summary to a recipient.
async fn send_email(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> ApiResult<Json<EmailResult>> {
    let Json(request) = payload?;

    let email = request
        .email
        .as_deref()
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::bad_request("Email is required"))?;
    let summary = request
        .summary
        .as_deref()
        .filter(|summary| !summary.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Summary is required"))?;

    if !state.capabilities.email {
        warn!("Email requested but the email service is not configured");
        return Err(ApiError::internal(NOT_CONFIGURED));
    }

    let id = state.mailer.send(email, summary).await.map_err(|err| {
        if err.is_not_configured() {
            warn!("Email requested but {}", err);
            ApiError::internal(NOT_CONFIGURED)
        } else {
            error!("Failed to send email: {}", err);
            ApiError::internal("Failed to send email")
        }
    })?;

    info!("Summary email sent via {}", state.mailer.name());

    Ok(Json(EmailResult {
        ok: true,
        id: id.unwrap_or_else(|| FALLBACK_MESSAGE_ID.to_string()),
    }))
}
