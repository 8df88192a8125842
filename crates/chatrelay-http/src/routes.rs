//! HTTP route handlers for the chat API.
//!
//! `POST /api/chat` submits a message, `POST /api/reset` clears a session.
//! Every failure is answered with `{ "error": "..." }`: 400 when the request
//! lacks a message, 500 for everything else.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chatrelay_core::{ChatError, ChatResponse, ResetResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::SharedState;

/// Request body for `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Missing and `null` are treated like an empty message.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Request body for `POST /api/reset`.
#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Error body shared by all routes.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request, rendered as a status code plus [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        log::warn!("Rejected request body: {}", rejection.body_text());
        Self::internal(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Handler for POST /api/chat
pub async fn chat_handler(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state
        .chat
        .submit(request.session_id, request.message.unwrap_or_default())
        .await?;
    Ok(Json(response))
}

/// Handler for POST /api/reset
pub async fn reset_handler(
    State(state): State<Arc<SharedState>>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<Json<ResetResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(state.chat.reset(request.session_id)))
}

// ============================================================================
// TESTS
// ============================================================================
