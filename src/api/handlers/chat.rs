use crate::{
    AppState,
    stream::{DATA_STREAM_HEADER, DATA_STREAM_VERSION, Frame},
    types::{AppError, ChatRequest, MessageRole, Result},
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::sync::Arc;

/// Research a chat request and stream the answer
///
/// The response body is line-framed (`0:` token, `8:` step annotation,
/// `d:` finish, `3:` error) and always ends with exactly one `d:` or `3:` line.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Data stream of step annotations and answer tokens", body = String, content_type = "text/plain"),
        (status = 400, description = "No user message in request")
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response> {
    let messages = payload.into_conversation();
    if !messages.iter().any(|m| m.role == MessageRole::User) {
        return Err(AppError::InvalidInput(
            "Request must contain at least one user message".to_string(),
        ));
    }

    tracing::debug!(messages = messages.len(), "Chat request accepted");

    let frames = Arc::clone(&state.graph).stream(messages);
    let body = Body::from_stream(frames.map(|frame: Frame| frame.encode().map(Bytes::from)));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::HeaderName::from_static(DATA_STREAM_HEADER),
                DATA_STREAM_VERSION,
            ),
        ],
        body,
    )
        .into_response())
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Server is up", body = String)),
    tag = "health"
)]
pub async fn health() -> &'static str {
    "OK"
}
