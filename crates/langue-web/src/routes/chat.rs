//! Chat routes - session lifecycle and messages.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use langue_core::features::{ChatReply, ChatRequest, SessionId};
use langue_core::{ChatMessage, FeatureHandler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ChatSession {
    pub session: SessionId,
    /// Turns so far, system prompt excluded
    pub messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
pub struct ChatMessageBody {
    pub message: String,
}

/// Open a new conversation.
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ChatSession>) {
    let session = state.assistant.chat().sessions().create().await;
    (
        StatusCode::CREATED,
        Json(ChatSession {
            session,
            messages: Vec::new(),
        }),
    )
}

pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Path(session): Path<SessionId>,
) -> RouteResult<Json<ChatSession>> {
    let conversation = state
        .assistant
        .chat()
        .sessions()
        .history(session)
        .await
        .or_status()?;
    Ok(Json(ChatSession {
        session,
        messages: conversation.turns().to_vec(),
    }))
}

/// Send a message and get the assistant's reply.
pub async fn send_chat_message(
    State(state): State<Arc<AppState>>,
    Path(session): Path<SessionId>,
    Json(body): Json<ChatMessageBody>,
) -> RouteResult<Json<ChatReply>> {
    let reply = state
        .assistant
        .chat()
        .handle(ChatRequest {
            session: Some(session),
            message: body.message,
        })
        .await
        .or_status()?;
    Ok(Json(reply))
}

pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    Path(session): Path<SessionId>,
) -> RouteResult<StatusCode> {
    state
        .assistant
        .chat()
        .sessions()
        .remove(session)
        .await
        .or_status()?;
    Ok(StatusCode::NO_CONTENT)
}
