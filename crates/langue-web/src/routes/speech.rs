//! Speech route - text in, MP3 out.

use axum::{Json, extract::State, response::Response};
use langue_core::FeatureHandler;
use langue_core::features::{AudioClip, SpeechRequest};
use std::sync::Arc;

use super::binary_response;
use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

/// Read a text aloud.
pub async fn synthesize_speech(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SpeechRequest>,
) -> RouteResult<Response> {
    let clip = state
        .assistant
        .text_to_audio()
        .handle(request)
        .await
        .or_status()?;
    binary_response(AudioClip::MIME_TYPE, clip.audio, None)
}
