//! Translation route - free text in, translated text out.

use axum::{Json, extract::State};
use langue_core::FeatureHandler;
use langue_core::features::{TranslateRequest, TranslateResponse};
use std::sync::Arc;
use tracing::debug;

use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

/// Translate a text in a single call.
pub async fn translate_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TranslateRequest>,
) -> RouteResult<Json<TranslateResponse>> {
    debug!(
        "translate_text: {} chars -> {}",
        request.text.chars().count(),
        request.target_lang
    );
    let response = state.assistant.translate().handle(request).await.or_status()?;
    Ok(Json(response))
}
