//! Page routes - dashboard and feature listing.

use axum::{Json, extract::State};
use langue_core::Feature;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use crate::templates::IndexTemplate;

/// Landing page with one form per feature.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    IndexTemplate::new(state.config.document.size_limit)
}

#[derive(Serialize)]
pub struct FeatureInfo {
    pub id: Feature,
    pub title: &'static str,
    pub description: &'static str,
}

/// Features the assistant offers, in display order.
pub async fn list_features() -> Json<Vec<FeatureInfo>> {
    Json(
        Feature::ALL
            .into_iter()
            .map(|feature| FeatureInfo {
                id: feature,
                title: feature.title(),
                description: feature.description(),
            })
            .collect(),
    )
}
