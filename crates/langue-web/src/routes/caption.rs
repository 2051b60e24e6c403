//! Caption route - image upload in, description out.

use axum::{Json, extract::State};
use axum_extra::extract::Multipart;
use langue_core::FeatureHandler;
use langue_core::features::{CaptionRequest, CaptionResponse};
use std::sync::Arc;

use super::UploadForm;
use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

/// Describe an uploaded image (`image` field), translated into
/// `target_lang` when given.
pub async fn caption_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<Json<CaptionResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let image = form.take_file("image")?;

    let response = state
        .assistant
        .image_to_text()
        .handle(CaptionRequest {
            image: image.bytes,
            target_lang: form.lang("target_lang"),
        })
        .await
        .or_status()?;
    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{Part, body_json, post_multipart};
    use crate::state::tests::test_state;
    use axum::http::StatusCode;

    fn image(bytes: &[u8]) -> Part<'_> {
        Part::File {
            name: "image",
            file_name: "cat.png",
            content_type: "image/png",
            bytes,
        }
    }

    #[tokio::test]
    async fn test_caption_with_translation() {
        let app = crate::app(test_state());
        let response = post_multipart(
            app,
            "/api/caption",
            &[image(b"png bytes"), Part::Text("target_lang", "fr")],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["caption"], "a cat on a mat");
        assert_eq!(json["translation"], "A CAT ON A MAT");
    }

    #[tokio::test]
    async fn test_caption_without_target() {
        let app = crate::app(test_state());
        let response = post_multipart(
            app,
            "/api/caption",
            &[image(b"png bytes"), Part::Text("target_lang", "")],
        )
        .await;
        let json = body_json(response).await;
        assert!(json.get("translation").is_none());
    }

    #[tokio::test]
    async fn test_caption_requires_image() {
        let app = crate::app(test_state());
        let response =
            post_multipart(app, "/api/caption", &[Part::Text("target_lang", "fr")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
