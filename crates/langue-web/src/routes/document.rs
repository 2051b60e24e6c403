//! Document routes - PDF translation and PDF reading.
//!
//! Rendered documents are returned in the response and never stored.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use langue_core::FeatureHandler;
use langue_core::features::{AudioClip, PdfAudioRequest, PdfTranslateRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{UploadForm, binary_response};
use crate::helpers::{CoreResultExt, RouteResult};
use crate::state::AppState;

/// Download name of translated documents
pub const TRANSLATED_FILE_NAME: &str = "pdf_traduit.pdf";

#[derive(Deserialize, Default)]
pub struct TranslatePdfQuery {
    /// `pdf` for the document itself, `json` (default) for text plus base64
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Serialize)]
pub struct TranslatedPdfResponse {
    pub text: String,
    /// Rendered PDF, base64 encoded
    pub pdf_base64: String,
    pub file_name: &'static str,
    pub source_chars: usize,
    pub chunks: usize,
    pub pages: usize,
}

/// Translate an uploaded PDF (`file`, `source_lang`, `target_lang`).
pub async fn translate_pdf(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TranslatePdfQuery>,
    multipart: Multipart,
) -> RouteResult<Response> {
    let as_pdf = match query.format.as_deref() {
        None | Some("json") => false,
        Some("pdf") => true,
        Some(other) => {
            return Err((StatusCode::BAD_REQUEST, format!("unknown format '{other}'")));
        }
    };

    let mut form = UploadForm::read(multipart).await?;
    let document = form.take_file("file")?.into_document()?;
    let source_lang = form
        .lang("source_lang")
        .unwrap_or_else(|| state.config.source_lang.clone());
    let target_lang = form
        .lang("target_lang")
        .unwrap_or_else(|| state.config.target_lang.clone());

    info!(
        "PDF upload: {} bytes, {} -> {}",
        document.len(),
        source_lang,
        target_lang
    );

    let translated = state
        .assistant
        .pdf_translate()
        .handle(PdfTranslateRequest {
            document,
            source_lang,
            target_lang,
        })
        .await
        .or_status()?;

    if as_pdf {
        return binary_response(
            "application/pdf",
            translated.document.into_bytes(),
            Some(TRANSLATED_FILE_NAME),
        );
    }

    let pages = translated.document.page_count();
    Ok(Json(TranslatedPdfResponse {
        pdf_base64: STANDARD.encode(translated.document.bytes()),
        text: translated.text,
        file_name: TRANSLATED_FILE_NAME,
        source_chars: translated.source_len,
        chunks: translated.chunk_count,
        pages,
    })
    .into_response())
}

/// Read an uploaded PDF aloud (`file`, `lang`).
pub async fn pdf_to_audio(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<Response> {
    let mut form = UploadForm::read(multipart).await?;
    let document = form.take_file("file")?.into_document()?;
    let lang = form
        .lang("lang")
        .unwrap_or_else(|| state.config.source_lang.clone());

    let clip = state
        .assistant
        .pdf_to_audio()
        .handle(PdfAudioRequest { document, lang })
        .await
        .or_status()?;
    binary_response(AudioClip::MIME_TYPE, clip.audio, None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::{Part, body_bytes, body_json, post_multipart};
    use super::*;
    use crate::state::tests::{test_state, test_state_with_pages};
    use axum::http::header;

    const PDF: &[u8] = b"%PDF-1.4 uploaded";

    fn pdf_file(bytes: &[u8]) -> Part<'_> {
        Part::File {
            name: "file",
            file_name: "rapport.pdf",
            content_type: "application/pdf",
            bytes,
        }
    }

    #[tokio::test]
    async fn test_translate_pdf_json() {
        let app = crate::app(test_state());
        let response = post_multipart(
            app,
            "/api/pdf/translate",
            &[
                pdf_file(PDF),
                Part::Text("source_lang", "fr"),
                Part::Text("target_lang", "en"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["text"], "BONJOUR LE MONDE\n\n");
        assert_eq!(json["file_name"], TRANSLATED_FILE_NAME);
        assert_eq!(json["chunks"], 1);
        assert_eq!(json["pages"], 1);
        let pdf = STANDARD.decode(json["pdf_base64"].as_str().unwrap()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_translate_pdf_attachment() {
        let app = crate::app(test_state());
        let response =
            post_multipart(app, "/api/pdf/translate?format=pdf", &[pdf_file(PDF)]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("filename=\"pdf_traduit.pdf\""));
        assert!(body_bytes(response).await.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_oversized_document_is_rejected() {
        let long = "x".repeat(101);
        let app = crate::app(test_state_with_pages(&[long.as_str()]));
        let response = post_multipart(app, "/api/pdf/translate", &[pdf_file(PDF)]).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let message = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(message.contains("101"));
    }

    #[tokio::test]
    async fn test_non_pdf_upload_is_rejected() {
        let app = crate::app(test_state());
        let response =
            post_multipart(app, "/api/pdf/translate", &[pdf_file(b"GIF89a")]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(message.contains("not a PDF"));
    }

    #[tokio::test]
    async fn test_extensionless_upload_uses_content_type() {
        let app = crate::app(test_state());
        let upload = Part::File {
            name: "file",
            file_name: "rapport",
            content_type: "application/pdf",
            bytes: PDF,
        };
        let response = post_multipart(app, "/api/pdf/translate", &[upload]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["chunks"], 1);
    }

    #[tokio::test]
    async fn test_unsupported_upload_type_is_rejected() {
        let app = crate::app(test_state());
        let upload = Part::File {
            name: "file",
            file_name: "photo.png",
            content_type: "image/png",
            bytes: PDF,
        };
        let response = post_multipart(app, "/api/pdf/translate", &[upload]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let message = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(message.contains("image/png"), "got {message}");
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let app = crate::app(test_state());
        let response =
            post_multipart(app, "/api/pdf/translate?format=docx", &[pdf_file(PDF)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pdf_to_audio() {
        let app = crate::app(test_state_with_pages(&["un", "deux"]));
        let response = post_multipart(
            app,
            "/api/pdf/audio",
            &[pdf_file(PDF), Part::Text("lang", "fr")],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(body_bytes(response).await.len(), "undeux".len());
    }
}
