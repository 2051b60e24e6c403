//! HTTP route handlers for the language assistant.
//!
//! Text endpoints take and return JSON; uploads come in as multipart forms;
//! audio and PDF results are returned as binary bodies.

mod caption;
mod chat;
mod document;
mod pages;
mod speech;
mod translate;

pub use caption::caption_image;
pub use chat::{chat_history, create_chat, delete_chat, send_chat_message};
pub use document::{pdf_to_audio, translate_pdf};
pub use pages::{index, list_features};
pub use speech::synthesize_speech;
pub use translate::translate_text;

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use axum_extra::extract::Multipart;
use langue_core::pdf::DocumentFormat;
use langue_core::{Lang, SourceDocument};
use std::collections::HashMap;

use crate::helpers::{CoreResultExt, OptionExt, ResultExt, RouteResult};

/// An uploaded file
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Interpret the upload as a document, by file name first, then MIME type.
    pub fn into_document(self) -> RouteResult<SourceDocument> {
        let format = match (&self.file_name, &self.content_type) {
            (Some(name), Some(mime)) => DocumentFormat::from_file_name(name)
                .or_else(|e| DocumentFormat::from_mime(mime).map_err(|_| e)),
            (Some(name), None) => DocumentFormat::from_file_name(name),
            (None, Some(mime)) => DocumentFormat::from_mime(mime),
            (None, None) => Ok(DocumentFormat::Pdf),
        };
        Ok(SourceDocument::new(format.or_status()?, self.bytes))
    }
}

/// A multipart form split into its file and text fields
#[derive(Default)]
pub struct UploadForm {
    files: HashMap<String, Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read every field; parts with a file name are files, the rest text.
    pub async fn read(mut multipart: Multipart) -> RouteResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.or_bad_request()? {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(ToString::to_string);
            if file_name.is_some() {
                let content_type = field.content_type().map(ToString::to_string);
                let bytes = field.bytes().await.or_bad_request()?.to_vec();
                form.files.insert(
                    name,
                    Upload {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else {
                let value = field.text().await.or_bad_request()?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> RouteResult<Upload> {
        self.files.remove(name).or_missing(name)
    }

    /// Non-blank text field as a language code
    pub fn lang(&self, name: &str) -> Option<Lang> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(Lang::new)
    }
}

/// Binary response with an optional download name
pub fn binary_response(
    content_type: &str,
    bytes: Vec<u8>,
    attachment: Option<&str>,
) -> RouteResult<Response> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(name) = attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{name}\"; filename*=UTF-8''{}",
                urlencoding::encode(name)
            ),
        );
    }
    builder.body(Body::from(bytes)).or_internal_error()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub mod tests {
    //! Request helpers shared by the route tests.

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header},
        response::Response,
    };
    use tower::ServiceExt;

    pub const BOUNDARY: &str = "XLANGUEBOUNDARY";

    pub enum Part<'a> {
        Text(&'a str, &'a str),
        File {
            name: &'a str,
            file_name: &'a str,
            content_type: &'a str,
            bytes: &'a [u8],
        },
    }

    pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    pub async fn send(app: Router, request: Request<Body>) -> Response {
        app.oneshot(request).await.unwrap()
    }

    pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap();
        send(app, request).await
    }

    pub async fn post_multipart(app: Router, uri: &str, parts: &[Part<'_>]) -> Response {
        let request = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        send(app, request).await
    }

    pub async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }
}
