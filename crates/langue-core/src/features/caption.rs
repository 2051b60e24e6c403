use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageEncoder;
use serde::Serialize;
use tracing::debug;

use super::{Feature, FeatureHandler};
use crate::config::Lang;
use crate::error::{Error, Result};
use crate::llm::{ChatMessage, ChatModel};
use crate::translator::ChunkTranslator;

/// Prompt sent with every image
const CAPTION_PROMPT: &str = "Describe this image.";

/// Produces a text description of an image
#[async_trait]
pub trait ImageCaptioner: Send + Sync {
    async fn describe(&self, image: &[u8]) -> Result<String>;
}

/// Re-encode any supported image format as an RGB PNG data URL
fn png_data_url(image: &[u8]) -> Result<String> {
    let rgb = image::load_from_memory(image)
        .map_err(|e| Error::Image(format!("Failed to decode image: {e}")))?
        .to_rgb8();

    let mut png_data = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png_data)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| Error::Image(format!("Failed to encode PNG: {e}")))?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png_data)))
}

/// Captioner using a vision-capable chat model
pub struct VisionCaptioner {
    model: Arc<dyn ChatModel>,
}

impl VisionCaptioner {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ImageCaptioner for VisionCaptioner {
    async fn describe(&self, image: &[u8]) -> Result<String> {
        let image = image.to_vec();
        let url = tokio::task::spawn_blocking(move || png_data_url(&image))
            .await
            .map_err(|e| Error::Image(format!("encoding task failed: {e}")))??;

        debug!("Captioning image with {}", self.model.model());
        let caption = self
            .model
            .complete(&[ChatMessage::user_with_image(CAPTION_PROMPT, url)])
            .await?;
        Ok(caption.trim().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: Vec<u8>,
    /// Translate the caption into this language
    pub target_lang: Option<Lang>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaptionResponse {
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

pub struct ImageToTextHandler {
    captioner: Arc<dyn ImageCaptioner>,
    translator: Arc<dyn ChunkTranslator>,
}

impl ImageToTextHandler {
    pub fn new(captioner: Arc<dyn ImageCaptioner>, translator: Arc<dyn ChunkTranslator>) -> Self {
        Self {
            captioner,
            translator,
        }
    }
}

#[async_trait]
impl FeatureHandler for ImageToTextHandler {
    type Request = CaptionRequest;
    type Response = CaptionResponse;

    fn feature(&self) -> Feature {
        Feature::ImageToText
    }

    async fn handle(&self, request: CaptionRequest) -> Result<CaptionResponse> {
        if request.image.is_empty() {
            return Err(Error::InvalidArgument("image is empty".to_string()));
        }

        let caption = self.captioner.describe(&request.image).await?;
        let translation = match request.target_lang {
            Some(target) => Some(
                self.translator
                    .translate(&caption, &Lang::new("auto"), &target)
                    .await?,
            ),
            None => None,
        };

        Ok(CaptionResponse {
            caption,
            translation,
        })
    }
}
