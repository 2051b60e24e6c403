//! The assistant's user-facing features and their dispatch.
//!
//! Each feature is a typed handler; [`Assistant::handle`] routes a tagged
//! [`FeatureRequest`] to the matching one.

mod caption;
mod chat;
mod pdf;
mod speech;
mod translate;

pub use caption::{CaptionRequest, CaptionResponse, ImageCaptioner, ImageToTextHandler, VisionCaptioner};
pub use chat::{ChatHandler, ChatReply, ChatRequest, ChatSessions, Conversation, SessionId};
pub use pdf::{PdfTranslateHandler, PdfTranslateRequest};
pub use speech::{
    AudioClip, OpenAiSpeech, PdfAudioRequest, PdfToAudioHandler, SpeechRequest,
    SpeechSynthesizer, TextToAudioHandler,
};
pub use translate::{TranslateHandler, TranslateRequest, TranslateResponse};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::llm::{ChatModel, OpenAiChat, OpenAiClient};
use crate::pipeline::{DocumentTranslationPipeline, TranslatedDocument};
use crate::translator::{ChunkTranslator, create_translator};

/// Features offered by the assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Translate,
    TextToAudio,
    ImageToText,
    PdfTranslate,
    Chat,
    PdfToAudio,
}

impl Feature {
    pub const ALL: [Self; 6] = [
        Self::Translate,
        Self::TextToAudio,
        Self::ImageToText,
        Self::PdfTranslate,
        Self::Chat,
        Self::PdfToAudio,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::TextToAudio => "text_to_audio",
            Self::ImageToText => "image_to_text",
            Self::PdfTranslate => "pdf_translate",
            Self::Chat => "chat",
            Self::PdfToAudio => "pdf_to_audio",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Translate => "Text translation",
            Self::TextToAudio => "Text to speech",
            Self::ImageToText => "Image description",
            Self::PdfTranslate => "PDF translation",
            Self::Chat => "Chat assistant",
            Self::PdfToAudio => "PDF to speech",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Translate => "Translate a text between supported languages",
            Self::TextToAudio => "Read a text aloud as MP3",
            Self::ImageToText => "Describe an image, optionally in another language",
            Self::PdfTranslate => "Translate a PDF and download the result",
            Self::Chat => "Talk with the assistant",
            Self::PdfToAudio => "Read a PDF aloud as MP3",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One handler per feature, all with the same shape
#[async_trait]
pub trait FeatureHandler: Send + Sync {
    type Request: Send + 'static;
    type Response;

    fn feature(&self) -> Feature;

    async fn handle(&self, request: Self::Request) -> Result<Self::Response>;
}

/// A request for any feature
#[derive(Debug)]
pub enum FeatureRequest {
    Translate(TranslateRequest),
    TextToAudio(SpeechRequest),
    ImageToText(CaptionRequest),
    PdfTranslate(PdfTranslateRequest),
    Chat(ChatRequest),
    PdfToAudio(PdfAudioRequest),
}

impl FeatureRequest {
    pub const fn feature(&self) -> Feature {
        match self {
            Self::Translate(_) => Feature::Translate,
            Self::TextToAudio(_) => Feature::TextToAudio,
            Self::ImageToText(_) => Feature::ImageToText,
            Self::PdfTranslate(_) => Feature::PdfTranslate,
            Self::Chat(_) => Feature::Chat,
            Self::PdfToAudio(_) => Feature::PdfToAudio,
        }
    }
}

/// The matching response for each request variant
#[derive(Debug)]
pub enum FeatureResponse {
    Translate(TranslateResponse),
    TextToAudio(AudioClip),
    ImageToText(CaptionResponse),
    PdfTranslate(Box<TranslatedDocument>),
    Chat(ChatReply),
    PdfToAudio(AudioClip),
}

impl FeatureResponse {
    pub const fn feature(&self) -> Feature {
        match self {
            Self::Translate(_) => Feature::Translate,
            Self::TextToAudio(_) => Feature::TextToAudio,
            Self::ImageToText(_) => Feature::ImageToText,
            Self::PdfTranslate(_) => Feature::PdfTranslate,
            Self::Chat(_) => Feature::Chat,
            Self::PdfToAudio(_) => Feature::PdfToAudio,
        }
    }
}

/// External capabilities the features are built on
pub struct Services {
    pub chat_model: Arc<dyn ChatModel>,
    pub translator: Arc<dyn ChunkTranslator>,
    pub speech: Arc<dyn SpeechSynthesizer>,
    pub captioner: Arc<dyn ImageCaptioner>,
    pub pipeline: Arc<DocumentTranslationPipeline>,
}

impl Services {
    /// OpenAI-compatible backends sharing one HTTP client
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Arc::new(OpenAiClient::new(&config.llm)?);
        let translator = create_translator(&config.llm, Arc::clone(&client));
        let chat_model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(
            Arc::clone(&client),
            config.llm.model.clone(),
            Some(config.llm.temperature),
        ));
        let vision: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(
            Arc::clone(&client),
            config.llm.vision_model.clone(),
            None,
        ));

        Ok(Self {
            chat_model,
            speech: Arc::new(OpenAiSpeech::new(client, config.speech.clone())),
            captioner: Arc::new(VisionCaptioner::new(vision)),
            pipeline: Arc::new(DocumentTranslationPipeline::from_config(
                config,
                Arc::clone(&translator),
            )),
            translator,
        })
    }
}

/// All feature handlers behind one entry point
pub struct Assistant {
    translate: TranslateHandler,
    text_to_audio: TextToAudioHandler,
    image_to_text: ImageToTextHandler,
    pdf_translate: PdfTranslateHandler,
    chat: ChatHandler,
    pdf_to_audio: PdfToAudioHandler,
}

impl Assistant {
    pub fn new(config: &AppConfig, services: Services) -> Self {
        let Services {
            chat_model,
            translator,
            speech,
            captioner,
            pipeline,
        } = services;

        Self {
            translate: TranslateHandler::new(Arc::clone(&translator)),
            text_to_audio: TextToAudioHandler::new(Arc::clone(&speech), config.speech.max_chunk_len),
            image_to_text: ImageToTextHandler::new(captioner, translator),
            pdf_to_audio: PdfToAudioHandler::new(
                pipeline.extractor(),
                speech,
                config.speech.max_chunk_len,
            ),
            pdf_translate: PdfTranslateHandler::new(pipeline, config.document.size_limit),
            chat: ChatHandler::new(chat_model, ChatSessions::new(&config.chat)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config, Services::from_config(config)?))
    }

    pub async fn handle(&self, request: FeatureRequest) -> Result<FeatureResponse> {
        info!("Handling {} request", request.feature());
        Ok(match request {
            FeatureRequest::Translate(req) => {
                FeatureResponse::Translate(self.translate.handle(req).await?)
            }
            FeatureRequest::TextToAudio(req) => {
                FeatureResponse::TextToAudio(self.text_to_audio.handle(req).await?)
            }
            FeatureRequest::ImageToText(req) => {
                FeatureResponse::ImageToText(self.image_to_text.handle(req).await?)
            }
            FeatureRequest::PdfTranslate(req) => {
                FeatureResponse::PdfTranslate(Box::new(self.pdf_translate.handle(req).await?))
            }
            FeatureRequest::Chat(req) => FeatureResponse::Chat(self.chat.handle(req).await?),
            FeatureRequest::PdfToAudio(req) => {
                FeatureResponse::PdfToAudio(self.pdf_to_audio.handle(req).await?)
            }
        })
    }

    pub const fn translate(&self) -> &TranslateHandler {
        &self.translate
    }

    pub const fn text_to_audio(&self) -> &TextToAudioHandler {
        &self.text_to_audio
    }

    pub const fn image_to_text(&self) -> &ImageToTextHandler {
        &self.image_to_text
    }

    pub const fn pdf_translate(&self) -> &PdfTranslateHandler {
        &self.pdf_translate
    }

    pub const fn chat(&self) -> &ChatHandler {
        &self.chat
    }

    pub const fn pdf_to_audio(&self) -> &PdfToAudioHandler {
        &self.pdf_to_audio
    }
}
