use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Feature, FeatureHandler};
use crate::config::{Lang, SpeechConfig};
use crate::error::{Error, Result};
use crate::llm::OpenAiClient;
use crate::pdf::{DocumentTextExtractor, SourceDocument};
use crate::text::chunk;

/// Turns text into MP3 audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &Lang) -> Result<Vec<u8>>;
}

#[derive(Debug, Serialize)]
struct SpeechBody<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
    speed: f32,
}

/// Synthesizer backed by an OpenAI-compatible `/audio/speech` endpoint
pub struct OpenAiSpeech {
    client: Arc<OpenAiClient>,
    config: SpeechConfig,
}

impl OpenAiSpeech {
    pub fn new(client: Arc<OpenAiClient>, config: SpeechConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str, lang: &Lang) -> Result<Vec<u8>> {
        let body = SpeechBody {
            model: &self.config.model,
            input: text,
            voice: self.config.voice_for(lang),
            response_format: "mp3",
            speed: self.config.speed,
        };

        let response = self.client.post_json("audio/speech", &body).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::ServiceInvalidResponse(e.to_string()))?;

        if audio.is_empty() {
            return Err(Error::ServiceInvalidResponse("empty audio response".to_string()));
        }
        Ok(audio.to_vec())
    }
}

/// Synthesized speech
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    /// MP3 data, segments concatenated in order
    pub audio: Vec<u8>,
    pub segments: usize,
}

impl AudioClip {
    pub const MIME_TYPE: &'static str = "audio/mpeg";
}

/// Synthesize `text` in pieces of at most `max_len` characters
async fn synthesize_chunked(
    speech: &dyn SpeechSynthesizer,
    text: &str,
    lang: &Lang,
    max_len: usize,
) -> Result<AudioClip> {
    let pieces = chunk(text, max_len)?;
    let mut audio = Vec::new();
    for piece in &pieces {
        debug!("Synthesizing segment {}/{}", piece.index + 1, pieces.len());
        audio.extend(speech.synthesize(piece.text, lang).await?);
    }
    Ok(AudioClip {
        audio,
        segments: pieces.len(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub lang: Lang,
}

pub struct TextToAudioHandler {
    speech: Arc<dyn SpeechSynthesizer>,
    max_chunk_len: usize,
}

impl TextToAudioHandler {
    pub fn new(speech: Arc<dyn SpeechSynthesizer>, max_chunk_len: usize) -> Self {
        Self {
            speech,
            max_chunk_len,
        }
    }
}

#[async_trait]
impl FeatureHandler for TextToAudioHandler {
    type Request = SpeechRequest;
    type Response = AudioClip;

    fn feature(&self) -> Feature {
        Feature::TextToAudio
    }

    async fn handle(&self, request: SpeechRequest) -> Result<AudioClip> {
        if request.text.trim().is_empty() {
            return Err(Error::InvalidArgument("text to read is empty".to_string()));
        }
        synthesize_chunked(self.speech.as_ref(), &request.text, &request.lang, self.max_chunk_len)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct PdfAudioRequest {
    pub document: SourceDocument,
    pub lang: Lang,
}

/// Reads a whole document aloud; no size limit applies
pub struct PdfToAudioHandler {
    extractor: Arc<dyn DocumentTextExtractor>,
    speech: Arc<dyn SpeechSynthesizer>,
    max_chunk_len: usize,
}

impl PdfToAudioHandler {
    pub fn new(
        extractor: Arc<dyn DocumentTextExtractor>,
        speech: Arc<dyn SpeechSynthesizer>,
        max_chunk_len: usize,
    ) -> Self {
        Self {
            extractor,
            speech,
            max_chunk_len,
        }
    }
}

#[async_trait]
impl FeatureHandler for PdfToAudioHandler {
    type Request = PdfAudioRequest;
    type Response = AudioClip;

    fn feature(&self) -> Feature {
        Feature::PdfToAudio
    }

    async fn handle(&self, request: PdfAudioRequest) -> Result<AudioClip> {
        let extractor = Arc::clone(&self.extractor);
        let document = request.document;
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| Error::Extraction(format!("extraction task failed: {e}")))??;

        if extracted.as_str().trim().is_empty() {
            return Err(Error::Extraction("document contains no text".to_string()));
        }

        synthesize_chunked(
            self.speech.as_ref(),
            extracted.as_str(),
            &request.lang,
            self.max_chunk_len,
        )
        .await
    }
}
