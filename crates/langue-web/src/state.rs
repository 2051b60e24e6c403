use anyhow::{Context, Result};
use langue_core::{AppConfig, Assistant, Services};

/// Global application state.
///
/// Holds no per-request data: chat sessions live in the assistant's session
/// store and rendered documents go straight back to the client.
pub struct AppState {
    pub config: AppConfig,
    pub assistant: Assistant,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let services = Services::from_config(&config).context("Failed to create services")?;
        Ok(Self::with_services(config, services))
    }

    pub fn with_services(config: AppConfig, services: Services) -> Self {
        let assistant = Assistant::new(&config, services);
        Self { config, assistant }
    }
}

#[cfg(test)]
pub mod tests {
    //! In-process backends for route tests.

    use super::*;
    use async_trait::async_trait;
    use langue_core::features::{ImageCaptioner, SpeechSynthesizer};
    use langue_core::pdf::{DocumentTextExtractor, FontMetrics, FontSource, SourceDocument, UnicodeFont};
    use langue_core::{
        ChatMessage, ChatModel, ChunkTranslator, DocumentRenderer, DocumentTranslationPipeline,
        Lang, PipelineOptions, RenderOptions, TranslatorInfo,
    };
    use std::sync::Arc;

    /// Upper-cases its input
    pub struct UpperTranslator;

    #[async_trait]
    impl ChunkTranslator for UpperTranslator {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "upper",
                requires_api_key: false,
                supports_auto_detect: true,
            }
        }

        async fn translate(&self, text: &str, _source: &Lang, _target: &Lang) -> langue_core::Result<String> {
            Ok(text.to_uppercase())
        }
    }

    /// Replies with the number of messages it was sent
    pub struct CountingChat;

    #[async_trait]
    impl ChatModel for CountingChat {
        fn model(&self) -> &str {
            "counting"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> langue_core::Result<String> {
            Ok(format!("seen {}", messages.len()))
        }
    }

    /// One byte per character
    pub struct ByteSpeech;

    #[async_trait]
    impl SpeechSynthesizer for ByteSpeech {
        async fn synthesize(&self, text: &str, _lang: &Lang) -> langue_core::Result<Vec<u8>> {
            Ok(vec![0xFF; text.chars().count()])
        }
    }

    pub struct FixedCaptioner;

    #[async_trait]
    impl ImageCaptioner for FixedCaptioner {
        async fn describe(&self, _image: &[u8]) -> langue_core::Result<String> {
            Ok("a cat on a mat".to_string())
        }
    }

    /// Ignores the document and returns fixed pages
    pub struct FixedExtractor(pub Vec<String>);

    impl DocumentTextExtractor for FixedExtractor {
        fn extract_pages(&self, document: &SourceDocument) -> langue_core::Result<Vec<String>> {
            document.check_signature()?;
            Ok(self.0.clone())
        }
    }

    /// Latin-1 coverage, fixed advances
    pub struct Latin1Font;

    impl UnicodeFont for Latin1Font {
        fn name(&self) -> &str {
            "Latin1Test"
        }

        fn glyph_id(&self, c: char) -> Option<u16> {
            u16::try_from(u32::from(c))
                .ok()
                .filter(|code| (0x20..=0xFF).contains(code))
        }

        fn advance(&self, _glyph_id: u16) -> u16 {
            500
        }

        fn units_per_em(&self) -> u16 {
            1000
        }

        fn metrics(&self) -> FontMetrics {
            FontMetrics {
                ascent: 800,
                descent: -200,
                cap_height: 700,
                bbox: [0, -200, 500, 800],
            }
        }

        fn program(&self) -> &[u8] {
            &[]
        }
    }

    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.document.size_limit = 100;
        config
    }

    /// State whose PDFs extract to `pages`
    pub fn test_state_with_pages(pages: &[&str]) -> Arc<AppState> {
        let config = test_config();
        let translator: Arc<dyn ChunkTranslator> = Arc::new(UpperTranslator);
        let pipeline = DocumentTranslationPipeline::new(
            Arc::new(FixedExtractor(pages.iter().map(ToString::to_string).collect())),
            Arc::clone(&translator),
            DocumentRenderer::new(RenderOptions::default()),
            FontSource::Loaded(Arc::new(Latin1Font)),
            PipelineOptions::from_config(&config.document),
        );
        let services = Services {
            chat_model: Arc::new(CountingChat),
            translator,
            speech: Arc::new(ByteSpeech),
            captioner: Arc::new(FixedCaptioner),
            pipeline: Arc::new(pipeline),
        };
        Arc::new(AppState::with_services(config, services))
    }

    pub fn test_state() -> Arc<AppState> {
        test_state_with_pages(&["Bonjour le monde\n"])
    }

    #[test]
    fn test_state_uses_configured_limit() {
        let state = test_state();
        assert_eq!(state.assistant.pdf_translate().size_limit(), 100);
    }
}
