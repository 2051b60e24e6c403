//! LanguePro core library
//!
//! This library provides the language assistant's building blocks:
//! - Chunked document translation with Unicode PDF output
//! - Chat, translation, speech and vision clients for OpenAI-compatible APIs
//! - Feature handlers behind a single tagged dispatch

pub mod config;
pub mod error;
pub mod features;
pub mod llm;
pub mod pdf;
pub mod pipeline;
pub mod text;
pub mod translator;
pub mod util;

pub use config::{
    AppConfig, ChatConfig, DocumentConfig, Lang, LanguageOption, LlmConfig, SpeechConfig,
    source_languages, target_languages, flag_for_lang, language_name,
    DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG,
};
pub use error::{Error, ErrorKind, Result};
pub use features::{Assistant, Feature, FeatureHandler, FeatureRequest, FeatureResponse, Services};
pub use llm::{ChatMessage, ChatModel, OpenAiChat, OpenAiClient};
pub use pdf::{
    DocumentRenderer, DocumentTextExtractor, ExtractedText, FontSource, MupdfExtractor,
    RenderOptions, RenderedDocument, SourceDocument, UnicodeFont, load_unicode_font,
};
pub use pipeline::{
    DocumentTranslationPipeline, PipelineOptions, PipelineState, ProgressCallback,
    TranslatedDocument,
};
pub use text::{TextChunk, chunk, reassemble};
pub use translator::{ChunkTranslator, LlmTranslator, TranslatorInfo, create_translator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "fr");
        assert_eq!(config.target_lang.as_str(), "en");
        assert!(config.validate().is_ok());
    }
}
