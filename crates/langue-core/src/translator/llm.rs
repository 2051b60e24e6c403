use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::traits::{ChunkTranslator, TranslatorInfo};
use crate::config::Lang;
use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel};

/// Translator that prompts a chat model
pub struct LlmTranslator {
    model: Arc<dyn ChatModel>,
}

impl LlmTranslator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Create translation prompt
    fn create_prompt(text: &str, source: &Lang, target: &Lang) -> String {
        let source_hint = if source.as_str() == "auto" {
            String::new()
        } else {
            format!(" from {}", source.display_name())
        };
        format!(
            "Translate the following text{} into {}. Output only the translation, no explanations.\n\nText: \"{}\"",
            source_hint,
            target.display_name(),
            text
        )
    }

    /// Strip the quotes models like to wrap the answer in
    fn clean_response(response: &str) -> String {
        response
            .trim()
            .trim_start_matches('"')
            .trim_end_matches('"')
            .to_string()
    }
}

#[async_trait]
impl ChunkTranslator for LlmTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "LLM",
            requires_api_key: false, // Optional for local servers
            supports_auto_detect: true,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        if source.as_str() == target.as_str() && source.as_str() != "auto" {
            return Ok(text.to_string());
        }

        debug!(
            "Translating {} chars {} -> {} with {}",
            text.chars().count(),
            source,
            target,
            self.model.model()
        );

        let prompt = Self::create_prompt(text, source, target);
        let response = self.model.complete(&[ChatMessage::user(prompt)]).await?;
        Ok(Self::clean_response(&response))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Echoes the last user message and records every prompt
    struct EchoModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for EchoModel {
        fn model(&self) -> &str {
            "echo"
        }

        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            let prompt = messages.last().map(ChatMessage::text).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok("  \"Hello world\"  ".to_string())
        }
    }

    fn translator() -> (Arc<EchoModel>, LlmTranslator) {
        let model = Arc::new(EchoModel {
            prompts: Mutex::new(Vec::new()),
        });
        (Arc::clone(&model), LlmTranslator::new(model))
    }

    #[test]
    fn test_prompt_names_languages() {
        let prompt = LlmTranslator::create_prompt("Bonjour", &Lang::new("fr"), &Lang::new("en"));
        assert!(prompt.contains("from French into English"));
        assert!(prompt.ends_with("\"Bonjour\""));

        let auto = LlmTranslator::create_prompt("Hola", &Lang::new("auto"), &Lang::new("de"));
        assert!(auto.starts_with("Translate the following text into German."));
    }

    #[tokio::test]
    async fn test_translate_strips_quotes() {
        let (model, translator) = translator();
        let out = translator
            .translate("Bonjour le monde", &Lang::new("fr"), &Lang::new("en"))
            .await
            .unwrap();
        assert_eq!(out, "Hello world");
        assert_eq!(model.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_and_same_language_skip_model() {
        let (model, translator) = translator();
        let fr = Lang::new("fr");
        assert_eq!(translator.translate("  \n", &fr, &Lang::new("en")).await.unwrap(), "  \n");
        assert_eq!(translator.translate("Salut", &fr, &fr).await.unwrap(), "Salut");
        assert!(model.prompts.lock().unwrap().is_empty());
    }
}
