use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Feature, FeatureHandler};
use crate::config::Lang;
use crate::error::{Error, Result};
use crate::translator::ChunkTranslator;

#[derive(Debug, Clone, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    /// Omit to let the model detect the language
    #[serde(default)]
    pub source_lang: Option<Lang>,
    pub target_lang: Lang,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResponse {
    pub text: String,
    pub target_lang: Lang,
}

/// Free-text translation in a single call
pub struct TranslateHandler {
    translator: Arc<dyn ChunkTranslator>,
}

impl TranslateHandler {
    pub fn new(translator: Arc<dyn ChunkTranslator>) -> Self {
        Self { translator }
    }
}

#[async_trait]
impl FeatureHandler for TranslateHandler {
    type Request = TranslateRequest;
    type Response = TranslateResponse;

    fn feature(&self) -> Feature {
        Feature::Translate
    }

    async fn handle(&self, request: TranslateRequest) -> Result<TranslateResponse> {
        if request.text.trim().is_empty() {
            return Err(Error::InvalidArgument("text to translate is empty".to_string()));
        }

        let source = request.source_lang.unwrap_or_else(|| Lang::new("auto"));
        let text = self
            .translator
            .translate(&request.text, &source, &request.target_lang)
            .await?;

        Ok(TranslateResponse {
            text,
            target_lang: request.target_lang,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::translator::TranslatorInfo;

    struct Upper;

    #[async_trait]
    impl ChunkTranslator for Upper {
        fn info(&self) -> TranslatorInfo {
            TranslatorInfo {
                name: "upper",
                requires_api_key: false,
                supports_auto_detect: true,
            }
        }

        async fn translate(&self, text: &str, source: &Lang, _target: &Lang) -> Result<String> {
            Ok(format!("{}:{}", source, text.to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_translate_defaults_to_auto_source() {
        let handler = TranslateHandler::new(Arc::new(Upper));
        let response = handler
            .handle(TranslateRequest {
                text: "bonjour".to_string(),
                source_lang: None,
                target_lang: Lang::new("en"),
            })
            .await
            .unwrap();
        assert_eq!(response.text, "auto:BONJOUR");
        assert_eq!(response.target_lang.as_str(), "en");
    }

    #[tokio::test]
    async fn test_empty_text_is_invalid() {
        let handler = TranslateHandler::new(Arc::new(Upper));
        let err = handler
            .handle(TranslateRequest {
                text: "   ".to_string(),
                source_lang: Some(Lang::new("fr")),
                target_lang: Lang::new("en"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_request_deserializes_without_source() {
        let req: TranslateRequest =
            serde_json::from_str(r#"{"text":"hola","target_lang":"fr"}"#).unwrap();
        assert!(req.source_lang.is_none());
        assert_eq!(req.target_lang.as_str(), "fr");
    }
}
