use std::sync::Arc;

use async_trait::async_trait;

use super::{Feature, FeatureHandler};
use crate::config::Lang;
use crate::error::Result;
use crate::pdf::SourceDocument;
use crate::pipeline::{DocumentTranslationPipeline, TranslatedDocument};

#[derive(Debug, Clone)]
pub struct PdfTranslateRequest {
    pub document: SourceDocument,
    pub source_lang: Lang,
    pub target_lang: Lang,
}

/// Document translation with the configured size limit
pub struct PdfTranslateHandler {
    pipeline: Arc<DocumentTranslationPipeline>,
    size_limit: usize,
}

impl PdfTranslateHandler {
    pub fn new(pipeline: Arc<DocumentTranslationPipeline>, size_limit: usize) -> Self {
        Self {
            pipeline,
            size_limit,
        }
    }

    pub const fn size_limit(&self) -> usize {
        self.size_limit
    }

    pub fn pipeline(&self) -> &DocumentTranslationPipeline {
        &self.pipeline
    }
}

#[async_trait]
impl FeatureHandler for PdfTranslateHandler {
    type Request = PdfTranslateRequest;
    type Response = TranslatedDocument;

    fn feature(&self) -> Feature {
        Feature::PdfTranslate
    }

    async fn handle(&self, request: PdfTranslateRequest) -> Result<TranslatedDocument> {
        self.pipeline
            .translate(
                &request.document,
                &request.source_lang,
                &request.target_lang,
                self.size_limit,
            )
            .await
    }
}
