//! Document translation: extract, validate, chunk, translate, reassemble,
//! render.
//!
//! A run either returns both the translated text and the rendered PDF, or a
//! single error. Partial translations never leave the pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::{AppConfig, DocumentConfig, Lang};
use crate::error::{Error, Result};
use crate::pdf::{
    DocumentRenderer, DocumentTextExtractor, FontSource, MupdfExtractor, RenderOptions,
    RenderedDocument, SourceDocument,
};
use crate::text::{chunk, reassemble};
use crate::translator::ChunkTranslator;
use crate::util::char_len;

/// Called with `(chunks_done, chunks_total)` after each chunk
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Tuning knobs for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Characters per translation call
    pub max_chunk_len: usize,
    /// Translation calls in flight at once; 1 is strictly sequential
    pub concurrency: usize,
    /// Limit for a single translation call
    pub chunk_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&DocumentConfig::default())
    }
}

impl PipelineOptions {
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self {
            max_chunk_len: config.max_chunk_len,
            concurrency: config.concurrency.max(1),
            chunk_timeout: (config.chunk_timeout_secs > 0)
                .then(|| Duration::from_secs(config.chunk_timeout_secs)),
        }
    }
}

/// Lifecycle of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Extracted,
    Validated,
    Translating,
    Rendered,
    Done,
    Failed(String),
}

impl PipelineState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Extracted => f.write_str("extracted"),
            Self::Validated => f.write_str("validated"),
            Self::Translating => f.write_str("translating"),
            Self::Rendered => f.write_str("rendered"),
            Self::Done => f.write_str("done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// State tracker that logs every transition of a run
#[derive(Debug)]
struct Run {
    id: Uuid,
    state: PipelineState,
}

impl Run {
    fn new() -> Self {
        let run = Self {
            id: Uuid::new_v4(),
            state: PipelineState::Received,
        };
        debug!("[{}] {}", run.id, run.state);
        run
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(!self.state.is_terminal(), "run already finished");
        if let PipelineState::Failed(reason) = &next {
            error!("[{}] {} -> failed: {}", self.id, self.state, reason);
        } else {
            debug!("[{}] {} -> {}", self.id, self.state, next);
        }
        self.state = next;
    }
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    /// Reassembled translation, one trailing newline per chunk
    pub text: String,
    pub document: RenderedDocument,
    /// Characters extracted from the source
    pub source_len: usize,
    pub chunk_count: usize,
}

/// Orchestrates a document translation from upload to rendered PDF.
pub struct DocumentTranslationPipeline {
    extractor: Arc<dyn DocumentTextExtractor>,
    translator: Arc<dyn ChunkTranslator>,
    renderer: DocumentRenderer,
    font: FontSource,
    options: PipelineOptions,
}

impl DocumentTranslationPipeline {
    pub fn new(
        extractor: Arc<dyn DocumentTextExtractor>,
        translator: Arc<dyn ChunkTranslator>,
        renderer: DocumentRenderer,
        font: FontSource,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            translator,
            renderer,
            font,
            options,
        }
    }

    /// MuPDF extraction and the configured font and layout
    pub fn from_config(config: &AppConfig, translator: Arc<dyn ChunkTranslator>) -> Self {
        Self::new(
            Arc::new(MupdfExtractor::new()),
            translator,
            DocumentRenderer::new(RenderOptions::from_config(&config.document)),
            FontSource::File(config.document.font_path.clone()),
            PipelineOptions::from_config(&config.document),
        )
    }

    pub const fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn extractor(&self) -> Arc<dyn DocumentTextExtractor> {
        Arc::clone(&self.extractor)
    }

    /// Translate a document whose extracted text is at most `size_limit`
    /// characters.
    pub async fn translate(
        &self,
        document: &SourceDocument,
        source: &Lang,
        target: &Lang,
        size_limit: usize,
    ) -> Result<TranslatedDocument> {
        self.translate_with_progress(document, source, target, size_limit, None)
            .await
    }

    pub async fn translate_with_progress(
        &self,
        document: &SourceDocument,
        source: &Lang,
        target: &Lang,
        size_limit: usize,
        progress: Option<ProgressCallback>,
    ) -> Result<TranslatedDocument> {
        let mut run = Run::new();
        let result = self
            .run(&mut run, document, source, target, size_limit, progress.as_deref())
            .await;

        match result {
            Ok(output) => {
                run.advance(PipelineState::Done);
                Ok(output)
            }
            Err(e) => {
                run.advance(PipelineState::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        run: &mut Run,
        document: &SourceDocument,
        source: &Lang,
        target: &Lang,
        size_limit: usize,
        progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
    ) -> Result<TranslatedDocument> {
        let extracted = self.extract_text(document).await?;
        run.advance(PipelineState::Extracted);

        let source_len = extracted.len();
        if source_len > size_limit {
            return Err(Error::SizeLimitExceeded {
                length: source_len,
                limit: size_limit,
            });
        }
        run.advance(PipelineState::Validated);

        run.advance(PipelineState::Translating);
        info!(
            "Translating document: {} chars, {} -> {}",
            source_len, source, target
        );
        let (text, chunk_count) = self
            .translate_text(extracted.as_str(), source, target, progress)
            .await?;

        let renderer = self.renderer.clone();
        let font = self.font.clone();
        let rendered_text = text.clone();
        let rendered = tokio::task::spawn_blocking(move || renderer.render_with(&rendered_text, &font))
            .await
            .map_err(|e| Error::PdfWrite(format!("render task failed: {e}")))??;
        run.advance(PipelineState::Rendered);

        info!(
            "Document translated: {} chunks, {} pages",
            chunk_count,
            rendered.page_count()
        );

        Ok(TranslatedDocument {
            text,
            document: rendered,
            source_len,
            chunk_count,
        })
    }

    /// Run the extractor on a blocking thread
    pub async fn extract_text(&self, document: &SourceDocument) -> Result<crate::pdf::ExtractedText> {
        let extractor = Arc::clone(&self.extractor);
        let document = document.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| Error::Extraction(format!("extraction task failed: {e}")))?
    }

    /// Chunk, translate and reassemble `text`.
    ///
    /// Returns the reassembled translation and the number of chunks. Results
    /// are taken in chunk order whatever order the calls finish in; the first
    /// failure drops every call still in flight.
    pub async fn translate_text(
        &self,
        text: &str,
        source: &Lang,
        target: &Lang,
        progress: Option<&(dyn Fn(usize, usize) + Send + Sync)>,
    ) -> Result<(String, usize)> {
        let chunks = chunk(text, self.options.max_chunk_len)?;
        let total = chunks.len();
        if total == 0 {
            debug!("Nothing to translate");
            return Ok((String::new(), 0));
        }

        debug!(
            "Split {} chars into {} chunks (max {}, {} in flight)",
            char_len(text),
            total,
            self.options.max_chunk_len,
            self.options.concurrency
        );

        let translator = &self.translator;
        let timeout = self.options.chunk_timeout;

        let calls: Vec<_> = chunks.iter().map(|piece| async move {
            let call = translator.translate(piece.text, source, target);
            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        return Err(Error::ChunkTimeout {
                            chunk: piece.index,
                            secs: limit.as_secs(),
                        });
                    }
                },
                None => call.await,
            };
            outcome.map_err(|e| Error::ChunkTranslation {
                chunk: piece.index,
                total,
                source: Box::new(e),
            })
        }).collect();
        let mut results = stream::iter(calls).buffered(self.options.concurrency.max(1));

        let mut translated = Vec::with_capacity(total);
        while let Some(result) = results.next().await {
            translated.push(result?);
            debug!("Chunk {}/{} translated", translated.len(), total);
            if let Some(callback) = progress {
                callback(translated.len(), total);
            }
        }

        Ok((reassemble(&translated), total))
    }
}
