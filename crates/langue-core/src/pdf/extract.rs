use mupdf::{Document as MuDocument, TextPageOptions};
use tracing::debug;

use super::document::{DocumentFormat, SourceDocument};
use crate::error::{Error, Result};
use crate::util::char_len;

/// Text of a whole document, pages concatenated in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    text: String,
    page_lengths: Vec<usize>,
}

impl ExtractedText {
    /// Join page texts with no separator
    pub fn from_pages<S: AsRef<str>>(pages: &[S]) -> Self {
        let mut text = String::new();
        let mut page_lengths = Vec::with_capacity(pages.len());
        for page in pages {
            let page = page.as_ref();
            page_lengths.push(char_len(page));
            text.push_str(page);
        }
        Self { text, page_lengths }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.page_lengths.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.page_lengths.len()
    }

    /// Character count of each page, in page order
    pub fn page_lengths(&self) -> &[usize] {
        &self.page_lengths
    }
}

/// Converts a source document into per-page text.
///
/// Implementations are synchronous; async callers should run them on a
/// blocking thread.
pub trait DocumentTextExtractor: Send + Sync {
    /// One string per page, in page order
    fn extract_pages(&self, document: &SourceDocument) -> Result<Vec<String>>;

    fn extract(&self, document: &SourceDocument) -> Result<ExtractedText> {
        self.extract_pages(document)
            .map(|pages| ExtractedText::from_pages(&pages))
    }
}

/// MuPDF-backed extractor for PDF documents
#[derive(Debug, Clone, Copy, Default)]
pub struct MupdfExtractor;

impl MupdfExtractor {
    pub const fn new() -> Self {
        Self
    }

    fn page_text(doc: &MuDocument, page_index: i32) -> Result<String> {
        let page = doc.load_page(page_index).map_err(|e| {
            Error::Extraction(format!("failed to load page {}: {e}", page_index + 1))
        })?;

        let text_page = page.to_text_page(TextPageOptions::empty()).map_err(|e| {
            Error::Extraction(format!("failed to read text of page {}: {e}", page_index + 1))
        })?;

        let mut text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                for text_char in line.chars() {
                    if let Some(c) = text_char.char() {
                        text.push(c);
                    }
                }
                text.push('\n');
            }
        }
        Ok(text)
    }
}

impl DocumentTextExtractor for MupdfExtractor {
    fn extract_pages(&self, document: &SourceDocument) -> Result<Vec<String>> {
        match document.format() {
            DocumentFormat::Pdf => document.check_signature()?,
        }

        let doc = MuDocument::from_bytes(document.bytes(), document.format().mime_type())
            .map_err(|e| Error::Extraction(format!("failed to parse PDF: {e}")))?;

        let page_count = doc
            .page_count()
            .map_err(|e| Error::Extraction(format!("failed to get page count: {e}")))?;

        let pages = (0..page_count)
            .map(|index| Self::page_text(&doc, index))
            .collect::<Result<Vec<_>>>()?;

        debug!("Extracted {} pages", pages.len());
        Ok(pages)
    }
}
