use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Leading bytes of every PDF file
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// Source formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
}

impl DocumentFormat {
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
        }
    }

    /// Resolve a MIME type such as `application/pdf`
    pub fn from_mime(mime: &str) -> Result<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("application/pdf") {
            Ok(Self::Pdf)
        } else {
            Err(Error::UnsupportedFormat(mime.to_string()))
        }
    }

    /// Guess the format from a file name's extension
    pub fn from_file_name(name: &str) -> Result<Self> {
        let mime = mime_guess::from_path(name)
            .first()
            .ok_or_else(|| Error::UnsupportedFormat(format!("unknown file type: {name}")))?;
        Self::from_mime(mime.essence_str())
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An uploaded document, immutable once received.
///
/// Cloning is O(1); the bytes are shared.
#[derive(Clone)]
pub struct SourceDocument {
    format: DocumentFormat,
    bytes: Arc<[u8]>,
}

impl SourceDocument {
    pub fn new(format: DocumentFormat, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format,
            bytes: Arc::from(bytes.into()),
        }
    }

    pub fn pdf(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(DocumentFormat::Pdf, bytes)
    }

    /// Build from an upload, guessing the format from its file name
    pub fn from_upload(file_name: &str, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let format = DocumentFormat::from_file_name(file_name)?;
        Ok(Self::new(format, bytes))
    }

    /// Read a document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let format = DocumentFormat::from_file_name(name)?;
        let bytes = std::fs::read(path)?;
        Ok(Self::new(format, bytes))
    }

    pub const fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check the payload matches the declared format
    pub fn check_signature(&self) -> Result<()> {
        match self.format {
            DocumentFormat::Pdf if self.bytes.starts_with(PDF_MAGIC) => Ok(()),
            DocumentFormat::Pdf => Err(Error::Extraction("not a PDF file".to_string())),
        }
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("format", &self.format)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(DocumentFormat::from_file_name("rapport.pdf").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_file_name("RAPPORT.PDF").unwrap(), DocumentFormat::Pdf);
        let err = DocumentFormat::from_file_name("notes.docx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(DocumentFormat::from_file_name("noextension").is_err());
    }

    #[test]
    fn test_format_from_mime_ignores_parameters() {
        assert_eq!(
            DocumentFormat::from_mime("application/pdf; charset=binary").unwrap(),
            DocumentFormat::Pdf
        );
        assert!(DocumentFormat::from_mime("image/png").is_err());
    }

    #[test]
    fn test_signature_check() {
        assert!(SourceDocument::pdf(b"%PDF-1.7\n".to_vec()).check_signature().is_ok());
        let err = SourceDocument::pdf(b"hello".to_vec()).check_signature().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extraction);
    }
}
