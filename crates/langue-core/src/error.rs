use thiserror::Error;

/// Unified error type for langue-core
///
/// Variants are grouped by the stage that produces them. Callers that only
/// care about the broad category should match on [`Error::kind`].
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Argument Errors
    // ==========================================================================
    /// A caller-supplied argument is out of range or empty
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An uploaded image could not be decoded or re-encoded
    #[error("invalid image: {0}")]
    Image(String),

    // ==========================================================================
    // Document Errors
    // ==========================================================================
    /// The source document is malformed or its text could not be read
    #[error("failed to extract document text: {0}")]
    Extraction(String),

    /// The declared or detected document format is not supported
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Extracted text is longer than the accepted limit
    #[error("document text is {length} characters, limit is {limit}")]
    SizeLimitExceeded { length: usize, limit: usize },

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translating one chunk failed; no partial result is returned
    #[error("translation of chunk {} of {total} failed: {source}", chunk + 1)]
    ChunkTranslation {
        chunk: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    /// Translating one chunk took longer than the per-call timeout
    #[error("translation of chunk {} timed out after {secs}s", chunk + 1)]
    ChunkTimeout { chunk: usize, secs: u64 },

    // ==========================================================================
    // Render Errors
    // ==========================================================================
    /// The Unicode font could not be read or parsed
    #[error("failed to load font: {0}")]
    FontLoad(String),

    /// The text contains a character the font has no glyph for
    #[error("font '{font}' has no glyph for {ch:?} (U+{:04X})", u32::from(*ch))]
    MissingGlyph { font: String, ch: char },

    /// A line cannot be placed on a page at all
    #[error("line does not fit on the page: {0}")]
    LineExceedsPage(String),

    /// Writing the output PDF failed
    #[error("failed to write PDF: {0}")]
    PdfWrite(String),

    // ==========================================================================
    // External Service Errors (LLM, speech)
    // ==========================================================================
    /// Request to the external service failed
    #[error("service request failed: {0}")]
    ServiceRequest(String),

    /// The external service answered with something we cannot use
    #[error("invalid service response: {0}")]
    ServiceInvalidResponse(String),

    /// Rate limited by the external service
    #[error("service rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    ServiceRateLimited { retry_after: Option<u64> },

    /// Request to the external service timed out
    #[error("service request timed out")]
    ServiceTimeout,

    /// Maximum retry attempts exceeded
    #[error("service request failed after maximum retries")]
    ServiceMaxRetriesExceeded,

    // ==========================================================================
    // Session Errors
    // ==========================================================================
    /// Chat session does not exist or has expired
    #[error("chat session not found: {0}")]
    SessionNotFound(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error taxonomy used by front ends to pick a user-facing response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Extraction,
    SizeLimitExceeded,
    TranslationService,
    Render,
    Service,
    Session,
    Config,
    Io,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::Image(_) => ErrorKind::InvalidArgument,
            Self::Extraction(_) | Self::UnsupportedFormat(_) => ErrorKind::Extraction,
            Self::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            Self::ChunkTranslation { .. } | Self::ChunkTimeout { .. } => {
                ErrorKind::TranslationService
            }
            Self::FontLoad(_)
            | Self::MissingGlyph { .. }
            | Self::LineExceedsPage(_)
            | Self::PdfWrite(_) => ErrorKind::Render,
            Self::ServiceRequest(_)
            | Self::ServiceInvalidResponse(_)
            | Self::ServiceRateLimited { .. }
            | Self::ServiceTimeout
            | Self::ServiceMaxRetriesExceeded => ErrorKind::Service,
            Self::SessionNotFound(_) => ErrorKind::Session,
            Self::ConfigLoad(_) | Self::ConfigInvalid { .. } => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
