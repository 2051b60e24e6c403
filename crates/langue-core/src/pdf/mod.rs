//! Source documents, text extraction and Unicode PDF output.

mod document;
mod extract;
mod font;
mod render;

pub use document::{DocumentFormat, PDF_MAGIC, SourceDocument};
pub use extract::{DocumentTextExtractor, ExtractedText, MupdfExtractor};
pub use font::{
    FontMetrics, FontSource, TrueTypeFont, UnicodeFont, embed_font, encode_glyphs,
    load_unicode_font,
};
pub use render::{DocumentRenderer, Layout, MM_TO_PT, PlacedRow, RenderOptions, RenderedDocument};

/// A4 page width in millimetres
pub const A4_WIDTH_MM: f32 = 210.0;
/// A4 page height in millimetres
pub const A4_HEIGHT_MM: f32 = 297.0;
