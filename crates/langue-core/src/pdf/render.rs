use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat};
use tracing::debug;

use super::font::{FontSource, UnicodeFont, embed_font, encode_glyphs};
use super::{A4_HEIGHT_MM, A4_WIDTH_MM};
use crate::config::DocumentConfig;
use crate::error::{Error, Result};

/// Points per millimetre
pub const MM_TO_PT: f32 = 72.0 / 25.4;

/// Horizontal padding inside each text cell
const CELL_PADDING_MM: f32 = 1.0;

/// Page geometry and type settings, in millimetres except `font_size`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub page_width: f32,
    pub page_height: f32,
    /// Applied on all four sides
    pub margin: f32,
    /// Points
    pub font_size: f32,
    pub line_height: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH_MM,
            page_height: A4_HEIGHT_MM,
            margin: 15.0,
            font_size: 12.0,
            line_height: 10.0,
        }
    }
}

impl RenderOptions {
    pub fn from_config(config: &DocumentConfig) -> Self {
        Self {
            margin: config.margin,
            font_size: config.font_size,
            line_height: config.line_height,
            ..Self::default()
        }
    }

    fn font_size_mm(&self) -> f32 {
        self.font_size / MM_TO_PT
    }

    /// Width available to glyphs on one row
    pub(crate) fn text_width(&self) -> f32 {
        2.0f32.mul_add(-(self.margin + CELL_PADDING_MM), self.page_width)
    }

    /// Height available to rows on one page
    pub(crate) fn text_height(&self) -> f32 {
        2.0f32.mul_add(-self.margin, self.page_height)
    }

    /// Lowest y a row may reach
    fn bottom(&self) -> f32 {
        self.page_height - self.margin
    }
}

/// One row of text placed on a page.
///
/// `x`/`y` are the top-left of the row in millimetres from the page's
/// top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRow {
    pub page: usize,
    pub x: f32,
    pub y: f32,
    pub text: String,
}

/// Result of laying out a text
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub rows: Vec<PlacedRow>,
    pub page_count: usize,
}

impl Layout {
    pub fn rows_on_page(&self, page: usize) -> impl Iterator<Item = &PlacedRow> {
        self.rows.iter().filter(move |row| row.page == page)
    }
}

/// A finished PDF, kept in memory only
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    bytes: Vec<u8>,
    layout: Layout,
}

impl RenderedDocument {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub const fn page_count(&self) -> usize {
        self.layout.page_count
    }

    pub const fn layout(&self) -> &Layout {
        &self.layout
    }
}

/// Lays out text on paginated A4 pages and writes it as a PDF.
///
/// Each newline-separated line starts a new block. Blocks wrap at the last
/// space that fits, or between characters when a single word is too wide.
/// A page break happens before any row that would cross the bottom margin.
#[derive(Debug, Clone, Default)]
pub struct DocumentRenderer {
    options: RenderOptions,
}

impl DocumentRenderer {
    pub const fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub const fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Compute row placement without producing a PDF
    pub fn layout(&self, text: &str, font: &dyn UnicodeFont) -> Result<Layout> {
        let opts = &self.options;
        if opts.line_height > opts.text_height() {
            return Err(Error::LineExceedsPage(format!(
                "line height {}mm is taller than the usable page height",
                opts.line_height
            )));
        }

        let x = opts.margin + CELL_PADDING_MM;
        let mut rows = Vec::new();
        let mut page = 0;
        let mut y = opts.margin;

        for line in text.split('\n') {
            for row in self.wrap_line(&sanitize_line(line), font)? {
                if y + opts.line_height > opts.bottom() {
                    page += 1;
                    y = opts.margin;
                }
                rows.push(PlacedRow {
                    page,
                    x,
                    y,
                    text: row,
                });
                y += opts.line_height;
            }
        }

        Ok(Layout {
            rows,
            page_count: page + 1,
        })
    }

    /// Lay out `text` and write it as a PDF
    pub fn render(&self, text: &str, font: &dyn UnicodeFont) -> Result<RenderedDocument> {
        let layout = self.layout(text, font)?;
        let bytes = self.write_pdf(&layout, font)?;
        debug!(
            "Rendered {} rows on {} pages ({} bytes)",
            layout.rows.len(),
            layout.page_count,
            bytes.len()
        );
        Ok(RenderedDocument { bytes, layout })
    }

    /// Resolve the font, then render
    pub fn render_with(&self, text: &str, font: &FontSource) -> Result<RenderedDocument> {
        let font = font.load()?;
        self.render(text, font.as_ref())
    }

    fn char_width(&self, font: &dyn UnicodeFont, c: char) -> Result<f32> {
        let gid = font.glyph_id(c).ok_or_else(|| Error::MissingGlyph {
            font: font.name().to_string(),
            ch: c,
        })?;
        let em = f32::from(font.units_per_em().max(1));
        Ok(f32::from(font.advance(gid)) / em * self.options.font_size_mm())
    }

    /// Split one line into rows that fit the usable width.
    ///
    /// Always returns at least one row; an empty line gives one empty row.
    fn wrap_line(&self, line: &str, font: &dyn UnicodeFont) -> Result<Vec<String>> {
        let max_width = self.options.text_width();
        let chars: Vec<char> = line.chars().collect();
        let mut rows = Vec::new();
        let mut start = 0;
        let mut width = 0.0f32;
        let mut last_space: Option<usize> = None;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let w = self.char_width(font, c)?;
            if w > max_width {
                return Err(Error::LineExceedsPage(format!(
                    "glyph {c:?} is wider than the usable page width"
                )));
            }
            if c == ' ' {
                last_space = Some(i);
            }

            if width + w > max_width {
                match last_space.filter(|&sp| sp > start) {
                    Some(sp) => {
                        rows.push(chars[start..sp].iter().collect());
                        i = sp + 1;
                    }
                    None => rows.push(chars[start..i].iter().collect()),
                }
                start = i;
                width = 0.0;
                last_space = None;
                continue;
            }

            width += w;
            i += 1;
        }

        if start < chars.len() || rows.is_empty() {
            rows.push(chars[start..].iter().collect());
        }
        Ok(rows)
    }

    fn write_pdf(&self, layout: &Layout, font: &dyn UnicodeFont) -> Result<Vec<u8>> {
        let opts = &self.options;
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut used: BTreeMap<u16, char> = BTreeMap::new();
        for c in layout.rows.iter().flat_map(|row| row.text.chars()) {
            if let Some(gid) = font.glyph_id(c) {
                used.entry(gid).or_insert(c);
            }
        }

        let font_id = embed_font(&mut doc, font, &used);
        let resources_id = doc.add_object(lopdf::Dictionary::from_iter([(
            "Font",
            Object::Dictionary(lopdf::Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]));

        // Baseline sits 0.3 em below the vertical centre of the row
        let baseline_offset = 0.3f32.mul_add(opts.font_size_mm(), 0.5 * opts.line_height);

        let mut kids = Vec::with_capacity(layout.page_count);
        for page in 0..layout.page_count {
            let mut operations = Vec::new();
            for row in layout.rows_on_page(page).filter(|row| !row.text.is_empty()) {
                let x_pt = row.x * MM_TO_PT;
                let y_pt = (opts.page_height - row.y - baseline_offset) * MM_TO_PT;
                operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), opts.font_size.into()]),
                    Operation::new("Td", vec![x_pt.into(), y_pt.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(encode_glyphs(font, &row.text)?, StringFormat::Hexadecimal)],
                    ),
                    Operation::new("ET", vec![]),
                ]);
            }

            let content = Content { operations }
                .encode()
                .map_err(|e| Error::PdfWrite(format!("Failed to encode page content: {e}")))?;
            let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));

            let page_id = doc.add_object(lopdf::Dictionary::from_iter([
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        0.into(),
                        0.into(),
                        (opts.page_width * MM_TO_PT).into(),
                        (opts.page_height * MM_TO_PT).into(),
                    ]),
                ),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let pages = lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(i64::try_from(kids.len()).unwrap_or(i64::MAX))),
            ("Kids", Object::Array(kids)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(lopdf::Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.compress();

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::PdfWrite(format!("Failed to save PDF: {e}")))?;
        Ok(output)
    }
}

/// Drop carriage returns and blank out other control characters
fn sanitize_line(line: &str) -> String {
    line.chars()
        .filter(|&c| c != '\r')
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pdf::font::tests::FakeFont;

    /// FakeFont glyphs are half an em: at 12pt that is ~2.117mm, so a
    /// 178mm row holds 84 characters.
    const ROW_CAPACITY: usize = 84;

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::default()
    }

    #[test]
    fn test_row_capacity_matches_geometry() {
        let r = renderer();
        let per_char = r.char_width(&FakeFont, 'a').unwrap();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let capacity = (r.options.text_width() / per_char).floor() as usize;
        assert_eq!(capacity, ROW_CAPACITY);
    }

    #[test]
    fn test_empty_text_gives_one_page() {
        let layout = renderer().layout("", &FakeFont).unwrap();
        assert_eq!(layout.page_count, 1);
        assert_eq!(layout.rows.len(), 1);
        assert!(layout.rows[0].text.is_empty());
    }

    #[test]
    fn test_lines_and_empty_lines_keep_order() {
        let layout = renderer().layout("one\n\ntwo\n", &FakeFont).unwrap();
        let texts: Vec<_> = layout.rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["one", "", "two", ""]);
        assert_eq!(layout.rows[0].y, 15.0);
        assert_eq!(layout.rows[1].y, 25.0);
        assert_eq!(layout.rows[2].y, 35.0);
    }

    #[test]
    fn test_wraps_at_last_space() {
        let word = "a".repeat(50);
        let line = format!("{word} {word}");
        let layout = renderer().layout(&line, &FakeFont).unwrap();
        assert_eq!(layout.rows.len(), 2);
        assert_eq!(layout.rows[0].text, word);
        assert_eq!(layout.rows[1].text, word);
    }

    #[test]
    fn test_long_word_breaks_between_characters() {
        let word = "x".repeat(ROW_CAPACITY * 2 + 5);
        let layout = renderer().layout(&word, &FakeFont).unwrap();
        let lens: Vec<_> = layout.rows.iter().map(|r| r.text.len()).collect();
        assert_eq!(lens, [ROW_CAPACITY, ROW_CAPACITY, 5]);
        let joined: String = layout.rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(joined, word);
    }

    #[test]
    fn test_page_break_before_bottom_margin() {
        // Usable height 267mm holds 26 rows of 10mm
        let text = vec!["row"; 27].join("\n");
        let layout = renderer().layout(&text, &FakeFont).unwrap();
        assert_eq!(layout.page_count, 2);
        assert_eq!(layout.rows_on_page(0).count(), 26);
        let first_on_second = layout.rows_on_page(1).next().unwrap();
        assert_eq!(first_on_second.y, 15.0);
        assert!(layout.rows.iter().all(|r| r.y + 10.0 <= A4_HEIGHT_MM - 15.0));
    }

    #[test]
    fn test_control_characters_become_spaces() {
        let layout = renderer().layout("a\tb\r", &FakeFont).unwrap();
        assert_eq!(layout.rows[0].text, "a b");
    }

    #[test]
    fn test_missing_glyph_is_render_error() {
        let err = renderer().layout("bonjour 世界", &FakeFont).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(matches!(err, Error::MissingGlyph { ch: '世', .. }));
    }

    #[test]
    fn test_oversized_line_height_is_rejected() {
        let r = DocumentRenderer::new(RenderOptions {
            line_height: 300.0,
            ..RenderOptions::default()
        });
        let err = r.layout("x", &FakeFont).unwrap_err();
        assert!(matches!(err, Error::LineExceedsPage(_)));
    }

    #[test]
    fn test_oversized_glyph_is_rejected() {
        let r = DocumentRenderer::new(RenderOptions {
            font_size: 2000.0,
            ..RenderOptions::default()
        });
        let err = r.layout("x", &FakeFont).unwrap_err();
        assert!(matches!(err, Error::LineExceedsPage(_)));
    }

    #[test]
    fn test_render_writes_loadable_pdf() {
        let text = vec!["Bonjour le monde"; 40].join("\n");
        let rendered = renderer().render(&text, &FakeFont).unwrap();
        assert!(rendered.bytes().starts_with(b"%PDF-1.7"));
        assert_eq!(rendered.page_count(), 2);

        let doc = Document::load_mem(rendered.bytes()).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_render_is_deterministic() {
        let text = "Déjà vu\n\nencore une fois";
        let a = renderer().render(text, &FakeFont).unwrap();
        let b = renderer().render(text, &FakeFont).unwrap();
        assert_eq!(a.bytes(), b.bytes());
        assert_eq!(a.layout(), b.layout());
    }
}
