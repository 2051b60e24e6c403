//! Unicode TrueType fonts for the rendered document.
//!
//! Rendered text uses a composite font so that any character the font
//! covers can be written:
//! - **Type0 font** with `Identity-H` encoding (two-byte glyph ids)
//!   - **CIDFontType2** with a `W` array for the glyphs actually used
//!     - **FontDescriptor** pointing at the embedded **FontFile2** program
//!   - **ToUnicode CMap** mapping glyph ids back to characters, so text in
//!     the output stays searchable and copyable

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::{Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId, name_id};

use crate::error::{Error, Result};

/// Global metrics in font design units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub ascent: i16,
    pub descent: i16,
    pub cap_height: i16,
    /// `[x_min, y_min, x_max, y_max]`
    pub bbox: [i16; 4],
}

/// A font able to map Unicode characters to glyphs.
///
/// The renderer only needs glyph lookup, advances and the raw program to
/// embed, which keeps layout testable with synthetic fonts.
pub trait UnicodeFont: Send + Sync {
    /// PostScript name, used as the PDF `BaseFont`
    fn name(&self) -> &str;

    /// Glyph for `c`, `None` if the font does not cover it
    fn glyph_id(&self, c: char) -> Option<u16>;

    /// Horizontal advance of a glyph in font units
    fn advance(&self, glyph_id: u16) -> u16;

    fn units_per_em(&self) -> u16;

    fn metrics(&self) -> FontMetrics;

    /// TrueType program bytes embedded as `FontFile2`
    fn program(&self) -> &[u8];
}

/// A parsed TrueType font.
///
/// The cmap and advances are copied out of the face at load time, so the
/// struct owns its data and can be shared across requests.
pub struct TrueTypeFont {
    name: String,
    data: Vec<u8>,
    glyphs: HashMap<char, u16>,
    advances: Vec<u16>,
    units_per_em: u16,
    metrics: FontMetrics,
}

impl TrueTypeFont {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let (name, glyphs, advances, units_per_em, metrics) = {
            let face = Face::parse(&data, 0)
                .map_err(|e| Error::FontLoad(format!("failed to parse font: {e}")))?;

            let mut glyphs = HashMap::new();
            if let Some(cmap) = face.tables().cmap {
                for subtable in cmap.subtables {
                    if !subtable.is_unicode() {
                        continue;
                    }
                    subtable.codepoints(|codepoint| {
                        if let (Some(c), Some(gid)) =
                            (char::from_u32(codepoint), subtable.glyph_index(codepoint))
                        {
                            glyphs.entry(c).or_insert(gid.0);
                        }
                    });
                }
            }
            if glyphs.is_empty() {
                return Err(Error::FontLoad("font has no Unicode cmap".to_string()));
            }

            let advances = (0..face.number_of_glyphs())
                .map(|gid| face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0))
                .collect::<Vec<_>>();

            let name = face
                .names()
                .into_iter()
                .filter(|n| n.name_id == name_id::POST_SCRIPT_NAME)
                .find_map(|n| n.to_string())
                .map_or_else(|| "UnicodeFont".to_string(), |n| sanitize_name(&n));

            let bbox = face.global_bounding_box();
            let metrics = FontMetrics {
                ascent: face.ascender(),
                descent: face.descender(),
                cap_height: face.capital_height().unwrap_or_else(|| face.ascender()),
                bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            };

            (name, glyphs, advances, face.units_per_em(), metrics)
        };

        Ok(Self {
            name,
            data,
            glyphs,
            advances,
            units_per_em,
            metrics,
        })
    }

    /// Number of characters the font covers
    pub fn coverage(&self) -> usize {
        self.glyphs.len()
    }
}

impl UnicodeFont for TrueTypeFont {
    fn name(&self) -> &str {
        &self.name
    }

    fn glyph_id(&self, c: char) -> Option<u16> {
        self.glyphs.get(&c).copied()
    }

    fn advance(&self, glyph_id: u16) -> u16 {
        self.advances
            .get(usize::from(glyph_id))
            .copied()
            .unwrap_or(0)
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn program(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("glyphs", &self.glyphs.len())
            .field("units_per_em", &self.units_per_em)
            .finish_non_exhaustive()
    }
}

/// Load a TrueType font from disk.
///
/// Any read or parse failure is reported as a render error.
pub fn load_unicode_font(path: impl AsRef<Path>) -> Result<Arc<dyn UnicodeFont>> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| Error::FontLoad(format!("{}: {e}", path.display())))?;
    let font = TrueTypeFont::from_bytes(data).map_err(|e| match e {
        Error::FontLoad(reason) => Error::FontLoad(format!("{}: {reason}", path.display())),
        other => other,
    })?;
    Ok(Arc::new(font))
}

/// Where the renderer gets its font from
#[derive(Clone)]
pub enum FontSource {
    /// TrueType file read on every use
    File(PathBuf),
    /// Font parsed once and shared
    Loaded(Arc<dyn UnicodeFont>),
}

impl FontSource {
    pub fn load(&self) -> Result<Arc<dyn UnicodeFont>> {
        match self {
            Self::File(path) => load_unicode_font(path),
            Self::Loaded(font) => Ok(Arc::clone(font)),
        }
    }

    /// Parse a file source now, so later requests skip the disk
    pub fn preload(self) -> Result<Self> {
        match self {
            Self::File(path) => load_unicode_font(path).map(Self::Loaded),
            loaded @ Self::Loaded(_) => Ok(loaded),
        }
    }
}

impl std::fmt::Debug for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Loaded(font) => f.debug_tuple("Loaded").field(&font.name()).finish(),
        }
    }
}

/// PDF names cannot hold whitespace or delimiters
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "UnicodeFont".to_string()
    } else {
        cleaned
    }
}

/// Scale a font-unit width to PDF's 1000-unit glyph space
fn scale_width(font: &dyn UnicodeFont, width: u16) -> i64 {
    let units_per_em = i64::from(font.units_per_em().max(1));
    (i64::from(width) * 1000) / units_per_em
}

/// Encode text as big-endian two-byte glyph ids for an `Identity-H` font.
///
/// Characters the font lacks are reported, never replaced by `.notdef`.
pub fn encode_glyphs(font: &dyn UnicodeFont, text: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    for c in text.chars() {
        let gid = font.glyph_id(c).ok_or_else(|| Error::MissingGlyph {
            font: font.name().to_string(),
            ch: c,
        })?;
        bytes.extend_from_slice(&gid.to_be_bytes());
    }
    Ok(bytes)
}

/// Build the `W` array: `[gid [w1 w2 ...]]` for each run of consecutive ids
fn build_widths_array(font: &dyn UnicodeFont, used: &BTreeMap<u16, char>) -> Vec<Object> {
    let mut result = Vec::new();
    let mut iter = used.keys().copied().peekable();

    while let Some(first_gid) = iter.next() {
        let mut widths = vec![Object::Integer(scale_width(font, font.advance(first_gid)))];
        let mut expected_next = first_gid.checked_add(1);

        while let Some(&gid) = iter.peek() {
            if Some(gid) != expected_next {
                break;
            }
            widths.push(Object::Integer(scale_width(font, font.advance(gid))));
            expected_next = gid.checked_add(1);
            iter.next();
        }

        result.push(Object::Integer(i64::from(first_gid)));
        result.push(Object::Array(widths));
    }

    result
}

/// ToUnicode CMap with one `bfchar` entry per used glyph
fn build_to_unicode_cmap(used: &BTreeMap<u16, char>) -> Vec<u8> {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<_> = used.iter().collect();
    // bfchar sections hold at most 100 entries
    for block in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", block.len());
        for (gid, c) in block {
            let mut units = [0u16; 2];
            let utf16 = c.encode_utf16(&mut units);
            let hex = utf16.iter().fold(String::new(), |mut acc, unit| {
                let _ = write!(acc, "{unit:04X}");
                acc
            });
            let _ = writeln!(cmap, "<{gid:04X}> <{hex}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}

/// Embed `font` into `doc` and return the Type0 font object.
///
/// `used` maps each glyph id written by the content streams to the
/// character it was produced from.
pub fn embed_font(doc: &mut Document, font: &dyn UnicodeFont, used: &BTreeMap<u16, char>) -> ObjectId {
    let program = font.program();
    let mut file_dict = lopdf::Dictionary::new();
    file_dict.set(
        "Length1",
        Object::Integer(i64::try_from(program.len()).unwrap_or(i64::MAX)),
    );
    let font_file_id = doc.add_object(Object::Stream(
        Stream::new(file_dict, program.to_vec()).with_compression(true),
    ));

    let name = font.name().as_bytes().to_vec();
    let metrics = font.metrics();

    let descriptor_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"FontDescriptor".to_vec())),
        ("FontName", Object::Name(name.clone())),
        ("Flags", Object::Integer(32)), // Nonsymbolic
        (
            "FontBBox",
            Object::Array(metrics.bbox.iter().map(|v| Object::Integer(i64::from(*v))).collect()),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", Object::Integer(i64::from(metrics.ascent))),
        ("Descent", Object::Integer(i64::from(metrics.descent))),
        ("CapHeight", Object::Integer(i64::from(metrics.cap_height))),
        ("StemV", Object::Integer(80)),
        ("FontFile2", Object::Reference(font_file_id)),
    ]));

    let default_width = font
        .glyph_id(' ')
        .map_or(1000, |gid| scale_width(font, font.advance(gid)));

    let cid_font_id = doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
        ("BaseFont", Object::Name(name.clone())),
        (
            "CIDSystemInfo",
            Object::Dictionary(lopdf::Dictionary::from_iter([
                ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                ("Supplement", Object::Integer(0)),
            ])),
        ),
        ("FontDescriptor", Object::Reference(descriptor_id)),
        ("DW", Object::Integer(default_width)),
        ("W", Object::Array(build_widths_array(font, used))),
        ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
    ]));

    let to_unicode_id = doc.add_object(Object::Stream(
        Stream::new(lopdf::Dictionary::new(), build_to_unicode_cmap(used)).with_compression(true),
    ));

    doc.add_object(lopdf::Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type0".to_vec())),
        ("BaseFont", Object::Name(name)),
        ("Encoding", Object::Name(b"Identity-H".to_vec())),
        ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
        ("ToUnicode", Object::Reference(to_unicode_id)),
    ]))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Monospace font covering ASCII letters, digits, space and punctuation.
    /// Every glyph is 500 units wide on a 1000-unit em.
    pub(crate) struct FakeFont;

    impl UnicodeFont for FakeFont {
        fn name(&self) -> &str {
            "FakeMono"
        }

        fn glyph_id(&self, c: char) -> Option<u16> {
            (c.is_ascii_graphic() || c == ' ' || "éèàçù".contains(c))
                .then_some(u16::try_from(u32::from(c)).unwrap_or(0))
        }

        fn advance(&self, _glyph_id: u16) -> u16 {
            500
        }

        fn units_per_em(&self) -> u16 {
            1000
        }

        fn metrics(&self) -> FontMetrics {
            FontMetrics {
                ascent: 800,
                descent: -200,
                cap_height: 700,
                bbox: [0, -200, 500, 800],
            }
        }

        fn program(&self) -> &[u8] {
            &[]
        }
    }

    #[test]
    fn test_encode_glyphs() {
        assert_eq!(encode_glyphs(&FakeFont, "AB").unwrap(), vec![0x00, 0x41, 0x00, 0x42]);
        let err = encode_glyphs(&FakeFont, "A中").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(matches!(err, Error::MissingGlyph { ch: '中', .. }));
    }

    #[test]
    fn test_widths_array_groups_runs() {
        let used: BTreeMap<u16, char> = [(65, 'A'), (66, 'B'), (67, 'C'), (70, 'F')]
            .into_iter()
            .collect();
        let w = build_widths_array(&FakeFont, &used);
        assert_eq!(w.len(), 4);
        assert!(matches!(w[0], Object::Integer(65)));
        match &w[1] {
            Object::Array(widths) => {
                assert_eq!(widths.len(), 3);
                assert!(widths.iter().all(|o| matches!(o, Object::Integer(500))));
            }
            other => panic!("expected widths array, got {other:?}"),
        }
        assert!(matches!(w[2], Object::Integer(70)));
    }

    #[test]
    fn test_to_unicode_lists_used_glyphs() {
        let used: BTreeMap<u16, char> = [(0x41, 'A'), (0xE9, 'é')].into_iter().collect();
        let cmap = String::from_utf8(build_to_unicode_cmap(&used)).unwrap();
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0041> <0041>"));
        assert!(cmap.contains("<00E9> <00E9>"));
    }

    #[test]
    fn test_to_unicode_splits_large_sets() {
        let used: BTreeMap<u16, char> = (0x21u16..0x21 + 150)
            .map(|gid| (gid, char::from_u32(u32::from(gid)).unwrap()))
            .collect();
        let cmap = String::from_utf8(build_to_unicode_cmap(&used)).unwrap();
        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("50 beginbfchar"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("DejaVu Sans"), "DejaVuSans");
        assert_eq!(sanitize_name("   "), "UnicodeFont");
    }

    #[test]
    fn test_parse_garbage_font() {
        let err = TrueTypeFont::from_bytes(b"not a font".to_vec()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
    }

    #[test]
    fn test_font_source_passes_loaded_font_through() {
        let source = FontSource::Loaded(Arc::new(FakeFont));
        assert_eq!(source.load().unwrap().name(), "FakeMono");
        assert!(FontSource::File("/nonexistent.ttf".into()).preload().is_err());
    }

    #[test]
    fn test_missing_font_file() {
        let err = load_unicode_font("/nonexistent/DejaVuSans.ttf").err().unwrap();
        assert!(matches!(err, Error::FontLoad(_)));
    }
}
