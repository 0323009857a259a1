//! Font kinds known to the writer.
//!
//! Fonts are plain descriptions here: which glyphs exist, how wide they are
//! and how text is turned into codes. Tracking which codes a document
//! actually used, and writing the font dictionaries, is done by
//! [`FontDetails`](crate::font_details::FontDetails).

use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

use crate::builtin_metrics::builtin_widths;
use crate::encodings::{symbol_tt_byte, win_ansi_byte, win_ansi_char};
use crate::errors::{PdfError, Result};
use crate::resources::PageResources;
use crate::serialize::format_number;

/// The unscaled metrics of a font, as provided by a [`FontData`] implementation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FontMetrics {
    /// The ascent of the font.
    pub ascent: i16,
    /// The descent of the font.
    pub descent: i16,
    /// The units per em square for this font.
    pub units_per_em: u16,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            ascent: 800,
            descent: -200,
            units_per_em: 1000,
        }
    }
}

impl FontMetrics {
    /// Scales a value in font units to the 1000 unit text space
    pub fn scale(&self, value: i64) -> i64 {
        if self.units_per_em == 0 || self.units_per_em == 1000 {
            value
        } else {
            value * 1000 / i64::from(self.units_per_em)
        }
    }
}

/// The metrics for a glyph provided by a [`FontData`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlyphMetrics {
    /// The width of the glyph, typically the horizontal advance.
    pub width: u32,
    /// The height of the glyph, typically the difference between the ascent and the descent.
    pub height: u32,
}

/// Provides access to the glyphs of a TrueType font.
///
/// pdfbody doesn't parse font files, implement this trait for the font
/// backend of your choice.
pub trait FontData: FontDataClone + std::fmt::Debug {
    /// Returns the unscaled metrics for this font.
    fn font_metrics(&self) -> FontMetrics;

    /// Returns the glyph id for a Unicode code point if it is present in this font.
    fn glyph_id(&self, code_point: u32) -> Option<u16>;

    /// Returns the number of glyphs in this font.
    fn glyph_count(&self) -> u16;

    /// Returns the glyph metrics for a glyph of this font, if available.
    fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics>;
}

/// Helper trait for cloning boxed font data
pub trait FontDataClone {
    /// Clones this font data and returns a box with the cloned data.
    fn clone_font_data(&self) -> Box<dyn FontData>;
}

impl<T: FontData + Clone + 'static> FontDataClone for T {
    fn clone_font_data(&self) -> Box<dyn FontData> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn FontData> {
    fn clone(&self) -> Box<dyn FontData> {
        self.clone_font_data()
    }
}

/// Standard built-in PDF fonts
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinFont {
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierOblique,
    CourierBold,
    CourierBoldOblique,
    Symbol,
    ZapfDingbats,
}

impl BuiltinFont {
    /// PostScript name of the font
    pub fn get_id(&self) -> &'static str {
        use self::BuiltinFont::*;
        match self {
            TimesRoman => "Times-Roman",
            TimesBold => "Times-Bold",
            TimesItalic => "Times-Italic",
            TimesBoldItalic => "Times-BoldItalic",
            Helvetica => "Helvetica",
            HelveticaBold => "Helvetica-Bold",
            HelveticaOblique => "Helvetica-Oblique",
            HelveticaBoldOblique => "Helvetica-BoldOblique",
            Courier => "Courier",
            CourierOblique => "Courier-Oblique",
            CourierBold => "Courier-Bold",
            CourierBoldOblique => "Courier-BoldOblique",
            Symbol => "Symbol",
            ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Symbol and ZapfDingbats carry their own encoding
    pub fn is_symbolic(&self) -> bool {
        matches!(self, BuiltinFont::Symbol | BuiltinFont::ZapfDingbats)
    }
}

/// Encoding of a single-byte font
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimpleEncoding {
    /// `/WinAnsiEncoding`
    WinAnsi,
    /// The font's built-in encoding, text is pre-encoded with "symboltt"
    FontSpecific,
}

impl SimpleEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            SimpleEncoding::WinAnsi => "WinAnsi",
            SimpleEncoding::FontSpecific => "symboltt",
        }
    }

    pub fn encode(&self, c: char) -> Option<u8> {
        match self {
            SimpleEncoding::WinAnsi => win_ansi_byte(c),
            SimpleEncoding::FontSpecific => symbol_tt_byte(c),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SimpleSubtype {
    Type1,
    TrueType,
}

/// A font with one byte per character (Type1 or TrueType)
#[derive(Debug, Clone)]
pub struct SimpleFont {
    pub(crate) base_font: String,
    pub(crate) subtype: SimpleSubtype,
    pub(crate) encoding: SimpleEncoding,
    /// Width per code in 1000 units of text space. Only Symbol and
    /// ZapfDingbats go without, they are written without a used range.
    pub(crate) widths: Option<Box<[u32; 256]>>,
    pub(crate) builtin: bool,
    pub(crate) metrics: FontMetrics,
    /// Embedded as `/FontFile2`
    pub(crate) font_program: Option<Vec<u8>>,
}

impl SimpleFont {
    /// One of the 14 standard fonts, not embedded
    pub fn builtin(font: BuiltinFont) -> Self {
        let encoding = if font.is_symbolic() {
            SimpleEncoding::FontSpecific
        } else {
            SimpleEncoding::WinAnsi
        };
        Self {
            base_font: font.get_id().to_string(),
            subtype: SimpleSubtype::Type1,
            encoding,
            widths: builtin_widths(font).map(Box::new),
            builtin: true,
            metrics: FontMetrics::default(),
            font_program: None,
        }
    }

    /// A WinAnsi encoded TrueType font. The widths of all 256 codes are
    /// looked up through `data`, `font_program` is embedded if given.
    pub fn true_type(name: &str, data: &dyn FontData, font_program: Option<Vec<u8>>) -> Self {
        let metrics = data.font_metrics();
        let mut widths = Box::new([0u32; 256]);
        for (code, width) in widths.iter_mut().enumerate() {
            let glyph = win_ansi_char(code as u8)
                .and_then(|c| data.glyph_id(c as u32))
                .and_then(|gid| data.glyph_metrics(gid));
            if let Some(glyph) = glyph {
                *width = metrics.scale(i64::from(glyph.width)).max(0) as u32;
            }
        }
        Self {
            base_font: name.to_string(),
            subtype: SimpleSubtype::TrueType,
            encoding: SimpleEncoding::WinAnsi,
            widths: Some(widths),
            builtin: false,
            metrics,
            font_program,
        }
    }

    pub fn with_encoding(mut self, encoding: SimpleEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Replaces the widths of all 256 codes
    pub fn with_widths(mut self, widths: [u32; 256]) -> Self {
        self.widths = Some(Box::new(widths));
        self
    }

    pub fn width(&self, code: u8) -> u32 {
        self.widths.as_ref().map(|w| w[usize::from(code)]).unwrap_or(0)
    }

    pub fn encoding(&self) -> SimpleEncoding {
        self.encoding
    }
}

/// A CJK font using a predefined CMap (`UniGB-UCS2-H`, ...) or `Identity-H`
#[derive(Debug, Clone)]
pub struct CjkFont {
    pub(crate) name: String,
    pub(crate) cmap: String,
    pub(crate) registry: String,
    pub(crate) ordering: String,
    pub(crate) supplement: i64,
    pub(crate) cids: BTreeMap<char, u16>,
    /// Widths that differ from the default of 1000
    pub(crate) widths: BTreeMap<u16, u32>,
    pub(crate) metrics: FontMetrics,
}

impl CjkFont {
    pub fn new(name: &str, cmap: &str, registry: &str, ordering: &str, supplement: i64) -> Self {
        Self {
            name: name.to_string(),
            cmap: cmap.to_string(),
            registry: registry.to_string(),
            ordering: ordering.to_string(),
            supplement,
            cids: BTreeMap::new(),
            widths: BTreeMap::new(),
            metrics: FontMetrics::default(),
        }
    }

    /// Maps `c` to `cid`. Widths of 1000 are the default and not stored.
    pub fn add_cid(&mut self, c: char, cid: u16, width: u32) {
        self.cids.insert(c, cid);
        if width != 1000 {
            self.widths.insert(cid, width);
        }
    }

    pub fn with_metrics(mut self, metrics: FontMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cid(&self, c: char) -> Option<u16> {
        self.cids.get(&c).copied()
    }

    pub fn width(&self, cid: u16) -> u32 {
        self.widths.get(&cid).copied().unwrap_or(1000)
    }

    /// `Identity-H` / `Identity-V` take CIDs directly
    pub fn is_identity(&self) -> bool {
        self.cmap.starts_with("Identity-")
    }
}

/// A glyph of a Type3 font
#[derive(Debug, Clone, PartialEq)]
pub struct Type3Glyph {
    pub width: u32,
    /// `[llx lly urx ury]`
    pub bbox: [f64; 4],
    /// Glyph procedure, starting with the `d0` / `d1` operator
    pub(crate) content: Vec<u8>,
}

/// A font with glyphs drawn by content streams
#[derive(Debug, Clone)]
pub struct Type3Font {
    pub(crate) name: String,
    /// Colorized glyphs set their own colors (`d0`), uncolored glyphs are
    /// stencils (`d1`)
    pub(crate) colorized: bool,
    pub(crate) glyphs: BTreeMap<u8, Type3Glyph>,
    pub(crate) resources: PageResources,
}

impl Type3Font {
    pub fn new(name: &str, colorized: bool) -> Self {
        Self {
            name: name.to_string(),
            colorized,
            glyphs: BTreeMap::new(),
            resources: PageResources::new(),
        }
    }

    /// Defines the glyph for `c`, which has to be in `1..=255`.
    /// `content` is the glyph's drawing, the `d0` / `d1` operator is added
    /// in front of it.
    pub fn define_glyph(&mut self, c: char, width: u32, bbox: [f64; 4], content: &[u8]) -> Result<()> {
        let code = match u32::from(c) {
            code @ 1..=255 => code as u8,
            code => {
                return Err(PdfError::UnencodableCharacter {
                    font: self.name.clone(),
                    encoding: "Type3",
                    codepoint: code,
                })
            }
        };
        let header = if self.colorized {
            format!("{width} 0 d0\n")
        } else {
            let [llx, lly, urx, ury] = bbox;
            format!(
                "{width} 0 {} {} {} {} d1\n",
                format_number(llx),
                format_number(lly),
                format_number(urx),
                format_number(ury)
            )
        };
        let mut procedure = header.into_bytes();
        procedure.extend_from_slice(content);
        self.glyphs.insert(
            code,
            Type3Glyph {
                width,
                bbox,
                content: procedure,
            },
        );
        Ok(())
    }

    pub fn glyph(&self, c: char) -> Option<&Type3Glyph> {
        u8::try_from(u32::from(c))
            .ok()
            .and_then(|code| self.glyphs.get(&code))
    }

    /// Resources used by the glyph procedures
    pub fn resources_mut(&mut self) -> &mut PageResources {
        &mut self.resources
    }

    /// Union of all glyph boxes, zero for colorized fonts
    pub fn font_bbox(&self) -> [f64; 4] {
        if self.colorized || self.glyphs.is_empty() {
            return [0.0; 4];
        }
        self.glyphs.values().fold(
            [f64::MAX, f64::MAX, f64::MIN, f64::MIN],
            |[llx, lly, urx, ury], glyph| {
                [
                    llx.min(glyph.bbox[0]),
                    lly.min(glyph.bbox[1]),
                    urx.max(glyph.bbox[2]),
                    ury.max(glyph.bbox[3]),
                ]
            },
        )
    }
}

/// A TrueType font addressed by glyph id (`Identity-H`), able to show any
/// character the font has a glyph for
#[derive(Debug, Clone)]
pub struct TrueTypeUnicodeFont {
    pub(crate) name: String,
    pub(crate) data: Box<dyn FontData>,
    pub(crate) font_program: Option<Vec<u8>>,
    /// Symbolic fonts are looked up through the "symboltt" encoding
    pub(crate) symbolic: bool,
}

impl TrueTypeUnicodeFont {
    pub fn new(name: &str, data: Box<dyn FontData>, font_program: Option<Vec<u8>>) -> Self {
        Self {
            name: name.to_string(),
            data,
            font_program,
            symbolic: false,
        }
    }

    pub fn symbolic(mut self, symbolic: bool) -> Self {
        self.symbolic = symbolic;
        self
    }

    /// Glyph id and width (1000 units) for a code point
    pub fn glyph(&self, code_point: u32) -> Option<(u16, u32)> {
        let gid = self.data.glyph_id(code_point)?;
        let width = self
            .data
            .glyph_metrics(gid)
            .map(|m| self.data.font_metrics().scale(i64::from(m.width)).max(0) as u32)
            .unwrap_or(0);
        Some((gid, width))
    }

    /// Glyph for a byte of the symbolic pre-encoding. Symbol fonts usually map
    /// their codes to the private use page `U+F0xx`.
    pub fn symbol_glyph(&self, byte: u8) -> Option<(u16, u32)> {
        self.glyph(0xF000 | u32::from(byte))
            .or_else(|| self.glyph(u32::from(byte)))
    }

    pub fn metrics(&self) -> FontMetrics {
        self.data.font_metrics()
    }
}

/// The four kinds of fonts the writer can track usage for
#[derive(Debug, Clone)]
pub enum PdfFont {
    Simple(SimpleFont),
    Cjk(CjkFont),
    Type3(Type3Font),
    TrueTypeUnicode(TrueTypeUnicodeFont),
}

impl PdfFont {
    /// `/BaseFont` name (or the Type3 font's own name)
    pub fn name(&self) -> &str {
        match self {
            PdfFont::Simple(f) => &f.base_font,
            PdfFont::Cjk(f) => &f.name,
            PdfFont::Type3(f) => &f.name,
            PdfFont::TrueTypeUnicode(f) => &f.name,
        }
    }
}

impl From<BuiltinFont> for PdfFont {
    fn from(font: BuiltinFont) -> Self {
        PdfFont::Simple(SimpleFont::builtin(font))
    }
}

impl From<SimpleFont> for PdfFont {
    fn from(font: SimpleFont) -> Self {
        PdfFont::Simple(font)
    }
}

impl From<CjkFont> for PdfFont {
    fn from(font: CjkFont) -> Self {
        PdfFont::Cjk(font)
    }
}

impl From<Type3Font> for PdfFont {
    fn from(font: Type3Font) -> Self {
        PdfFont::Type3(font)
    }
}

impl From<TrueTypeUnicodeFont> for PdfFont {
    fn from(font: TrueTypeUnicodeFont) -> Self {
        PdfFont::TrueTypeUnicode(font)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_fonts() {
        let font = SimpleFont::builtin(BuiltinFont::HelveticaBold);
        assert_eq!(font.base_font, "Helvetica-Bold");
        assert_eq!(font.encoding(), SimpleEncoding::WinAnsi);
        assert_eq!(font.width(65), 722);
        let font = SimpleFont::builtin(BuiltinFont::ZapfDingbats);
        assert_eq!(font.encoding(), SimpleEncoding::FontSpecific);
        assert_eq!(font.width(65), 0);
    }

    #[test]
    fn type3_glyph_range() {
        let mut font = Type3Font::new("Shapes", false);
        font.define_glyph('a', 500, [0.0, 0.0, 500.0, 700.0], b"0 0 500 700 re f")
            .unwrap();
        font.define_glyph('b', 600, [-10.0, -5.0, 400.0, 800.0], b"").unwrap();
        assert!(font.define_glyph('\u{0}', 1, [0.0; 4], b"").is_err());
        assert!(font.define_glyph('中', 1, [0.0; 4], b"").is_err());

        let glyph = font.glyph('a').unwrap();
        assert_eq!(
            String::from_utf8(glyph.content.clone()).unwrap(),
            "500 0 0 0 500 700 d1\n0 0 500 700 re f"
        );
        assert_eq!(font.font_bbox(), [-10.0, -5.0, 500.0, 800.0]);
    }

    #[test]
    fn colorized_type3_uses_d0() {
        let mut font = Type3Font::new("Color", true);
        font.define_glyph('x', 250, [0.0, 0.0, 1.0, 1.0], b"").unwrap();
        assert_eq!(font.glyph('x').unwrap().content, b"250 0 d0\n".to_vec());
        assert_eq!(font.font_bbox(), [0.0; 4]);
    }

    #[test]
    fn cjk_lookup() {
        let mut font = CjkFont::new("STSong-Light", "UniGB-UCS2-H", "Adobe", "GB1", 4);
        font.add_cid('中', 4559, 1000);
        font.add_cid('a', 66, 500);
        assert_eq!(font.cid('中'), Some(4559));
        assert_eq!(font.width(4559), 1000);
        assert_eq!(font.width(66), 500);
        assert!(!font.is_identity());
    }
}
