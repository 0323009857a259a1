//! Per-document font usage.
//!
//! Every time text is shown with a font, the codes it turns into are recorded
//! here. When the document is finished the recorded usage decides what ends
//! up in the font dictionary: the `/FirstChar`..`/LastChar` range of simple
//! fonts, the CIDs of CJK fonts and the glyphs of Unicode TrueType fonts.
//! Usage only grows, and once the font is written it is frozen.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{Dictionary as LoDictionary, Object, StringFormat};
use smallvec::SmallVec;

use crate::contents::{flate_stream, number};
use crate::encodings::{differences, glyph_name_or_synthetic, symbol_tt_byte, to_unicode_hex};
use crate::errors::{PdfError, Result};
use crate::font::{
    CjkFont, FontMetrics, PdfFont, SimpleEncoding, SimpleFont, SimpleSubtype, TrueTypeUnicodeFont,
    Type3Font,
};
use crate::indirect::ObjectTable;
use crate::ObjectId;

/// A glyph of a Unicode TrueType font that was shown at least once
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UsedGlyph {
    pub glyph_id: u16,
    /// Width in 1000 units of text space
    pub width: u32,
    /// The code point that first resolved to this glyph
    pub unicode: u32,
}

/// What a written font is made of, computed from the recorded usage
#[derive(Debug, Clone, PartialEq)]
pub enum FontSubset {
    Simple {
        first_char: u8,
        last_char: u8,
        /// One entry per code in `first_char..=last_char`, 0 for unused codes
        widths: Vec<u32>,
    },
    Cjk {
        cids: Vec<u16>,
        /// `/W` array
        widths: Vec<Object>,
    },
    Type3 {
        first_char: u8,
        last_char: u8,
        widths: Vec<u32>,
        differences: Vec<Object>,
        /// Glyph name and code of every glyph procedure
        char_procs: Vec<(String, u8)>,
    },
    TrueTypeUnicode {
        /// Sorted by glyph id
        glyphs: Vec<UsedGlyph>,
        /// `/W` array
        widths: Vec<Object>,
        differences: Vec<Object>,
    },
}

#[derive(Debug, Clone)]
enum FontState {
    Simple {
        font: SimpleFont,
        used: Box<[bool; 256]>,
    },
    Cjk {
        font: CjkFont,
        cids: BTreeSet<u16>,
    },
    /// Type3 fonts only accept defined glyphs and write all of them
    Type3 { font: Type3Font },
    TrueTypeUnicode {
        font: TrueTypeUnicodeFont,
        glyphs: BTreeMap<u16, UsedGlyph>,
    },
}

/// Codes resolved by `FontDetails::encode`, recorded on commit
enum Usage {
    /// The encoded bytes themselves
    Codes,
    Cids(SmallVec<[u16; 32]>),
    Defined,
    Glyphs(SmallVec<[UsedGlyph; 32]>),
}

/// A font registered with a document: where it will be written, the name
/// pages reference it by, and which of its codes were used
#[derive(Debug, Clone)]
pub struct FontDetails {
    id: ObjectId,
    resource_name: String,
    state: FontState,
    written: bool,
}

impl FontDetails {
    /// `id` is the (allocated, not yet written) object of the font dictionary
    pub fn new(id: ObjectId, resource_name: &str, font: PdfFont) -> Self {
        let state = match font {
            PdfFont::Simple(font) => FontState::Simple {
                font,
                used: Box::new([false; 256]),
            },
            PdfFont::Cjk(font) => FontState::Cjk {
                font,
                cids: BTreeSet::new(),
            },
            PdfFont::Type3(font) => FontState::Type3 { font },
            PdfFont::TrueTypeUnicode(font) => FontState::TrueTypeUnicode {
                font,
                glyphs: BTreeMap::new(),
            },
        };
        Self {
            id,
            resource_name: resource_name.to_string(),
            state,
            written: false,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn name(&self) -> &str {
        match &self.state {
            FontState::Simple { font, .. } => &font.base_font,
            FontState::Cjk { font, .. } => &font.name,
            FontState::Type3 { font } => &font.name,
            FontState::TrueTypeUnicode { font, .. } => &font.name,
        }
    }

    pub fn is_written(&self) -> bool {
        self.written
    }

    /// Whether any text was shown with this font. Type3 fonts always count
    /// as used.
    pub fn is_used(&self) -> bool {
        match &self.state {
            FontState::Simple { used, .. } => used.iter().any(|u| *u),
            FontState::Cjk { cids, .. } => !cids.is_empty(),
            FontState::Type3 { .. } => true,
            FontState::TrueTypeUnicode { glyphs, .. } => !glyphs.is_empty(),
        }
    }

    /// Converts `text` to the bytes a content stream shows with this font
    /// and records the codes as used. Fails without recording anything if a
    /// character can't be encoded.
    pub fn record_usage(&mut self, text: &str) -> Result<Vec<u8>> {
        if self.written {
            return Err(PdfError::FontAlreadyWritten(self.name().to_string()));
        }
        let (bytes, usage) = self.encode(text)?;
        match (&mut self.state, usage) {
            (FontState::Simple { used, .. }, Usage::Codes) => {
                for b in &bytes {
                    used[usize::from(*b)] = true;
                }
            }
            (FontState::Cjk { cids, .. }, Usage::Cids(found)) => cids.extend(found),
            (FontState::TrueTypeUnicode { glyphs, .. }, Usage::Glyphs(resolved)) => {
                for glyph in resolved {
                    // the first code point seen for a glyph is kept
                    glyphs.entry(glyph.glyph_id).or_insert(glyph);
                }
            }
            _ => {}
        }
        Ok(bytes)
    }

    /// Converts `text` like [`FontDetails::record_usage`] without recording
    /// anything
    pub fn encode_text(&self, text: &str) -> Result<Vec<u8>> {
        self.encode(text).map(|(bytes, _)| bytes)
    }

    fn encode(&self, text: &str) -> Result<(Vec<u8>, Usage)> {
        match &self.state {
            FontState::Simple { font, .. } => {
                let bytes = text
                    .chars()
                    .map(|c| {
                        font.encoding.encode(c).ok_or_else(|| PdfError::UnencodableCharacter {
                            font: font.base_font.clone(),
                            encoding: font.encoding.name(),
                            codepoint: u32::from(c),
                        })
                    })
                    .collect::<Result<Vec<u8>>>()?;
                Ok((bytes, Usage::Codes))
            }
            FontState::Cjk { font, .. } => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                let mut found = SmallVec::<[u16; 32]>::new();
                for c in text.chars() {
                    let cid = font.cid(c).ok_or_else(|| PdfError::GlyphNotFound {
                        font: font.name.clone(),
                        codepoint: u32::from(c),
                    })?;
                    let code = if font.is_identity() {
                        cid
                    } else {
                        u16::try_from(u32::from(c)).map_err(|_| PdfError::UnencodableCharacter {
                            font: font.name.clone(),
                            encoding: "UCS-2",
                            codepoint: u32::from(c),
                        })?
                    };
                    bytes.extend_from_slice(&code.to_be_bytes());
                    found.push(cid);
                }
                Ok((bytes, Usage::Cids(found)))
            }
            FontState::Type3 { font } => {
                let bytes = text
                    .chars()
                    .map(|c| match font.glyph(c) {
                        Some(_) => Ok(u32::from(c) as u8),
                        None => Err(PdfError::Type3GlyphNotDefined {
                            font: font.name.clone(),
                            codepoint: u32::from(c),
                        }),
                    })
                    .collect::<Result<Vec<u8>>>()?;
                Ok((bytes, Usage::Defined))
            }
            FontState::TrueTypeUnicode { font, .. } => {
                let mut resolved = SmallVec::<[UsedGlyph; 32]>::new();
                for c in text.chars() {
                    let unicode = u32::from(c);
                    let glyph = if font.symbolic {
                        let byte = symbol_tt_byte(c).ok_or_else(|| PdfError::UnencodableCharacter {
                            font: font.name.clone(),
                            encoding: SimpleEncoding::FontSpecific.name(),
                            codepoint: unicode,
                        })?;
                        font.symbol_glyph(byte)
                    } else {
                        font.glyph(unicode)
                    };
                    let (glyph_id, width) = glyph.ok_or_else(|| PdfError::GlyphNotFound {
                        font: font.name.clone(),
                        codepoint: unicode,
                    })?;
                    resolved.push(UsedGlyph {
                        glyph_id,
                        width,
                        unicode,
                    });
                }
                let mut bytes = Vec::with_capacity(resolved.len() * 2);
                for glyph in &resolved {
                    bytes.extend_from_slice(&glyph.glyph_id.to_be_bytes());
                }
                Ok((bytes, Usage::Glyphs(resolved)))
            }
        }
    }

    /// Like [`FontDetails::record_usage`] for UTF-16 text. Surrogate pairs
    /// are combined into one code point, unpaired surrogates are rejected.
    pub fn record_usage_utf16(&mut self, text: &[u16]) -> Result<Vec<u8>> {
        let text = char::decode_utf16(text.iter().copied())
            .collect::<std::result::Result<String, _>>()
            .map_err(|e| PdfError::UnencodableCharacter {
                font: self.name().to_string(),
                encoding: "UTF-16",
                codepoint: u32::from(e.unpaired_surrogate()),
            })?;
        self.record_usage(&text)
    }

    /// The subset the font would be written with right now
    pub fn subset(&self) -> Result<FontSubset> {
        match &self.state {
            FontState::Simple { font, used } => {
                let first = used.iter().position(|u| *u);
                let last = used.iter().rposition(|u| *u);
                let (first_char, last_char) = match (first, last) {
                    (Some(first), Some(last)) => (first as u8, last as u8),
                    _ => {
                        tracing::warn!(font = %font.base_font, "font was never used, writing an empty range");
                        (255, 255)
                    }
                };
                let widths = (first_char..=last_char)
                    .map(|code| if used[usize::from(code)] { font.width(code) } else { 0 })
                    .collect();
                Ok(FontSubset::Simple {
                    first_char,
                    last_char,
                    widths,
                })
            }
            FontState::Cjk { font, cids } => Ok(FontSubset::Cjk {
                cids: cids.iter().copied().collect(),
                widths: width_array(cids.iter().map(|cid| (*cid, font.width(*cid)))),
            }),
            FontState::Type3 { font } => {
                let (Some(first_char), Some(last_char)) =
                    (font.glyphs.keys().next().copied(), font.glyphs.keys().next_back().copied())
                else {
                    return Err(PdfError::NoGlyphsDefined(font.name.clone()));
                };
                let widths = (first_char..=last_char)
                    .map(|code| font.glyphs.get(&code).map_or(0, |g| g.width))
                    .collect();
                let codes = font.glyphs.keys().map(|c| (u32::from(*c), u32::from(*c)));
                Ok(FontSubset::Type3 {
                    first_char,
                    last_char,
                    widths,
                    differences: differences(codes),
                    char_procs: font
                        .glyphs
                        .keys()
                        .map(|c| (glyph_name_or_synthetic(u32::from(*c)), *c))
                        .collect(),
                })
            }
            FontState::TrueTypeUnicode { glyphs, .. } => {
                let glyphs = glyphs.values().copied().collect::<Vec<_>>();
                Ok(FontSubset::TrueTypeUnicode {
                    widths: width_array(glyphs.iter().map(|g| (g.glyph_id, g.width))),
                    differences: differences(
                        glyphs.iter().map(|g| (u32::from(g.glyph_id), g.unicode)),
                    ),
                    glyphs,
                })
            }
        }
    }

    /// Writes the font dictionary (to [`FontDetails::id`]) and everything it
    /// references. Afterwards the usage is frozen.
    pub fn write_font(&mut self, table: &mut ObjectTable, compression: Option<u32>) -> Result<()> {
        if self.written {
            return Err(PdfError::FontAlreadyWritten(self.name().to_string()));
        }
        let subset = self.subset()?;
        tracing::debug!(font = %self.name(), id = ?self.id, "writing font");

        let dict = match (&self.state, subset) {
            (
                FontState::Simple { font, .. },
                FontSubset::Simple {
                    first_char,
                    last_char,
                    widths,
                },
            ) => write_simple(table, font, first_char, last_char, widths, compression)?,
            (FontState::Cjk { font, .. }, FontSubset::Cjk { widths, .. }) => {
                write_cjk(table, font, widths)?
            }
            (
                FontState::Type3 { font },
                FontSubset::Type3 {
                    first_char,
                    last_char,
                    widths,
                    differences,
                    char_procs,
                },
            ) => write_type3(
                table,
                font,
                (first_char, last_char, widths),
                differences,
                char_procs,
                compression,
            )?,
            (FontState::TrueTypeUnicode { font, .. }, FontSubset::TrueTypeUnicode { glyphs, widths, .. }) => {
                write_true_type_unicode(table, font, &glyphs, widths, compression)?
            }
            // subset() returns the variant of the state it was built from
            _ => return Err(PdfError::UnknownFont(self.name().to_string())),
        };

        table.write(self.id, &Object::Dictionary(dict))?;
        self.written = true;
        Ok(())
    }
}

/// `/W` array for `(cid, width)` pairs sorted by cid: consecutive CIDs are
/// grouped as `c [w1 w2 ...]`, widths of 1000 (the `/DW`) are left out
fn width_array<I>(widths: I) -> Vec<Object>
where
    I: IntoIterator<Item = (u16, u32)>,
{
    let mut out = Vec::new();
    let mut run = Vec::new();
    let mut last: Option<u16> = None;
    for (cid, width) in widths {
        if width == 1000 {
            continue;
        }
        let continues = last.map_or(false, |l| u32::from(l) + 1 == u32::from(cid));
        if !continues {
            if !run.is_empty() {
                out.push(Object::Array(std::mem::take(&mut run)));
            }
            out.push(Object::Integer(i64::from(cid)));
        }
        run.push(Object::Integer(i64::from(width)));
        last = Some(cid);
    }
    if !run.is_empty() {
        out.push(Object::Array(run));
    }
    out
}

fn name(s: &str) -> Object {
    Object::Name(s.as_bytes().to_vec())
}

fn font_file(table: &mut ObjectTable, program: &[u8], compression: Option<u32>) -> Result<ObjectId> {
    let dict = LoDictionary::from_iter(vec![("Length1", Object::Integer(program.len() as i64))]);
    let stream = flate_stream(dict, program.to_vec(), compression)?;
    table.add(&Object::Stream(stream))
}

fn font_descriptor(
    font_name: &str,
    metrics: &FontMetrics,
    symbolic: bool,
    font_file: Option<ObjectId>,
) -> LoDictionary {
    let ascent = metrics.scale(i64::from(metrics.ascent));
    let descent = metrics.scale(i64::from(metrics.descent));
    let mut dict = LoDictionary::from_iter(vec![
        ("Type", name("FontDescriptor")),
        ("FontName", name(font_name)),
        ("Flags", Object::Integer(if symbolic { 4 } else { 32 })),
        (
            "FontBBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(descent),
                Object::Integer(1000),
                Object::Integer(ascent),
            ]),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", Object::Integer(ascent)),
        ("Descent", Object::Integer(descent)),
        ("CapHeight", Object::Integer(ascent)),
        ("StemV", Object::Integer(80)),
    ]);
    if let Some(id) = font_file {
        dict.set("FontFile2", Object::Reference(id));
    }
    dict
}

fn write_simple(
    table: &mut ObjectTable,
    font: &SimpleFont,
    first_char: u8,
    last_char: u8,
    widths: Vec<u32>,
    compression: Option<u32>,
) -> Result<LoDictionary> {
    let subtype = match font.subtype {
        SimpleSubtype::Type1 => "Type1",
        SimpleSubtype::TrueType => "TrueType",
    };
    let mut dict = LoDictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name(subtype)),
        ("BaseFont", name(&font.base_font)),
    ]);
    if font.encoding == SimpleEncoding::WinAnsi {
        dict.set("Encoding", name("WinAnsiEncoding"));
    }
    // font-specific standard fonts rely on the viewer's metrics
    let viewer_metrics =
        font.builtin && font.encoding == SimpleEncoding::FontSpecific && font.widths.is_none();
    if !viewer_metrics {
        dict.set("FirstChar", Object::Integer(i64::from(first_char)));
        dict.set("LastChar", Object::Integer(i64::from(last_char)));
        dict.set(
            "Widths",
            Object::Array(widths.into_iter().map(|w| Object::Integer(i64::from(w))).collect()),
        );
    }
    if !font.builtin {
        let file = match &font.font_program {
            Some(program) => Some(font_file(table, program, compression)?),
            None => None,
        };
        let symbolic = font.encoding == SimpleEncoding::FontSpecific;
        let descriptor = font_descriptor(&font.base_font, &font.metrics, symbolic, file);
        let descriptor = table.add(&Object::Dictionary(descriptor))?;
        dict.set("FontDescriptor", Object::Reference(descriptor));
    }
    Ok(dict)
}

fn write_cjk(table: &mut ObjectTable, font: &CjkFont, widths: Vec<Object>) -> Result<LoDictionary> {
    let descriptor = font_descriptor(&font.name, &font.metrics, true, None);
    let descriptor = table.add(&Object::Dictionary(descriptor))?;

    let mut cid_font = LoDictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("CIDFontType0")),
        ("BaseFont", name(&font.name)),
        ("FontDescriptor", Object::Reference(descriptor)),
    ]);
    if !widths.is_empty() {
        cid_font.set("W", Object::Array(widths));
    }
    cid_font.set("DW", Object::Integer(1000));
    cid_font.set(
        "CIDSystemInfo",
        Object::Dictionary(LoDictionary::from_iter(vec![
            ("Registry", Object::string_literal(font.registry.as_str())),
            ("Ordering", Object::string_literal(font.ordering.as_str())),
            ("Supplement", Object::Integer(font.supplement)),
        ])),
    );
    let cid_font = table.add(&Object::Dictionary(cid_font))?;

    Ok(LoDictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type0")),
        ("BaseFont", name(&format!("{}-{}", font.name, font.cmap))),
        ("Encoding", name(&font.cmap)),
        ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font)])),
    ]))
}

fn write_type3(
    table: &mut ObjectTable,
    font: &Type3Font,
    (first_char, last_char, widths): (u8, u8, Vec<u32>),
    differences: Vec<Object>,
    char_procs: Vec<(String, u8)>,
    compression: Option<u32>,
) -> Result<LoDictionary> {
    let mut procs = LoDictionary::new();
    for (glyph_name, code) in char_procs {
        let Some(glyph) = font.glyphs.get(&code) else {
            continue;
        };
        let stream = flate_stream(LoDictionary::new(), glyph.content.clone(), compression)?;
        procs.set(glyph_name, Object::Reference(table.add(&Object::Stream(stream))?));
    }
    let procs = table.add(&Object::Dictionary(procs))?;

    let encoding = LoDictionary::from_iter(vec![("Differences", Object::Array(differences))]);
    let encoding = table.add(&Object::Dictionary(encoding))?;

    let widths = Object::Array(widths.into_iter().map(|w| Object::Integer(i64::from(w))).collect());
    let widths = table.add(&widths)?;

    let mut dict = LoDictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type3")),
        ("FontBBox", Object::Array(font.font_bbox().iter().map(|v| number(*v)).collect())),
        (
            "FontMatrix",
            Object::Array(vec![
                Object::Real(0.001),
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(0.001),
                Object::Integer(0),
                Object::Integer(0),
            ]),
        ),
        ("CharProcs", Object::Reference(procs)),
        ("Encoding", Object::Reference(encoding)),
        ("FirstChar", Object::Integer(i64::from(first_char))),
        ("LastChar", Object::Integer(i64::from(last_char))),
        ("Widths", Object::Reference(widths)),
    ]);
    if font.resources.has_resources() {
        let resources = table.add(&Object::Dictionary(font.resources.resources()))?;
        dict.set("Resources", Object::Reference(resources));
    }
    Ok(dict)
}

fn to_unicode_cmap(glyphs: &[UsedGlyph]) -> Vec<u8> {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo\n\
         << /Registry (TTX+0)\n\
         /Ordering (T42UV)\n\
         /Supplement 0\n\
         >> def\n\
         /CMapName /TTX+0 def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000><FFFF>\n\
         endcodespacerange\n",
    );
    for block in glyphs.chunks(100) {
        cmap.push_str(&format!("{} beginbfrange\n", block.len()));
        for glyph in block {
            let gid = format!("<{:04X}>", glyph.glyph_id);
            cmap.push_str(&format!("{gid}{gid}{}\n", to_unicode_hex(glyph.unicode)));
        }
        cmap.push_str("endbfrange\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end end\n",
    );
    cmap.into_bytes()
}

fn write_true_type_unicode(
    table: &mut ObjectTable,
    font: &TrueTypeUnicodeFont,
    glyphs: &[UsedGlyph],
    widths: Vec<Object>,
    compression: Option<u32>,
) -> Result<LoDictionary> {
    tracing::debug!(
        font = %font.name,
        used = glyphs.len(),
        available = font.data.glyph_count(),
        "writing unicode font"
    );
    let file = match &font.font_program {
        Some(program) => Some(font_file(table, program, compression)?),
        None => None,
    };
    let descriptor = font_descriptor(&font.name, &font.metrics(), font.symbolic, file);
    let descriptor = table.add(&Object::Dictionary(descriptor))?;

    let mut cid_font = LoDictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("CIDFontType2")),
        ("BaseFont", name(&font.name)),
        ("FontDescriptor", Object::Reference(descriptor)),
        ("CIDToGIDMap", name("Identity")),
        (
            "CIDSystemInfo",
            Object::Dictionary(LoDictionary::from_iter(vec![
                ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
                ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
                ("Supplement", Object::Integer(0)),
            ])),
        ),
        ("DW", Object::Integer(1000)),
    ]);
    if !widths.is_empty() {
        cid_font.set("W", Object::Array(widths));
    }
    let cid_font = table.add(&Object::Dictionary(cid_font))?;

    let mut dict = LoDictionary::from_iter(vec![
        ("Type", name("Font")),
        ("Subtype", name("Type0")),
        ("BaseFont", name(&font.name)),
        ("Encoding", name("Identity-H")),
        ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font)])),
    ]);
    if !glyphs.is_empty() {
        let stream = flate_stream(LoDictionary::new(), to_unicode_cmap(glyphs), compression)?;
        dict.set("ToUnicode", Object::Reference(table.add(&Object::Stream(stream))?));
    }
    Ok(dict)
}
