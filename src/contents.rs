//! Page content stream assembly.

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary as LoDictionary, Object, Stream as LoStream};
use smallvec::SmallVec;

use crate::errors::{PdfError, Result};
use crate::serialize::format_number;

/// The four layers of a page, drawn in this order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// Drawn below everything else
    pub under: Vec<u8>,
    pub content: Vec<u8>,
    /// Text layer, written (in `q`/`Q`) whenever it is present, even if empty
    pub text: Option<Vec<u8>>,
    /// Appended as is, without saving the graphics state
    pub overlay: Vec<u8>,
}

impl PageContent {
    pub fn is_empty(&self) -> bool {
        self.under.is_empty()
            && self.content.is_empty()
            && self.text.as_ref().map_or(true, |t| t.is_empty())
            && self.overlay.is_empty()
    }
}

/// Page rectangle in default user space units, with the page rotation
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PageRect {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
    rotation: u16,
}

impl PageRect {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        Self {
            llx,
            lly,
            urx,
            ury,
            rotation: 0,
        }
    }

    /// Rotation in degrees, normalised to 0, 90, 180 or 270. Angles that are
    /// not a multiple of 90 are treated as 0.
    pub fn with_rotation(mut self, degrees: i64) -> Self {
        let degrees = degrees.rem_euclid(360);
        self.rotation = if degrees % 90 == 0 { degrees as u16 } else { 0 };
        self
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn top(&self) -> f64 {
        self.ury
    }

    pub fn right(&self) -> f64 {
        self.urx
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }

    /// `[llx lly urx ury]`, as used for `/MediaBox`
    pub fn to_array(&self) -> Object {
        Object::Array(
            [self.llx, self.lly, self.urx, self.ury]
                .iter()
                .map(|v| number(*v))
                .collect(),
        )
    }

    /// Transformation that compensates the page rotation, empty for 0°
    pub fn rotation_prefix(&self) -> String {
        let top = format_number(self.top());
        let right = format_number(self.right());
        match self.rotation {
            90 => format!("0 1 -1 0 {top} 0 cm\n"),
            180 => format!("-1 0 0 -1 {right} {top} cm\n"),
            270 => format!("0 -1 1 0 0 {right} cm\n"),
            _ => String::new(),
        }
    }
}

/// Integral values become `Integer`, everything else `Real`
pub(crate) fn number(value: f64) -> Object {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Object::Integer(value as i64)
    } else {
        Object::Real(value as f32)
    }
}

/// Builds the page content stream: rotation prefix, then under, content
/// and text layer each wrapped in `q`/`Q`, then the overlay.
///
/// With `compression` set the whole buffer is deflated and `/Filter
/// /FlateDecode` is declared. `/Length` is set when the stream is serialized
/// and is always the length of the bytes on the wire.
pub fn assemble(page: &PageContent, rect: &PageRect, compression: Option<u32>) -> Result<LoStream> {
    let mut out = rect.rotation_prefix().into_bytes();

    let mut wrapped = SmallVec::<[&[u8]; 3]>::new();
    if !page.under.is_empty() {
        wrapped.push(&page.under);
    }
    if !page.content.is_empty() {
        wrapped.push(&page.content);
    }
    if let Some(text) = &page.text {
        wrapped.push(text);
    }

    for layer in wrapped {
        out.extend_from_slice(b"q\n");
        out.extend_from_slice(layer);
        if !layer.last().map_or(true, |b| b.is_ascii_whitespace()) {
            out.push(b'\n');
        }
        out.extend_from_slice(b"Q\n");
    }
    out.extend_from_slice(&page.overlay);

    flate_stream(LoDictionary::new(), out, compression)
}

/// Deflates `data` (zlib format) at `level`
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data).map_err(PdfError::Compression)?;
    encoder.finish().map_err(PdfError::Compression)
}

/// A stream with `data`, deflated and marked `/FlateDecode` if a
/// compression level is given
pub fn flate_stream(mut dict: LoDictionary, data: Vec<u8>, compression: Option<u32>) -> Result<LoStream> {
    let data = match compression {
        Some(level) => {
            let compressed = compress(&data, level)?;
            dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            compressed
        }
        None => data,
    };
    Ok(LoStream::new(dict, data))
}
