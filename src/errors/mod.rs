//! Errors for pdfbody
//!
//! Every failure is fatal for the current write: the body is written in a
//! single forward pass, so `/Length`, `/Count` and xref offsets can't be
//! patched after the fact.

use std::io::Error as IoError;

use crate::ObjectId;

pub type Result<T> = std::result::Result<T, PdfError>;

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// External: std::io::Error
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    // ----- structural preconditions
    #[error("The document has no pages.")]
    NoPages,
    #[error("Page reordering requires a single parent in the page tree. Call set_linear_mode() before adding more than {leaf_size} pages.")]
    ReorderMultipleParents { leaf_size: usize },
    #[error("Page reordering requires an array with the same size as the number of pages ({expected}), got {found}.")]
    ReorderWrongLength { expected: usize, found: usize },
    #[error("Page reordering requires pages between 1 and {max}. Found {found}.")]
    ReorderOutOfRange { max: usize, found: usize },
    #[error("Page reordering requires no page repetition. Page {0} is repeated.")]
    ReorderRepeatedPage(usize),
    #[error("Linear page mode can only be set while the page tree has a single parent.")]
    LinearModeMultipleParents,
    #[error("An existing parent can only be adopted before the first page is added.")]
    LinearModeAfterPages,
    #[error("The page tree has already been written.")]
    PageTreeWritten,
    #[error("Page contents {0:?} must be written before the page is added to the page tree.")]
    ContentsNotWritten(ObjectId),

    // ----- indirect object table
    #[error("Object {0:?} was never allocated by this writer.")]
    UnknownObject(ObjectId),
    #[error("Object {0:?} has already been written.")]
    DuplicateObject(ObjectId),
    #[error("{} allocated object(s) were never written, first: {:?}", .0.len(), .0.first())]
    UnwrittenObjects(Vec<ObjectId>),

    // ----- encoding domain
    #[error("Character U+{codepoint:04X} can't be encoded with the {encoding} encoding of font {font}.")]
    UnencodableCharacter { font: String, encoding: &'static str, codepoint: u32 },
    #[error("Font {font} has no glyph for U+{codepoint:04X}.")]
    GlyphNotFound { font: String, codepoint: u32 },
    #[error("Type3 font {font} has no glyph defined for U+{codepoint:04X}.")]
    Type3GlyphNotDefined { font: String, codepoint: u32 },
    #[error("No glyphs defined for Type3 font {0}.")]
    NoGlyphsDefined(String),
    #[error("Font {0} has already been written, its usage can't grow any more.")]
    FontAlreadyWritten(String),
    #[error("Unknown font reference {0}.")]
    UnknownFont(String),

    // ----- layers
    #[error("Layer {0} was opened but never closed on this page.")]
    UnclosedLayer(String),
    #[error("No layer is open in the {0} stream of this page.")]
    NoOpenLayer(&'static str),

    // ----- configuration
    #[error("Invalid writer option: {0}")]
    InvalidOption(String),
    #[error("Could not parse writer options: {0}")]
    OptionsParse(#[from] serde_json::Error),

    // ----- compression
    #[error("Compression failed: {0}")]
    Compression(IoError),
}
