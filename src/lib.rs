//! # pdfbody
//!
//! pdfbody writes the body of a PDF file: indirect objects, page content
//! streams with their resources, fonts with the glyphs that were actually
//! used, and a balanced page tree, followed by the cross-reference table.
//!
//! # Getting started
//!
//! There are three types of functions: `add_*`, `new_*` and `set_*`.
//! Fonts and layers have to be `add_`ed to the writer first, the returned
//! handles are then used on the pages.
//!
//! ```rust
//! use pdfbody::*;
//!
//! let mut writer = PdfWriter::new(PdfWriterOptions::default()).unwrap();
//! let helvetica = writer.add_font(BuiltinFont::Helvetica);
//!
//! let mut page = writer.new_page(PageRect::new(0.0, 0.0, 595.0, 842.0));
//! writer
//!     .show_text(&mut page, &helvetica, 24.0, 72.0, 770.0, "Hello World!")
//!     .unwrap();
//! writer.add_page(page).unwrap();
//!
//! writer.set_info(DocumentInfo::new().with_title("Hello"));
//! let (bytes, _warnings) = writer.finish().unwrap();
//! assert!(bytes.starts_with(b"%PDF-1.7"));
//! ```
//!
//! Objects are written as soon as they are complete, so nothing that was
//! added can be changed afterwards. Fonts are the exception: their usage
//! grows with every page and they are written by `finish`.

pub mod builtin_metrics;
pub mod contents;
pub mod document_info;
pub mod encodings;
pub mod encryption;
pub mod errors;
pub mod font;
pub mod font_details;
pub mod indices;
pub mod indirect;
pub mod options;
pub mod page_tree;
pub mod pdf_writer;
pub mod resources;
pub mod serialize;
mod utils;

pub use contents::*;
pub use document_info::*;
pub use encryption::{KeyLength, ObjectEncryption, StandardEncryption};
pub use errors::*;
pub use font::*;
pub use font_details::*;
pub use indices::*;
pub use indirect::*;
pub use options::*;
pub use page_tree::*;
pub use pdf_writer::*;
pub use resources::*;
