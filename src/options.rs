//! Writer configuration

use serde_derive::{Deserialize, Serialize};

use crate::errors::{PdfError, Result};
use crate::page_tree::DEFAULT_LEAF_SIZE;

/// Options for [`crate::PdfWriter`], usually parsed from JSON:
///
/// ```json
/// { "pdfVersion": "1.7", "compressionLevel": 6, "leafSize": 10 }
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PdfWriterOptions {
    /// Written into the `%PDF-1.x` header, `1.0` to `1.7`
    pub pdf_version: String,
    /// zlib level for content streams and embedded fonts. `None` writes
    /// everything uncompressed.
    pub compression_level: Option<u32>,
    /// Maximum number of kids of a `/Pages` node
    pub leaf_size: usize,
}

impl Default for PdfWriterOptions {
    fn default() -> Self {
        Self {
            pdf_version: "1.7".to_string(),
            compression_level: Some(6),
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

impl PdfWriterOptions {
    /// Parses and validates the options. Missing keys fall back to the
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn uncompressed() -> Self {
        Self {
            compression_level: None,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let minor = self
            .pdf_version
            .strip_prefix("1.")
            .and_then(|m| m.parse::<u8>().ok());
        if !matches!(minor, Some(0..=7)) || self.pdf_version.len() != 3 {
            return Err(PdfError::InvalidOption(format!(
                "unsupported PDF version {:?}",
                self.pdf_version
            )));
        }
        if let Some(level) = self.compression_level {
            if level > 9 {
                return Err(PdfError::InvalidOption(format!(
                    "compression level must be between 0 and 9, got {level}"
                )));
            }
        }
        if self.leaf_size < 2 {
            return Err(PdfError::InvalidOption(format!(
                "leaf size must be at least 2, got {}",
                self.leaf_size
            )));
        }
        Ok(())
    }

    /// `%PDF-1.x` followed by a comment with four bytes above 127, so file
    /// transfer tools treat the file as binary
    pub(crate) fn header(&self) -> Vec<u8> {
        let mut header = format!("%PDF-{}\n", self.pdf_version).into_bytes();
        header.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        header
    }
}
