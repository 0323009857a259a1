//! Info dictionary of a PDF document

use lopdf::{Dictionary as LoDictionary, Object, StringFormat};
use time::OffsetDateTime;

/// "Info" dictionary of a PDF document. Unset entries are left out.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Vec<String>,
    pub creator: Option<String>,
    /// Defaults to `pdfbody-<version>` when the dictionary is written
    pub producer: Option<String>,
    pub creation_date: Option<OffsetDateTime>,
    pub modification_date: Option<OffsetDateTime>,
}

impl DocumentInfo {
    /// Create a new, empty document info dictionary
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Sets both the creation and the modification date
    pub fn with_date(mut self, date: OffsetDateTime) -> Self {
        self.creation_date = Some(date);
        self.modification_date = Some(date);
        self
    }

    pub(crate) fn into_dictionary(self) -> LoDictionary {
        let mut dict = LoDictionary::new();
        let texts = [
            ("Title", self.title),
            ("Author", self.author),
            ("Subject", self.subject),
            ("Creator", self.creator),
        ];
        for (key, value) in texts {
            if let Some(value) = value {
                dict.set(key, text_string(&value));
            }
        }
        if !self.keywords.is_empty() {
            dict.set("Keywords", text_string(&self.keywords.join(",")));
        }
        let producer = self.producer.unwrap_or_else(crate::page_tree::producer);
        dict.set("Producer", text_string(&producer));

        let dates = [
            ("CreationDate", self.creation_date),
            ("ModDate", self.modification_date),
        ];
        for (key, date) in dates {
            if let Some(date) = date {
                let stamp = to_pdf_time_stamp_metadata(&date);
                dict.set(key, Object::String(stamp.into_bytes(), StringFormat::Literal));
            }
        }
        dict
    }
}

/// ASCII text as a literal string, anything else as UTF-16BE with a byte
/// order mark
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

// D:20170505150224+02'00'
fn to_pdf_time_stamp_metadata(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
