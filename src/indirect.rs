//! Indirect objects: number allocation, `N G obj ... endobj` framing and the
//! cross-reference table.

use std::collections::BTreeMap;

use lopdf::{Dictionary as LoDictionary, Object};

use crate::encryption::ObjectEncryption;
use crate::errors::{PdfError, Result};
use crate::serialize::{write_dictionary, write_object};
use crate::ObjectId;

/// A value bound to its object number and generation
#[derive(Debug, Clone, Copy)]
pub struct IndirectObject<'a> {
    pub id: ObjectId,
    pub value: &'a Object,
}

impl<'a> IndirectObject<'a> {
    pub fn new(id: ObjectId, value: &'a Object) -> Self {
        Self { id, value }
    }

    /// Writes `"N G obj\n" + value + "\nendobj\n"`. If `crypt` is given it
    /// has to be keyed for this object already.
    pub fn serialize(&self, out: &mut Vec<u8>, crypt: Option<&dyn ObjectEncryption>) {
        let (number, generation) = self.id;
        out.extend_from_slice(format!("{number} {generation} obj\n").as_bytes());
        write_object(self.value, out, crypt);
        out.extend_from_slice(b"\nendobj\n");
    }
}

/// Writer context for the file body.
///
/// Numbers are handed out monotonically starting at 1, every allocated
/// number has to be written exactly once before [`ObjectTable::finish`].
#[derive(Debug)]
pub struct ObjectTable {
    out: Vec<u8>,
    next_number: u32,
    /// object number -> byte offset of its `N G obj` line
    offsets: BTreeMap<u32, usize>,
    encryption: Option<Box<dyn ObjectEncryption>>,
}

impl ObjectTable {
    /// `header` is the file header (`%PDF-1.x` plus the binary comment line),
    /// the first object starts right after it.
    pub fn new(header: &[u8]) -> Self {
        Self {
            out: header.to_vec(),
            next_number: 1,
            offsets: BTreeMap::new(),
            encryption: None,
        }
    }

    pub fn with_encryption(mut self, encryption: Box<dyn ObjectEncryption>) -> Self {
        self.encryption = Some(encryption);
        self
    }

    pub fn encryption(&self) -> Option<&dyn ObjectEncryption> {
        self.encryption.as_deref()
    }

    /// Reserves a fresh object number with generation 0
    pub fn allocate(&mut self) -> ObjectId {
        let id = (self.next_number, 0);
        self.next_number += 1;
        id
    }

    /// Number of objects allocated so far
    pub fn allocated(&self) -> usize {
        (self.next_number - 1) as usize
    }

    pub fn is_written(&self, id: ObjectId) -> bool {
        id.1 == 0 && self.offsets.contains_key(&id.0)
    }

    /// Serializes `value` as object `id`. The encryption hook is keyed with
    /// the object's number and generation before any byte of the value is
    /// produced.
    pub fn write(&mut self, id: ObjectId, value: &Object) -> Result<()> {
        self.check_writable(id)?;
        if let Some(encryption) = self.encryption.as_mut() {
            encryption.set_object_key(id.0, id.1);
        }
        self.offsets.insert(id.0, self.out.len());
        IndirectObject::new(id, value).serialize(&mut self.out, self.encryption.as_deref());
        Ok(())
    }

    /// Like [`ObjectTable::write`], but never encrypts. Only meant for the
    /// `/Encrypt` dictionary itself.
    pub fn write_unencrypted(&mut self, id: ObjectId, value: &Object) -> Result<()> {
        self.check_writable(id)?;
        self.offsets.insert(id.0, self.out.len());
        IndirectObject::new(id, value).serialize(&mut self.out, None);
        Ok(())
    }

    /// Allocates a number for `value` and writes it
    pub fn add(&mut self, value: &Object) -> Result<ObjectId> {
        let id = self.allocate();
        self.write(id, value)?;
        Ok(id)
    }

    fn check_writable(&self, id: ObjectId) -> Result<()> {
        let (number, generation) = id;
        if number == 0 || number >= self.next_number || generation != 0 {
            return Err(PdfError::UnknownObject(id));
        }
        if self.offsets.contains_key(&number) {
            return Err(PdfError::DuplicateObject(id));
        }
        Ok(())
    }

    /// Appends the cross-reference table and the trailer and returns the
    /// finished file. `/Size` is set here and must not be in `trailer`.
    pub fn finish(mut self, trailer: LoDictionary) -> Result<Vec<u8>> {
        let unwritten = (1..self.next_number)
            .filter(|n| !self.offsets.contains_key(n))
            .map(|n| (n, 0))
            .collect::<Vec<ObjectId>>();
        if !unwritten.is_empty() {
            return Err(PdfError::UnwrittenObjects(unwritten));
        }

        let size = self.next_number;
        let xref_offset = self.out.len();
        tracing::debug!(objects = size - 1, xref_offset, "writing cross-reference table");

        self.out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
        self.out.extend_from_slice(b"0000000000 65535 f\r\n");
        for offset in self.offsets.values() {
            self.out.extend_from_slice(format!("{offset:010} 00000 n\r\n").as_bytes());
        }

        let mut dict = LoDictionary::new();
        dict.set("Size", i64::from(size));
        for (key, value) in trailer.iter() {
            if key.as_slice() != b"Size" {
                dict.set(key.clone(), value.clone());
            }
        }

        self.out.extend_from_slice(b"trailer\n");
        // strings in the trailer (the /ID) are never encrypted
        write_dictionary(&dict, &mut self.out, None);
        self.out
            .extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());
        Ok(self.out)
    }
}
