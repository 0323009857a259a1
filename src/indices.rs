//! Handles returned by the writer. Use the `add_*` functions to get one
//! instead of building them by hand.

pub use lopdf::ObjectId;

/// A font that was added to the writer: the name it is referenced by in
/// content streams (`/F1`) and the object the font dictionary is written to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FontRef {
    pub(crate) name: String,
    pub(crate) id: ObjectId,
}

impl FontRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

/// An optional content group (layer) added to the writer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerRef {
    pub(crate) name: String,
    pub(crate) id: ObjectId,
}

impl LayerRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}
