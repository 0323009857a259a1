//! Document writer: ties the object table, fonts, pages and the page tree
//! together and produces the finished file.

use std::collections::BTreeSet;
use std::io::Write;

use lopdf::{Dictionary as LoDictionary, Object, StringFormat};

use crate::contents::{assemble, PageContent, PageRect};
use crate::document_info::DocumentInfo;
use crate::encryption::{KeyLength, ObjectEncryption, StandardEncryption};
use crate::errors::{PdfError, Result};
use crate::font::PdfFont;
use crate::font_details::FontDetails;
use crate::indirect::ObjectTable;
use crate::options::PdfWriterOptions;
use crate::page_tree::PageTree;
use crate::resources::PageResources;
use crate::serialize::{format_number, to_bytes, write_name};
use crate::{FontRef, LayerRef, ObjectId};

/// Non-fatal finding collected while writing
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfWarnMsg {
    /// 1-based page number, `None` for document-level findings
    pub page: Option<usize>,
    pub severity: &'static str,
    pub msg: String,
}

impl PdfWarnMsg {
    pub const ERROR: &'static str = "error";
    pub const WARNING: &'static str = "warning";

    pub fn warning(page: Option<usize>, msg: String) -> Self {
        PdfWarnMsg {
            page,
            severity: Self::WARNING,
            msg,
        }
    }
}

/// The four content layers of a page
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageLayer {
    Under,
    Content,
    Text,
    Overlay,
}

impl PageLayer {
    fn name(&self) -> &'static str {
        match self {
            PageLayer::Under => "under",
            PageLayer::Content => "content",
            PageLayer::Text => "text",
            PageLayer::Overlay => "overlay",
        }
    }
}

/// A page under construction. Get one from [`PdfWriter::new_page`], fill
/// it and hand it back with [`PdfWriter::add_page`].
#[derive(Debug, Clone)]
pub struct PageBuilder {
    rect: PageRect,
    content: PageContent,
    resources: PageResources,
    /// Additional entries of the page dictionary
    extend_with: LoDictionary,
    /// Marked content sections opened with `begin_layer`, innermost last
    open_layers: Vec<(PageLayer, String)>,
    used_layers: BTreeSet<ObjectId>,
    /// Text shown per font, recorded as font usage once the page is added
    shown_text: Vec<(ObjectId, String)>,
}

impl PageBuilder {
    pub fn rect(&self) -> &PageRect {
        &self.rect
    }

    pub fn content(&self) -> &PageContent {
        &self.content
    }

    /// Raw operators of one of the page layers
    pub fn stream_mut(&mut self, layer: PageLayer) -> &mut Vec<u8> {
        match layer {
            PageLayer::Under => &mut self.content.under,
            PageLayer::Content => &mut self.content.content,
            PageLayer::Text => self.content.text.get_or_insert_with(Vec::new),
            PageLayer::Overlay => &mut self.content.overlay,
        }
    }

    pub fn resources_mut(&mut self) -> &mut PageResources {
        &mut self.resources
    }

    /// Sets an additional entry of the page dictionary, e.g. `/Annots`
    pub fn set_entry<K: Into<Vec<u8>>>(&mut self, key: K, value: Object) {
        self.extend_with.set(key, value);
    }

    /// Opens a marked content section for `layer` in the given stream
    pub fn begin_layer(&mut self, target: PageLayer, layer: &LayerRef) {
        let name = self
            .resources
            .add_property(format!("OC{}", layer.id.0), Object::Reference(layer.id));
        let stream = self.stream_mut(target);
        stream.extend_from_slice(b"/OC ");
        write_name(&name, stream);
        stream.extend_from_slice(b" BDC\n");
        self.open_layers.push((target, layer.name.clone()));
        self.used_layers.insert(layer.id);
    }

    /// Closes the innermost section opened in the given stream
    pub fn end_layer(&mut self, target: PageLayer) -> Result<()> {
        let pos = self
            .open_layers
            .iter()
            .rposition(|(t, _)| *t == target)
            .ok_or(PdfError::NoOpenLayer(target.name()))?;
        self.open_layers.remove(pos);
        self.stream_mut(target).extend_from_slice(b"EMC\n");
        Ok(())
    }
}

/// Writes a PDF file front to back. Objects are serialized as soon as they
/// are complete, only the fonts (whose usage grows with every page) and the
/// page tree are written by [`PdfWriter::finish`].
#[derive(Debug)]
pub struct PdfWriter {
    options: PdfWriterOptions,
    table: ObjectTable,
    tree: PageTree,
    fonts: Vec<FontDetails>,
    layers: Vec<LayerRef>,
    used_layers: BTreeSet<ObjectId>,
    info: DocumentInfo,
    document_id: Vec<u8>,
    /// Synthetic resource names continue from page to page
    name_counter: u32,
    warnings: Vec<PdfWarnMsg>,
}

impl PdfWriter {
    pub fn new(options: PdfWriterOptions) -> Result<Self> {
        options.validate()?;
        let table = ObjectTable::new(&options.header());
        let tree = PageTree::new(options.leaf_size);
        Ok(Self {
            options,
            table,
            tree,
            fonts: Vec::new(),
            layers: Vec::new(),
            used_layers: BTreeSet::new(),
            info: DocumentInfo::default(),
            document_id: crate::utils::document_id(),
            name_counter: 0,
            warnings: Vec::new(),
        })
    }

    /// Encrypts every following object with `encryption`. Has to be set
    /// before the first object is written.
    pub fn with_encryption(mut self, encryption: Box<dyn ObjectEncryption>) -> Self {
        self.table = self.table.with_encryption(encryption);
        self
    }

    /// Standard security handler keyed with this document's ID
    pub fn with_password(self, user: &str, owner: &str, permissions: i32, key_length: KeyLength) -> Self {
        let encryption = StandardEncryption::new(
            user.as_bytes(),
            owner.as_bytes(),
            permissions,
            key_length,
            &self.document_id,
        );
        self.with_encryption(Box::new(encryption))
    }

    /// First (and second) element of the trailer `/ID`
    pub fn document_id(&self) -> &[u8] {
        &self.document_id
    }

    pub fn options(&self) -> &PdfWriterOptions {
        &self.options
    }

    pub fn set_info(&mut self, info: DocumentInfo) {
        self.info = info;
    }

    /// Reserves an object number, e.g. for a forward reference. The object
    /// has to be written with [`PdfWriter::write_object`] before `finish`.
    pub fn allocate_object(&mut self) -> ObjectId {
        self.table.allocate()
    }

    pub fn write_object(&mut self, id: ObjectId, value: &Object) -> Result<()> {
        self.table.write(id, value)
    }

    /// Writes `value` as a new indirect object, e.g. an image XObject
    pub fn add_object(&mut self, value: &Object) -> Result<ObjectId> {
        self.table.add(value)
    }

    pub fn add_font<F: Into<PdfFont>>(&mut self, font: F) -> FontRef {
        let id = self.table.allocate();
        let name = format!("F{}", self.fonts.len() + 1);
        self.fonts.push(FontDetails::new(id, &name, font.into()));
        FontRef { name, id }
    }

    /// Declares an optional content group. Its dictionary is written by
    /// `finish`.
    pub fn add_layer(&mut self, name: &str) -> LayerRef {
        let layer = LayerRef {
            name: name.to_string(),
            id: self.table.allocate(),
        };
        self.layers.push(layer.clone());
        layer
    }

    /// A fresh page without inherited resources
    pub fn new_page(&self, rect: PageRect) -> PageBuilder {
        self.new_page_with_resources(rect, None)
    }

    /// A page whose resource dictionary starts from `inherited`. With
    /// inherited resources every resource added to the page gets a
    /// synthetic `Xi<n>` name that doesn't clash with the inherited ones,
    /// numbered on from the previous such page.
    pub fn new_page_with_resources(&self, rect: PageRect, inherited: Option<&LoDictionary>) -> PageBuilder {
        let mut resources = PageResources::new();
        if inherited.is_some() {
            resources.set_original_resources(inherited, self.name_counter);
        }
        PageBuilder {
            rect,
            content: PageContent::default(),
            resources,
            extend_with: LoDictionary::new(),
            open_layers: Vec::new(),
            used_layers: BTreeSet::new(),
            shown_text: Vec::new(),
        }
    }

    /// Shows `text` at (`x`, `y`) in the page's text layer and registers the
    /// font as a page resource. The glyphs count as used by the font once
    /// the page is added, a page that is never added leaves no trace.
    pub fn show_text(&mut self, page: &mut PageBuilder, font: &FontRef, size: f64, x: f64, y: f64, text: &str) -> Result<()> {
        let details = self
            .fonts
            .iter()
            .find(|f| f.id() == font.id)
            .ok_or_else(|| PdfError::UnknownFont(font.name.clone()))?;
        let bytes = details.encode_text(text)?;
        page.shown_text.push((font.id, text.to_string()));
        let name = page.resources.add_font(font.name.as_str(), Object::Reference(font.id));

        let stream = page.stream_mut(PageLayer::Text);
        stream.extend_from_slice(b"BT\n");
        write_name(&name, stream);
        stream.extend_from_slice(format!(" {} Tf\n", format_number(size)).as_bytes());
        stream.extend_from_slice(format!("{} {} Td\n", format_number(x), format_number(y)).as_bytes());
        stream.extend_from_slice(&to_bytes(&Object::String(bytes, StringFormat::Hexadecimal)));
        stream.extend_from_slice(b" Tj\nET\n");
        Ok(())
    }

    /// Writes the page's content stream and the page itself and returns the
    /// page object
    pub fn add_page(&mut self, page: PageBuilder) -> Result<ObjectId> {
        if let Some((_, name)) = page.open_layers.last() {
            return Err(PdfError::UnclosedLayer(name.clone()));
        }
        let page_number = self.tree.len() + 1;
        if page.content.is_empty() {
            self.warnings
                .push(PdfWarnMsg::warning(Some(page_number), "page has no content".to_string()));
        }

        let stream = assemble(&page.content, &page.rect, self.options.compression_level)?;
        let contents_id = self.table.add(&Object::Stream(stream))?;

        let mut dict = LoDictionary::from_iter(vec![
            ("Type", Object::Name("Page".into())),
            ("MediaBox", page.rect.to_array()),
            ("Rotate", Object::Integer(i64::from(page.rect.rotation()))),
            ("Contents", Object::Reference(contents_id)),
        ]);
        if page.resources.has_resources() || page.resources.original_resources().is_some() {
            dict.set("Resources", Object::Dictionary(page.resources.resources()));
        }
        for (key, value) in page.extend_with.iter() {
            dict.set(key.clone(), value.clone());
        }

        let page_id = self.table.allocate();
        self.tree.add_page(&mut self.table, page_id, dict)?;
        for (font_id, text) in &page.shown_text {
            if let Some(details) = self.fonts.iter_mut().find(|f| f.id() == *font_id) {
                details.record_usage(text)?;
            }
        }
        self.name_counter = self.name_counter.max(page.resources.name_counter());
        self.used_layers.extend(page.used_layers);
        Ok(page_id)
    }

    /// Keeps all pages under a single `/Pages` node, see
    /// [`PageTree::set_linear_mode`]
    pub fn set_linear_mode(&mut self, existing_parent: Option<ObjectId>) -> Result<()> {
        self.tree.set_linear_mode(existing_parent)
    }

    /// Moves the old page `order[k]` (1-based) to position `k`
    pub fn reorder_pages(&mut self, order: &[usize]) -> Result<usize> {
        self.tree.reorder_pages(order)
    }

    pub fn page_count(&self) -> usize {
        self.tree.len()
    }

    /// Writes the fonts, the page tree, the layers, the catalog, the info
    /// dictionary and the cross-reference table, and returns the file
    pub fn finish(mut self) -> Result<(Vec<u8>, Vec<PdfWarnMsg>)> {
        if self.tree.is_empty() {
            return Err(PdfError::NoPages);
        }
        tracing::debug!(
            pages = self.tree.len(),
            fonts = self.fonts.len(),
            layers = self.layers.len(),
            "finishing document"
        );

        let compression = self.options.compression_level;
        for font in self.fonts.iter_mut() {
            if !font.is_used() {
                self.warnings.push(PdfWarnMsg::warning(
                    None,
                    format!("font {} ({}) is never used", font.name(), font.resource_name()),
                ));
            }
            font.write_font(&mut self.table, compression)?;
        }

        let pages_id = self.tree.write_page_tree(&mut self.table)?;

        let mut catalog = LoDictionary::from_iter(vec![
            ("Type", Object::Name("Catalog".into())),
            ("Pages", Object::Reference(pages_id)),
        ]);

        if !self.layers.is_empty() {
            for layer in &self.layers {
                if !self.used_layers.contains(&layer.id) {
                    self.warnings
                        .push(PdfWarnMsg::warning(None, format!("layer {} is never used", layer.name)));
                }
                let ocg = LoDictionary::from_iter(vec![
                    ("Type", Object::Name("OCG".into())),
                    ("Name", Object::String(layer.name.as_bytes().to_vec(), StringFormat::Literal)),
                ]);
                self.table.write(layer.id, &Object::Dictionary(ocg))?;
            }
            let ocgs = self
                .layers
                .iter()
                .map(|l| Object::Reference(l.id))
                .collect::<Vec<Object>>();
            catalog.set(
                "OCProperties",
                Object::Dictionary(LoDictionary::from_iter(vec![
                    ("OCGs", Object::Array(ocgs.clone())),
                    // optional content configuration dictionary
                    (
                        "D",
                        Object::Dictionary(LoDictionary::from_iter(vec![
                            ("Order", Object::Array(ocgs.clone())),
                            ("RBGroups", Object::Array(vec![])),
                            // initially visible
                            ("ON", Object::Array(ocgs)),
                        ])),
                    ),
                ])),
            );
        }

        let catalog_id = self.table.add(&Object::Dictionary(catalog))?;
        let info_id = self.table.add(&Object::Dictionary(self.info.into_dictionary()))?;

        let encrypt_id = match self.table.encryption().map(|e| e.encryption_dictionary()) {
            Some(dict) => {
                let id = self.table.allocate();
                self.table.write_unencrypted(id, &Object::Dictionary(dict))?;
                Some(id)
            }
            None => None,
        };

        let id = Object::String(self.document_id.clone(), StringFormat::Hexadecimal);
        let mut trailer = LoDictionary::from_iter(vec![
            ("Root", Object::Reference(catalog_id)),
            ("Info", Object::Reference(info_id)),
            ("ID", Object::Array(vec![id.clone(), id])),
        ]);
        if let Some(encrypt_id) = encrypt_id {
            trailer.set("Encrypt", Object::Reference(encrypt_id));
        }

        let bytes = self.table.finish(trailer)?;
        Ok((bytes, self.warnings))
    }

    /// Finishes the document and writes it to `target`
    pub fn save<W: Write>(self, target: &mut W) -> Result<Vec<PdfWarnMsg>> {
        let (bytes, warnings) = self.finish()?;
        target.write_all(&bytes)?;
        Ok(warnings)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::font::BuiltinFont;
    use pretty_assertions::assert_eq;

    fn writer() -> PdfWriter {
        PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap()
    }

    fn letter() -> PageRect {
        PageRect::new(0.0, 0.0, 612.0, 792.0)
    }

    #[test]
    fn show_text_operators() {
        let mut writer = writer();
        let font = writer.add_font(BuiltinFont::Helvetica);
        let mut page = writer.new_page(letter());
        writer
            .show_text(&mut page, &font, 12.0, 72.0, 700.5, "Hi")
            .unwrap();
        assert_eq!(
            page.content().text.as_deref().unwrap(),
            &b"BT\n/F1 12 Tf\n72 700.5 Td\n<4869> Tj\nET\n"[..]
        );
        assert_eq!(
            page.resources.category(crate::ResourceKind::Font).get(b"F1").unwrap(),
            &Object::Reference(font.id())
        );
    }

    #[test]
    fn unencodable_text_is_rejected() {
        let mut writer = writer();
        let font = writer.add_font(BuiltinFont::Helvetica);
        let mut page = writer.new_page(letter());
        let err = writer
            .show_text(&mut page, &font, 12.0, 0.0, 0.0, "\u{4e2d}")
            .unwrap_err();
        assert!(matches!(
            err,
            PdfError::UnencodableCharacter { codepoint: 0x4e2d, .. }
        ));
        assert!(page.content().text.is_none());
    }

    #[test]
    fn layers_must_be_closed() {
        let mut writer = writer();
        let layer = writer.add_layer("Notes");
        let mut page = writer.new_page(letter());
        page.begin_layer(PageLayer::Content, &layer);
        page.stream_mut(PageLayer::Content)
            .extend_from_slice(b"0 0 m 1 1 l S\n");
        assert!(matches!(
            page.end_layer(PageLayer::Text),
            Err(PdfError::NoOpenLayer("text"))
        ));

        let mut unclosed = page.clone();
        assert!(matches!(
            writer.add_page(page.clone()),
            Err(PdfError::UnclosedLayer(name)) if name == "Notes"
        ));

        unclosed.end_layer(PageLayer::Content).unwrap();
        let expected = format!("/OC /OC{} BDC\n0 0 m 1 1 l S\nEMC\n", layer.id().0);
        assert_eq!(unclosed.content().content, expected.into_bytes());
        writer.add_page(unclosed).unwrap();
    }

    #[test]
    fn rejected_pages_leave_fonts_unused() {
        let mut writer = writer();
        let font = writer.add_font(BuiltinFont::Helvetica);
        let layer = writer.add_layer("Notes");
        let mut page = writer.new_page(letter());
        page.begin_layer(PageLayer::Text, &layer);
        writer.show_text(&mut page, &font, 12.0, 0.0, 0.0, "Hi").unwrap();
        assert!(writer.add_page(page).is_err());
        assert!(!writer.fonts[0].is_used());

        let mut page = writer.new_page(letter());
        writer.show_text(&mut page, &font, 12.0, 0.0, 0.0, "Hi").unwrap();
        assert!(!writer.fonts[0].is_used());
        writer.add_page(page).unwrap();
        assert!(writer.fonts[0].is_used());
    }

    #[test]
    fn no_pages() {
        assert!(matches!(writer().finish(), Err(PdfError::NoPages)));
    }

    #[test]
    fn unused_font_is_reported() {
        let mut writer = writer();
        writer.add_font(BuiltinFont::Courier);
        let mut page = writer.new_page(letter());
        page.stream_mut(PageLayer::Content)
            .extend_from_slice(b"0 0 10 10 re f\n");
        writer.add_page(page).unwrap();
        let (bytes, warnings) = writer.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].msg.contains("Courier"));
    }
}
