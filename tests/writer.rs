use lopdf::{Dictionary as LoDictionary, Document, Object, ObjectId};
use pdfbody::{
    BuiltinFont, DocumentInfo, FontData, FontMetrics, GlyphMetrics, PageLayer, PageRect, PdfError,
    PdfWriter, PdfWriterOptions, TrueTypeUnicodeFont, Type3Font,
};
use pretty_assertions::assert_eq;

fn a4() -> PageRect {
    PageRect::new(0.0, 0.0, 595.0, 842.0)
}

fn parse(bytes: &[u8]) -> Document {
    Document::load_mem(bytes).expect("written file must parse")
}

fn name(name: &str) -> Object {
    Object::Name(name.as_bytes().to_vec())
}

fn stream_data(doc: &Document, id: ObjectId) -> Vec<u8> {
    let stream = doc.get_object(id).unwrap().as_stream().unwrap();
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

fn page_content(doc: &Document, page: &LoDictionary) -> Vec<u8> {
    let contents = page.get(b"Contents").unwrap().as_reference().unwrap();
    stream_data(doc, contents)
}

fn font_of<'a>(doc: &'a Document, page: &LoDictionary, name: &[u8]) -> &'a LoDictionary {
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let fonts = resources.get(b"Font").unwrap().as_dict().unwrap();
    let id = fonts.get(name).unwrap().as_reference().unwrap();
    doc.get_dictionary(id).unwrap()
}

#[test]
fn hello_world() {
    let mut writer = PdfWriter::new(PdfWriterOptions::default()).unwrap();
    let helvetica = writer.add_font(BuiltinFont::Helvetica);
    let mut page = writer.new_page(a4());
    writer
        .show_text(&mut page, &helvetica, 24.0, 72.0, 770.0, "Hello World!")
        .unwrap();
    let page_id = writer.add_page(page).unwrap();
    writer.set_info(DocumentInfo::new().with_title("Hello"));

    let (bytes, warnings) = writer.finish().unwrap();
    assert!(warnings.is_empty());
    assert!(bytes.starts_with(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n"));

    let doc = parse(&bytes);
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[&1], page_id);

    let page = doc.get_dictionary(page_id).unwrap();
    assert_eq!(
        page.get(b"MediaBox").unwrap(),
        &Object::Array(vec![0.into(), 0.into(), 595.into(), 842.into()])
    );
    let contents = page.get(b"Contents").unwrap().as_reference().unwrap();
    let stream = doc.get_object(contents).unwrap().as_stream().unwrap();
    assert_eq!(stream.dict.get(b"Filter").unwrap(), &name("FlateDecode"));
    assert_eq!(
        page_content(&doc, page),
        b"q\nBT\n/F1 24 Tf\n72 770 Td\n<48656C6C6F20576F726C6421> Tj\nET\nQ\n".to_vec()
    );

    let font = font_of(&doc, page, b"F1");
    assert_eq!(font.get(b"BaseFont").unwrap(), &name("Helvetica"));
    assert_eq!(font.get(b"Encoding").unwrap(), &name("WinAnsiEncoding"));
    assert_eq!(font.get(b"FirstChar").unwrap().as_i64().unwrap(), 32);
    assert_eq!(font.get(b"LastChar").unwrap().as_i64().unwrap(), 114);
    let widths = font.get(b"Widths").unwrap().as_array().unwrap();
    assert_eq!(widths.len(), 114 - 32 + 1);
    // space, then '!' and 'H'
    assert_eq!(widths[0].as_i64().unwrap(), 278);
    assert_eq!(widths[1].as_i64().unwrap(), 278);
    assert_eq!(widths[usize::from(b'H' - 32)].as_i64().unwrap(), 722);
    assert_eq!(widths[usize::from(b'a' - 32)].as_i64().unwrap(), 0);

    let info = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info).unwrap();
    assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Hello");
    assert_eq!(info.get(b"Producer").unwrap().as_str().unwrap(), b"pdfbody-0.3.0");

    let id = doc.trailer.get(b"ID").unwrap().as_array().unwrap();
    assert_eq!(id.len(), 2);
    assert_eq!(id[0].as_str().unwrap().len(), 16);
    assert_eq!(id[0], id[1]);
}

#[test]
fn standard_font_widths_cover_the_used_range() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    let helvetica = writer.add_font(BuiltinFont::Helvetica);
    let dingbats = writer.add_font(BuiltinFont::ZapfDingbats);
    let mut page = writer.new_page(a4());
    writer.show_text(&mut page, &helvetica, 12.0, 10.0, 10.0, "AZ").unwrap();
    writer.show_text(&mut page, &dingbats, 12.0, 10.0, 30.0, "a").unwrap();
    let page_id = writer.add_page(page).unwrap();
    let (bytes, _) = writer.finish().unwrap();

    let doc = parse(&bytes);
    let page = doc.get_dictionary(page_id).unwrap();
    let font = font_of(&doc, page, b"F1");
    assert_eq!(font.get(b"FirstChar").unwrap().as_i64().unwrap(), 65);
    assert_eq!(font.get(b"LastChar").unwrap().as_i64().unwrap(), 90);
    let widths = font
        .get(b"Widths")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|w| w.as_i64().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(widths.len(), 26);
    assert_eq!(widths[0], 667);
    assert!(widths[1..25].iter().all(|w| *w == 0));
    assert_eq!(widths[25], 611);

    // font-specific encoding, the viewer's metrics apply
    let font = font_of(&doc, page, b"F2");
    assert_eq!(font.get(b"BaseFont").unwrap(), &name("ZapfDingbats"));
    assert!(!font.has(b"Encoding"));
    assert!(!font.has(b"FirstChar"));
    assert!(!font.has(b"Widths"));
}

#[test]
fn balanced_page_tree() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    let mut ids = Vec::new();
    for i in 0..25 {
        let mut page = writer.new_page(a4());
        page.stream_mut(PageLayer::Content)
            .extend_from_slice(format!("% page {i}\n").as_bytes());
        ids.push(writer.add_page(page).unwrap());
    }
    let (bytes, _) = writer.finish().unwrap();
    let doc = parse(&bytes);

    assert_eq!(doc.get_pages().into_values().collect::<Vec<_>>(), ids);

    let root = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
    let root = doc.get_dictionary(root).unwrap();
    assert_eq!(root.get(b"Count").unwrap().as_i64().unwrap(), 25);
    assert!(root.has(b"ITXT"));
    let counts = root
        .get(b"Kids")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|kid| {
            let kid = doc.get_dictionary(kid.as_reference().unwrap()).unwrap();
            assert!(!kid.has(b"ITXT"));
            kid.get(b"Count").unwrap().as_i64().unwrap()
        })
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![10, 10, 5]);
}

#[test]
fn linear_mode_and_reordering() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    writer.set_linear_mode(None).unwrap();
    let mut ids = Vec::new();
    for _ in 0..12 {
        let page = writer.new_page(a4());
        ids.push(writer.add_page(page).unwrap());
    }
    let order = (1..=12).rev().collect::<Vec<usize>>();
    assert_eq!(writer.reorder_pages(&order).unwrap(), 12);
    let (bytes, warnings) = writer.finish().unwrap();
    assert_eq!(warnings.len(), 12);

    let doc = parse(&bytes);
    ids.reverse();
    assert_eq!(doc.get_pages().into_values().collect::<Vec<_>>(), ids);

    let root = doc.catalog().unwrap().get(b"Pages").unwrap().as_reference().unwrap();
    let kids = doc.get_dictionary(root).unwrap().get(b"Kids").unwrap().as_array().unwrap();
    assert_eq!(kids.len(), 12);
}

#[test]
fn reordering_needs_a_single_parent() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    for _ in 0..11 {
        let page = writer.new_page(a4());
        writer.add_page(page).unwrap();
    }
    assert!(matches!(
        writer.reorder_pages(&(1..=11).collect::<Vec<_>>()),
        Err(PdfError::ReorderMultipleParents { leaf_size: 10 })
    ));
    assert!(matches!(
        writer.set_linear_mode(None),
        Err(PdfError::LinearModeMultipleParents)
    ));
}

#[test]
fn layers_are_optional_content() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    let notes = writer.add_layer("Notes");
    let mut page = writer.new_page(a4());
    page.begin_layer(PageLayer::Content, &notes);
    page.stream_mut(PageLayer::Content)
        .extend_from_slice(b"10 10 100 100 re f\n");
    page.end_layer(PageLayer::Content).unwrap();
    let page_id = writer.add_page(page).unwrap();
    let (bytes, warnings) = writer.finish().unwrap();
    assert!(warnings.is_empty());

    let doc = parse(&bytes);
    let oc = doc.catalog().unwrap().get(b"OCProperties").unwrap().as_dict().unwrap();
    let ocgs = oc.get(b"OCGs").unwrap().as_array().unwrap();
    assert_eq!(ocgs, &vec![Object::Reference(notes.id())]);
    let ocg = doc.get_dictionary(notes.id()).unwrap();
    assert_eq!(ocg.get(b"Name").unwrap().as_str().unwrap(), b"Notes");

    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let properties = resources.get(b"Properties").unwrap().as_dict().unwrap();
    let key = format!("OC{}", notes.id().0);
    assert_eq!(
        properties.get(key.as_bytes()).unwrap(),
        &Object::Reference(notes.id())
    );
    let content = String::from_utf8(page_content(&doc, page)).unwrap();
    assert_eq!(content, format!("q\n/OC /{key} BDC\n10 10 100 100 re f\nEMC\nQ\n"));
}

#[test]
fn inherited_resources_get_fresh_names() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    let courier = writer.add_font(BuiltinFont::Courier);
    let inherited_font = writer
        .add_object(&Object::Dictionary(LoDictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Times-Roman".to_vec())),
        ])))
        .unwrap();
    let inherited = LoDictionary::from_iter(vec![(
        "Font",
        Object::Dictionary(LoDictionary::from_iter(vec![
            ("F1", Object::Reference(inherited_font)),
            ("Xi0", Object::Reference(inherited_font)),
        ])),
    )]);

    let mut first = writer.new_page_with_resources(a4(), Some(&inherited));
    writer.show_text(&mut first, &courier, 10.0, 0.0, 0.0, "a").unwrap();
    let first = writer.add_page(first).unwrap();
    let mut second = writer.new_page_with_resources(a4(), Some(&inherited));
    writer.show_text(&mut second, &courier, 10.0, 0.0, 0.0, "b").unwrap();
    let second = writer.add_page(second).unwrap();

    let (bytes, _) = writer.finish().unwrap();
    let doc = parse(&bytes);

    let first = doc.get_dictionary(first).unwrap();
    assert_eq!(
        font_of(&doc, first, b"F1").get(b"BaseFont").unwrap(),
        &name("Times-Roman")
    );
    assert_eq!(
        font_of(&doc, first, b"Xi1").get(b"BaseFont").unwrap(),
        &name("Courier")
    );
    assert!(page_content(&doc, first).starts_with(b"q\nBT\n/Xi1 10 Tf\n"));

    let second = doc.get_dictionary(second).unwrap();
    assert!(page_content(&doc, second).starts_with(b"q\nBT\n/Xi2 10 Tf\n"));
}

/// Glyph id = code point - 28 for printable ASCII
#[derive(Debug, Clone)]
struct AsciiFace;

impl FontData for AsciiFace {
    fn font_metrics(&self) -> FontMetrics {
        FontMetrics::default()
    }
    fn glyph_id(&self, code_point: u32) -> Option<u16> {
        match code_point {
            0x20..=0x7E => Some((code_point - 28) as u16),
            _ => None,
        }
    }
    fn glyph_count(&self) -> u16 {
        100
    }
    fn glyph_metrics(&self, _glyph_id: u16) -> Option<GlyphMetrics> {
        Some(GlyphMetrics { width: 500, height: 1000 })
    }
}

#[test]
fn unicode_and_type3_fonts() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed()).unwrap();
    let unicode = writer.add_font(TrueTypeUnicodeFont::new(
        "AsciiSans",
        Box::new(AsciiFace),
        Some(b"\x00\x01\x00\x00font program".to_vec()),
    ));
    let mut stamp = Type3Font::new("Stamp", false);
    stamp
        .define_glyph('x', 600, [0.0, 0.0, 600.0, 700.0], b"0 0 m 600 700 l S")
        .unwrap();
    let stamp = writer.add_font(stamp);

    let mut page = writer.new_page(a4());
    writer.show_text(&mut page, &unicode, 12.0, 10.0, 10.0, "AB").unwrap();
    writer.show_text(&mut page, &stamp, 12.0, 10.0, 30.0, "x").unwrap();
    assert!(matches!(
        writer.show_text(&mut page, &stamp, 12.0, 10.0, 30.0, "y"),
        Err(PdfError::Type3GlyphNotDefined { codepoint: 0x79, .. })
    ));
    let page_id = writer.add_page(page).unwrap();

    let (bytes, _) = writer.finish().unwrap();
    let doc = parse(&bytes);
    let page = doc.get_dictionary(page_id).unwrap();
    let content = page_content(&doc, page);
    assert!(String::from_utf8_lossy(&content).contains("<00250026> Tj"));

    let type0 = font_of(&doc, page, b"F1");
    assert_eq!(type0.get(b"Subtype").unwrap(), &name("Type0"));
    assert_eq!(type0.get(b"Encoding").unwrap(), &name("Identity-H"));
    let to_unicode = type0.get(b"ToUnicode").unwrap().as_reference().unwrap();
    let cmap = stream_data(&doc, to_unicode);
    assert!(String::from_utf8_lossy(&cmap).contains("2 beginbfrange\n<0025><0025><0041>\n<0026><0026><0042>\n"));

    let descendant = type0.get(b"DescendantFonts").unwrap().as_array().unwrap()[0]
        .as_reference()
        .unwrap();
    let cid_font = doc.get_dictionary(descendant).unwrap();
    assert_eq!(cid_font.get(b"Subtype").unwrap(), &name("CIDFontType2"));

    let type3 = font_of(&doc, page, b"F2");
    assert_eq!(type3.get(b"Subtype").unwrap(), &name("Type3"));
    assert_eq!(type3.get(b"FirstChar").unwrap().as_i64().unwrap(), 120);
    assert_eq!(type3.get(b"LastChar").unwrap().as_i64().unwrap(), 120);
}

#[test]
fn encrypted_strings_and_streams() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed())
        .unwrap()
        .with_password("user", "owner", -1, pdfbody::KeyLength::Bits128);
    let font = writer.add_font(BuiltinFont::Helvetica);
    let mut page = writer.new_page(a4());
    writer.show_text(&mut page, &font, 12.0, 0.0, 0.0, "Secret").unwrap();
    writer.add_page(page).unwrap();
    writer.set_info(DocumentInfo::new().with_title("Classified"));
    let mut out = Vec::new();
    writer.save(&mut out).unwrap();

    let text = String::from_utf8_lossy(&out);
    assert!(!text.contains("<536563726574> Tj"));
    assert!(!text.contains("(Classified)"));
    assert!(text.contains("/Filter /Standard"));
    let trailer = &text[text.rfind("trailer").unwrap()..];
    assert!(trailer.contains("/Encrypt"));
    assert!(trailer.contains("/ID"));
}

#[test]
fn encrypted_file_decrypts_with_the_user_password() {
    let mut writer = PdfWriter::new(PdfWriterOptions::uncompressed())
        .unwrap()
        .with_password("", "owner", -1, pdfbody::KeyLength::Bits128);
    let font = writer.add_font(BuiltinFont::Helvetica);
    let mut page = writer.new_page(a4());
    writer.show_text(&mut page, &font, 12.0, 0.0, 0.0, "Secret").unwrap();
    let page_id = writer.add_page(page).unwrap();
    writer.set_info(DocumentInfo::new().with_title("Classified"));
    let (bytes, _) = writer.finish().unwrap();
    assert!(!String::from_utf8_lossy(&bytes).contains("(Classified)"));

    // lopdf decrypts with the empty user password while loading
    let doc = parse(&bytes);
    let info = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = doc.get_dictionary(info).unwrap();
    assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"Classified");

    let page = doc.get_dictionary(page_id).unwrap();
    let content = page_content(&doc, page);
    assert!(String::from_utf8_lossy(&content).contains("<536563726574> Tj"));
}
