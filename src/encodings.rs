//! Single-byte text encodings and glyph names.

use lopdf::Object;

/// Unicode values of the WinAnsi codes 0x80..=0x9F, 0 marks an unused code
const WIN_ANSI_HIGH: [u16; 32] = [
    8364, 0, 8218, 402, 8222, 8230, 8224, 8225, 710, 8240, 352, 8249, 338, 0, 381, 0, //
    0, 8216, 8217, 8220, 8221, 8226, 8211, 8212, 732, 8482, 353, 8250, 339, 0, 382, 376,
];

/// Encodes a character with `WinAnsiEncoding` (code page 1252)
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    if code < 128 || (160..=255).contains(&code) {
        return Some(code as u8);
    }
    WIN_ANSI_HIGH
        .iter()
        .position(|&u| u != 0 && u32::from(u) == code)
        .map(|i| 0x80 + i as u8)
}

/// Unicode value of a WinAnsi code
pub fn win_ansi_char(byte: u8) -> Option<char> {
    match byte {
        0x80..=0x9F => match WIN_ANSI_HIGH[usize::from(byte - 0x80)] {
            0 => None,
            u => char::from_u32(u32::from(u)),
        },
        b => Some(char::from(b)),
    }
}

/// The "symboltt" pre-encoding of symbolic TrueType fonts: characters in the
/// first page or in the private use page `U+F0xx` map to their low byte.
pub fn symbol_tt_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code & 0xFFFF_FF00 {
        0x0000 | 0xF000 => Some((code & 0xFF) as u8),
        _ => None,
    }
}

const ASCII_NAMES: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand", "quotesingle",
    "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen", "period", "slash", "zero",
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "colon", "semicolon",
    "less", "equal", "greater", "question", "at", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J",
    "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "bracketleft",
    "backslash", "bracketright", "asciicircum", "underscore", "grave", "a", "b", "c", "d", "e",
    "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x",
    "y", "z", "braceleft", "bar", "braceright", "asciitilde",
];

const LATIN1_NAMES: [&str; 96] = [
    "space", "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section",
    "dieresis", "copyright", "ordfeminine", "guillemotleft", "logicalnot", "hyphen", "registered",
    "macron", "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu", "paragraph",
    "periodcentered", "cedilla", "onesuperior", "ordmasculine", "guillemotright", "onequarter",
    "onehalf", "threequarters", "questiondown", "Agrave", "Aacute", "Acircumflex", "Atilde",
    "Adieresis", "Aring", "AE", "Ccedilla", "Egrave", "Eacute", "Ecircumflex", "Edieresis",
    "Igrave", "Iacute", "Icircumflex", "Idieresis", "Eth", "Ntilde", "Ograve", "Oacute",
    "Ocircumflex", "Otilde", "Odieresis", "multiply", "Oslash", "Ugrave", "Uacute", "Ucircumflex",
    "Udieresis", "Yacute", "Thorn", "germandbls", "agrave", "aacute", "acircumflex", "atilde",
    "adieresis", "aring", "ae", "ccedilla", "egrave", "eacute", "ecircumflex", "edieresis",
    "igrave", "iacute", "icircumflex", "idieresis", "eth", "ntilde", "ograve", "oacute",
    "ocircumflex", "otilde", "odieresis", "divide", "oslash", "ugrave", "uacute", "ucircumflex",
    "udieresis", "yacute", "thorn", "ydieresis",
];

/// Adobe standard glyph name of a Unicode code point, for ASCII, Latin-1 and
/// the rest of the WinAnsi repertoire
pub fn glyph_name(code_point: u32) -> Option<&'static str> {
    let name = match code_point {
        0x20..=0x7E => ASCII_NAMES[(code_point - 0x20) as usize],
        0xA0..=0xFF => LATIN1_NAMES[(code_point - 0xA0) as usize],
        0x0152 => "OE",
        0x0153 => "oe",
        0x0160 => "Scaron",
        0x0161 => "scaron",
        0x0178 => "Ydieresis",
        0x017D => "Zcaron",
        0x017E => "zcaron",
        0x0192 => "florin",
        0x02C6 => "circumflex",
        0x02DC => "tilde",
        0x2013 => "endash",
        0x2014 => "emdash",
        0x2018 => "quoteleft",
        0x2019 => "quoteright",
        0x201A => "quotesinglbase",
        0x201C => "quotedblleft",
        0x201D => "quotedblright",
        0x201E => "quotedblbase",
        0x2020 => "dagger",
        0x2021 => "daggerdbl",
        0x2022 => "bullet",
        0x2026 => "ellipsis",
        0x2030 => "perthousand",
        0x2039 => "guilsinglleft",
        0x203A => "guilsinglright",
        0x20AC => "Euro",
        0x2122 => "trademark",
        _ => return None,
    };
    Some(name)
}

/// Standard glyph name, or `a<code point>` if there is none
pub fn glyph_name_or_synthetic(code_point: u32) -> String {
    match glyph_name(code_point) {
        Some(name) => name.to_string(),
        None => format!("a{code_point}"),
    }
}

/// Builds a `/Differences` array from `(code, unicode)` pairs sorted by code.
///
/// A code is only written where a run of consecutive codes starts, every
/// entry then adds the glyph name of its Unicode value.
pub fn differences<I>(codes: I) -> Vec<Object>
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let mut out = Vec::new();
    let mut last: i64 = -1;
    for (code, unicode) in codes {
        if i64::from(code) > last {
            last = i64::from(code);
            out.push(Object::Integer(last));
        }
        last += 1;
        out.push(Object::Name(glyph_name_or_synthetic(unicode).into_bytes()));
    }
    out
}

/// Writes a code point as a ToUnicode destination: four hex digits, or a
/// UTF-16 surrogate pair above the BMP
pub fn to_unicode_hex(code_point: u32) -> String {
    if code_point < 0x10000 {
        return format!("<{code_point:04X}>");
    }
    let v = code_point - 0x10000;
    let high = 0xD800 + (v >> 10);
    let low = 0xDC00 + (v & 0x3FF);
    format!("<{high:04X}{low:04X}>")
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn win_ansi() {
        assert_eq!(win_ansi_byte('A'), Some(65));
        assert_eq!(win_ansi_byte('é'), Some(0xE9));
        assert_eq!(win_ansi_byte('€'), Some(0x80));
        assert_eq!(win_ansi_byte('ÿ'), Some(0xFF));
        assert_eq!(win_ansi_byte('Ÿ'), Some(0x9F));
        // C1 control characters are not part of the encoding
        assert_eq!(win_ansi_byte('\u{0085}'), None);
        assert_eq!(win_ansi_byte('Ω'), None);
        assert_eq!(win_ansi_char(0x80), Some('€'));
        assert_eq!(win_ansi_char(0x81), None);
    }

    #[test]
    fn symbol_tt() {
        assert_eq!(symbol_tt_byte('\u{F041}'), Some(0x41));
        assert_eq!(symbol_tt_byte('a'), Some(0x61));
        assert_eq!(symbol_tt_byte('\u{0141}'), None);
    }

    #[test]
    fn glyph_names() {
        assert_eq!(glyph_name(u32::from('A')), Some("A"));
        assert_eq!(glyph_name(0x20), Some("space"));
        assert_eq!(glyph_name(0xDF), Some("germandbls"));
        assert_eq!(glyph_name(0x20AC), Some("Euro"));
        assert_eq!(glyph_name_or_synthetic(0x4E2D), "a20013");
    }

    #[test]
    fn differences_runs() {
        let diffs = differences(vec![(65, 65), (66, 66), (70, 70)]);
        assert_eq!(
            diffs,
            vec![
                Object::Integer(65),
                Object::Name(b"A".to_vec()),
                Object::Name(b"B".to_vec()),
                Object::Integer(70),
                Object::Name(b"F".to_vec()),
            ]
        );
    }

    #[test]
    fn unicode_hex() {
        assert_eq!(to_unicode_hex(0x41), "<0041>");
        assert_eq!(to_unicode_hex(0x1F600), "<D83DDE00>");
    }
}
