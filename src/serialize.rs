//! Byte encoding of PDF values.
//!
//! The value model is `lopdf::Object`, but the bytes are produced here so the
//! writer controls object framing, `/Length` and per-object encryption.

use std::borrow::Cow;

use lopdf::{Dictionary as LoDictionary, Object, Stream as LoStream, StringFormat};

use crate::encryption::ObjectEncryption;

/// Appends the encoding of `obj` to `out`. If `crypt` is set, string and
/// stream data is run through it, which must already be keyed for the
/// enclosing indirect object.
pub fn write_object(obj: &Object, out: &mut Vec<u8>, crypt: Option<&dyn ObjectEncryption>) {
    use lopdf::Object::*;
    match obj {
        Null => out.extend_from_slice(b"null"),
        Boolean(b) => {
            let s: &[u8] = if *b { b"true" } else { b"false" };
            out.extend_from_slice(s);
        }
        Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Real(r) => out.extend_from_slice(format_number(f64::from(*r)).as_bytes()),
        Name(n) => write_name(n, out),
        String(bytes, format) => {
            let bytes = match crypt {
                Some(c) => Cow::Owned(c.encrypt(bytes)),
                None => Cow::Borrowed(bytes.as_slice()),
            };
            match format {
                StringFormat::Literal => write_literal_string(&bytes, out),
                StringFormat::Hexadecimal => write_hex_string(&bytes, out),
            }
        }
        Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(item, out, crypt);
            }
            out.push(b']');
        }
        Dictionary(dict) => write_dictionary(dict, out, crypt),
        Stream(stream) => write_stream(stream, out, crypt),
        Reference((number, generation)) => {
            out.extend_from_slice(format!("{number} {generation} R").as_bytes());
        }
    }
}

/// Writes `<</Key value /Key2 value2>>`, keys in insertion order
pub fn write_dictionary(dict: &LoDictionary, out: &mut Vec<u8>, crypt: Option<&dyn ObjectEncryption>) {
    out.extend_from_slice(b"<<");
    for (i, (key, value)) in dict.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        write_name(key, out);
        out.push(b' ');
        write_object(value, out, crypt);
    }
    out.extend_from_slice(b">>");
}

/// The declared `/Length` is always the number of bytes between `stream` and
/// `endstream`, i.e. after filters and encryption were applied.
pub fn write_stream(stream: &LoStream, out: &mut Vec<u8>, crypt: Option<&dyn ObjectEncryption>) {
    let data = match crypt {
        Some(c) => Cow::Owned(c.encrypt(&stream.content)),
        None => Cow::Borrowed(stream.content.as_slice()),
    };
    let mut dict = stream.dict.clone();
    dict.set("Length", data.len() as i64);
    write_dictionary(&dict, out, crypt);
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(&data);
    out.extend_from_slice(b"\nendstream");
}

pub fn write_name(name: &[u8], out: &mut Vec<u8>) {
    out.push(b'/');
    for &b in name {
        let delimiter = matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        );
        if delimiter || !(0x21..=0x7e).contains(&b) {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn write_literal_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

fn write_hex_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'<');
    for b in bytes {
        out.extend_from_slice(format!("{b:02X}").as_bytes());
    }
    out.push(b'>');
}

/// Formats a number the way it appears in content streams and objects:
/// integral values without a decimal point, at most five fractional digits
/// otherwise.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 100_000.0).round() / 100_000.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        return (rounded as i64).to_string();
    }
    let s = format!("{rounded:.5}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Encodes a standalone value, without encryption
pub fn to_bytes(obj: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(obj, &mut out, None);
    out
}
