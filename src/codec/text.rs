//! Built-in JSON text encoder.
//!
//! Output is pure ASCII: every non-ASCII character is written as one or two
//! `\uXXXX` escapes over UTF-16 code units, so the text can travel in a
//! header value unchanged.
//!
//! Byte strings are walked byte by byte rather than trusted as UTF-8:
//!
//! | Input                              | Output                     |
//! |------------------------------------|----------------------------|
//! | `\b` `\t` `\n` `\f` `\r`           | two-character escape       |
//! | `"` `\` `/`                        | backslash-escaped          |
//! | other bytes `0x20..=0x7F`          | literal                    |
//! | other control bytes                | dropped                    |
//! | lead byte of a 2..6 byte sequence  | decoded, `\uXXXX`          |
//! | stray continuation, `0xFE`, `0xFF` | dropped                    |
//! | truncated sequence, > U+10FFFF     | `\ufffd`                   |

use std::fmt::Write as _;

use crate::error::{Result, WildfireError};
use crate::value::{Key, Mapping, ObjectRef, SharedRef, Value};

/// Written in place of a container that is already being serialized.
pub const RECURSION_MARKER: &str = "Recursion";

const REPLACEMENT: u32 = 0xFFFD;

/// Serializer with its own re-entrancy stack.
///
/// The stack is independent of the sanitizing encoder's guard, so raw
/// (unsanitized) graphs can be serialized directly without looping.
///
/// # Example
///
/// ```
/// use wildfire_client::codec::TextEncoder;
/// use wildfire_client::value::Value;
///
/// let mut encoder = TextEncoder::new();
/// let text = encoder
///     .encode(&Value::map([("a", Value::Int(1)), ("b", Value::seq([1, 2, 3]))]))
///     .unwrap();
/// assert_eq!(text, r#"{"a":1,"b":[1,2,3]}"#);
///
/// let text = encoder.encode(&Value::from("é/\"")).unwrap();
/// assert_eq!(text, r#""\u00e9\/\"""#);
/// ```
#[derive(Debug, Default)]
pub struct TextEncoder {
    stack: Vec<usize>,
}

impl TextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value` to JSON text.
    ///
    /// On failure nothing is returned and the stack is left as it was.
    pub fn encode(&mut self, value: &Value) -> Result<String> {
        let mark = self.stack.len();
        let mut out = String::new();
        match self.write_value(&mut out, value) {
            Ok(()) => Ok(out),
            Err(e) => {
                self.stack.truncate(mark);
                Err(e)
            }
        }
    }

    fn write_value(&mut self, out: &mut String, value: &Value) -> Result<()> {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Int(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Float(f) => write_float(out, *f)?,
            Value::String(s) => write_string(out, s.as_bytes()),
            Value::Bytes(b) => write_string(out, b),
            Value::Sequence(items) => self.write_sequence(out, items)?,
            Value::Mapping(map) => self.write_mapping(out, map)?,
            Value::Shared(shared) => self.write_shared(out, shared)?,
            Value::Composite(object) => self.write_object(out, object)?,
        }
        Ok(())
    }

    fn write_sequence(&mut self, out: &mut String, items: &[Value]) -> Result<()> {
        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            self.write_value(out, item)?;
        }
        out.push(']');
        Ok(())
    }

    fn write_mapping(&mut self, out: &mut String, map: &Mapping) -> Result<()> {
        out.push('{');
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_key(out, key);
            out.push(':');
            self.write_value(out, value)?;
        }
        out.push('}');
        Ok(())
    }

    fn write_shared(&mut self, out: &mut String, shared: &SharedRef) -> Result<()> {
        let id = shared.id();
        if self.stack.contains(&id) {
            write_string(out, RECURSION_MARKER.as_bytes());
            return Ok(());
        }
        self.stack.push(id);
        self.write_value(out, &shared.borrow())?;
        self.stack.pop();
        Ok(())
    }

    /// A raw composite is written as its class name followed by its live
    /// slots. Visibility and filters are the sanitizing encoder's business.
    fn write_object(&mut self, out: &mut String, object: &ObjectRef) -> Result<()> {
        let id = object.id();
        if self.stack.contains(&id) {
            write_string(out, RECURSION_MARKER.as_bytes());
            return Ok(());
        }
        self.stack.push(id);

        out.push_str("{\"__className\":");
        write_string(out, object.type_name().as_bytes());
        let slots = object.slots().clone();
        for (name, value) in &slots {
            out.push(',');
            write_string(out, name.as_bytes());
            out.push(':');
            self.write_value(out, value)?;
        }
        out.push('}');

        self.stack.pop();
        Ok(())
    }
}

/// Serialize with a fresh [`TextEncoder`].
pub fn serialize(value: &Value) -> Result<String> {
    TextEncoder::new().encode(value)
}

fn write_float(out: &mut String, f: f64) -> Result<()> {
    if !f.is_finite() {
        return Err(WildfireError::UnsupportedValueKind(format!(
            "non-finite float {}",
            f
        )));
    }
    let _ = write!(out, "{}", f);
    Ok(())
}

fn write_key(out: &mut String, key: &Key) {
    match key {
        Key::Bytes(b) => write_string(out, b),
        other => write_string(out, other.text().as_bytes()),
    }
}

/// Write `bytes` as a quoted, escaped JSON string.
pub fn write_string(out: &mut String, bytes: &[u8]) {
    out.reserve(bytes.len() + 2);
    out.push('"');

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x08 => out.push_str("\\b"),
            0x09 => out.push_str("\\t"),
            0x0A => out.push_str("\\n"),
            0x0C => out.push_str("\\f"),
            0x0D => out.push_str("\\r"),
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'/' => out.push_str("\\/"),
            0x20..=0x7F => out.push(b as char),
            0x00..=0x1F => {}
            0x80..=0xBF | 0xFE | 0xFF => {}
            _ => {
                let (cp, len) = decode_sequence(&bytes[i..]);
                write_code_point(out, cp);
                i += len;
                continue;
            }
        }
        i += 1;
    }

    out.push('"');
}

/// Decode one multi-byte sequence starting at a lead byte in `0xC0..=0xFD`.
///
/// Returns the code point and the number of bytes consumed. A sequence cut
/// short by the end of input or by a non-continuation byte consumes the
/// bytes seen so far and yields U+FFFD.
fn decode_sequence(bytes: &[u8]) -> (u32, usize) {
    let lead = bytes[0];
    let (len, mut cp) = match lead {
        0xC0..=0xDF => (2, u32::from(lead & 0x1F)),
        0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
        0xF0..=0xF7 => (4, u32::from(lead & 0x07)),
        0xF8..=0xFB => (5, u32::from(lead & 0x03)),
        _ => (6, u32::from(lead & 0x01)),
    };

    for n in 1..len {
        match bytes.get(n) {
            Some(&c) if c & 0xC0 == 0x80 => cp = (cp << 6) | u32::from(c & 0x3F),
            _ => return (REPLACEMENT, n),
        }
    }
    (cp, len)
}

fn write_code_point(out: &mut String, cp: u32) {
    if cp > 0x10FFFF {
        write_unit(out, REPLACEMENT);
    } else if cp >= 0x10000 {
        let v = cp - 0x10000;
        write_unit(out, 0xD800 | (v >> 10));
        write_unit(out, 0xDC00 | (v & 0x3FF));
    } else {
        write_unit(out, cp);
    }
}

#[inline]
fn write_unit(out: &mut String, unit: u32) {
    let _ = write!(out, "\\u{:04x}", unit);
}
