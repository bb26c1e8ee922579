//! Canonical JSON encoding used for block identity.
//!
//! Blocks are hashed over a sorted-key JSON rendering that matches, byte for
//! byte, the encoder other ledger implementations use: `", "` between items,
//! `": "` between a key and its value, non-ASCII escaped as `\uXXXX`, and
//! floats in shortest round-trip form with a `1e+16` style exponent.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur while producing canonical bytes
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Field `{field}` is not a finite number")]
    NonFiniteNumber { field: String },

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Encodes `value` as canonical JSON bytes.
///
/// Non-finite floats must be rejected by the caller beforehand: serde_json
/// turns them into `null`, which would silently change the record.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let value = sort_keys(serde_json::to_value(value)?);

    let mut buf = Vec::with_capacity(256);
    let mut serializer = Serializer::with_formatter(&mut buf, CanonicalFormatter);
    value.serialize(&mut serializer)?;

    Ok(buf)
}

/// SHA-256 of the canonical encoding, as lowercase hex
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String, SerializationError> {
    let bytes = to_canonical_bytes(value)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Rebuilds every object with its keys in code point order.
///
/// The map type may preserve insertion order when serde_json is built with
/// `preserve_order`, so the order is imposed here instead of relied upon.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(format_float(value).as_bytes())
    }

    // serde_json has already escaped quotes, backslashes and control
    // characters; everything else outside printable ASCII is escaped here.
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.bytes().all(|b| (0x20..0x7f).contains(&b)) {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if (' '..='~').contains(&ch) {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units).iter() {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Renders a finite float in shortest round-trip form.
///
/// Decimal exponents in `-4..16` use fixed notation with at least one
/// fractional digit (`5.0`, `0.0001`); anything else uses scientific notation
/// with a signed, two-digit-minimum exponent (`1e-05`, `1.5e+16`).
pub fn format_float(value: f64) -> String {
    // `{:e}` yields the shortest digits that round-trip, e.g. "-1.25e-7"
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = match exponent.parse() {
        Ok(exponent) => exponent,
        Err(_) => return scientific,
    };

    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let mut out = String::from(sign);
    if (-4..16).contains(&exponent) {
        let point = exponent + 1;
        if point <= 0 {
            out.push_str("0.");
            out.push_str(&"0".repeat(point.unsigned_abs() as usize));
            out.push_str(&digits);
        } else if point as usize >= digits.len() {
            out.push_str(&digits);
            out.push_str(&"0".repeat(point as usize - digits.len()));
            out.push_str(".0");
        } else {
            let (whole, fraction) = digits.split_at(point as usize);
            out.push_str(whole);
            out.push('.');
            out.push_str(fraction);
        }
    } else {
        let (lead, rest) = digits.split_at(1);
        out.push_str(lead);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        out.push_str(&format!("e{}{:02}", exponent_sign, exponent.unsigned_abs()));
    }

    out
}
