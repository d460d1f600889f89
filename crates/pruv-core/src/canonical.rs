//! Canonical JSON encoding for deterministic hashing.
//!
//! - Object keys sorted by byte comparison
//! - No insignificant whitespace
//! - Strings emitted as UTF-8; only `"`, `\` and control characters are escaped
//! - Numbers use serde_json's shortest round-trip form
//!
//! The same logical value always produces identical bytes, and therefore
//! identical state hashes and proofs, across platforms.

use std::fmt::Write;

use serde_json::{Map, Value};

use crate::crypto::sha256_hex;

/// Encode a JSON value canonically.
pub fn canonical_json(value: &Value) -> String {
    let mut buf = String::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Hash of an output state: `SHA256(canonical_json(state ?? {}))`.
pub fn state_hash(state: Option<&Value>) -> String {
    match state {
        None | Some(Value::Null) => sha256_hex(b"{}"),
        Some(value) => sha256_hex(canonical_json(value).as_bytes()),
    }
}

/// The combined proof binding `x`, `operation`, `y` and `timestamp`.
pub fn proof(x: &str, operation: &str, y: &str, timestamp: i64) -> String {
    let material = format!("{x}:{operation}:{y}:{timestamp}");
    format!("xy_{}", sha256_hex(material.as_bytes()))
}

/// The bytes covered by an entry signature.
///
/// Canonical JSON of `{index, timestamp, operation, x, y, xy}`.
pub fn signed_message(
    index: u64,
    timestamp: i64,
    operation: &str,
    x: &str,
    y: &str,
    xy: &str,
) -> Vec<u8> {
    let fields = serde_json::json!({
        "index": index,
        "timestamp": timestamp,
        "operation": operation,
        "x": x,
        "y": y,
        "xy": xy,
    });
    canonical_json(&fields).into_bytes()
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut String, value: &Value) {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => buf.push_str(&n.to_string()),
        Value::String(s) => encode_string(buf, s),
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                encode_value_to(buf, item);
            }
            buf.push(']');
        }
        Value::Object(map) => encode_object_canonical(buf, map),
    }
}

fn encode_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0c}' => buf.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}

/// Keys are sorted by their UTF-8 bytes, which matches code point order.
fn encode_object_canonical(buf: &mut String, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        encode_string(buf, key);
        buf.push(':');
        encode_value_to(buf, value);
    }
    buf.push('}');
}
