//! Cache key generation
//!
//! A key is the SHA-256 digest of the lower-cased callable identity followed
//! by the digest of the canonical JSON encoding of the argument list. The
//! callable digest is always 64 hex characters, so the concatenation cannot
//! be ambiguous. An empty argument list contributes nothing.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::store::CallValue;

/// Identity of a method on a target type, e.g. `Calculator::add`
pub fn callable_identity(type_name: &str, method: &str) -> String {
    format!("{type_name}::{method}")
}

/// Key for a call of `callable` with `args`
pub fn generate_callback_key(callable: &str, args: &[CallValue]) -> String {
    let mut key = sha256_hex(callable.to_lowercase().as_bytes());
    key.push_str(&generate_arguments_key(args));
    key
}

/// Digest of the argument list, or the empty string when there are no arguments
pub fn generate_arguments_key(args: &[CallValue]) -> String {
    if args.is_empty() {
        return String::new();
    }

    let mut encoded = String::from("[");
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            encoded.push(',');
        }
        write_canonical(&mut encoded, arg);
    }
    encoded.push(']');

    sha256_hex(encoded.as_bytes())
}

/// Deterministic JSON encoding: object keys sorted, no whitespace
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));

            out.push('{');
            for (idx, (k, v)) in pairs.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_canonical(out, v);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::String(s) => write_string(out, s),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if c < '\u{20}' => {
                // Writing to a String cannot fail
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
