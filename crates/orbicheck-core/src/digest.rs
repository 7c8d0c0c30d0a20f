//! # Canonical JSON
//!
//! Deterministic JSON rendering used wherever a digest must be stable
//! across equivalent inputs — notably `address_hash` (§3: `SHA-256` of
//! the canonical JSON of normalized address fields). The actual hashing
//! primitive lives in `orbicheck-crypto`; this module only owns
//! canonicalization, keeping the hashing crate free of JSON concerns.

use serde_json::Value;

/// Render a JSON value with object keys sorted recursively and no
/// insignificant whitespace. Two `serde_json::Value`s that are
/// structurally equal produce byte-identical output regardless of the
/// original key order.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string keys always serialize"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
