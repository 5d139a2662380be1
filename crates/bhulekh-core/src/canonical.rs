//! Canonical JSON encoding for record hashing.
//!
//! Object keys sorted, no incidental whitespace (`","`/`":"` separators
//! only), every non-ASCII character escaped as `\uXXXX` so the byte string
//! depends only on logical content. The content hash of every persisted
//! record is SHA-256 over the UTF-8 bytes of this encoding, which makes the
//! format load-bearing: any change to ordering, separators, or escaping
//! invalidates every previously persisted chain. Treat this module as
//! frozen (encoding version 1).

use serde_json::Value;

/// Render `value` in the canonical form described in the module docs.
pub fn to_canonical_string(value: &Value) -> String {
  let mut out = String::new();
  write_value(&mut out, value);
  out
}

fn write_value(out: &mut String, value: &Value) {
  match value {
    Value::Null => out.push_str("null"),
    Value::Bool(true) => out.push_str("true"),
    Value::Bool(false) => out.push_str("false"),
    // serde_json's Display for Number is the same shortest-round-trip
    // rendering its serializer uses, so it is deterministic.
    Value::Number(n) => out.push_str(&n.to_string()),
    Value::String(s) => write_string(out, s),
    Value::Array(items) => {
      out.push('[');
      for (i, item) in items.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_value(out, item);
      }
      out.push(']');
    }
    Value::Object(map) => {
      // Sort explicitly rather than relying on the map's iteration order,
      // so the encoding survives serde_json's `preserve_order` feature
      // being switched on by some downstream build.
      let mut keys: Vec<&String> = map.keys().collect();
      keys.sort();

      out.push('{');
      for (i, key) in keys.iter().enumerate() {
        if i > 0 {
          out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, &map[key.as_str()]);
      }
      out.push('}');
    }
  }
}

fn write_string(out: &mut String, s: &str) {
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\u{08}' => out.push_str("\\b"),
      '\u{0c}' => out.push_str("\\f"),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c if (c as u32) < 0x20 => {
        out.push_str(&format!("\\u{:04x}", c as u32));
      }
      c if c.is_ascii() => out.push(c),
      c => {
        // Escape to ASCII; astral characters become a UTF-16 pair.
        let mut buf = [0u16; 2];
        for unit in c.encode_utf16(&mut buf) {
          out.push_str(&format!("\\u{unit:04x}"));
        }
      }
    }
  }
  out.push('"');
}
