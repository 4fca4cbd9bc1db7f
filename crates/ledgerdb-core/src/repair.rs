//! Loose JSON repair.
//!
//! Row payloads are typed by people, not serializers: single quotes, bare
//! keys, trailing commas and double-encoded strings all occur. [`repair`]
//! runs an ordered pipeline of text stages, attempting a strict parse after
//! each one and stopping at the first object. When no stage yields valid
//! JSON, two extractors try to recover `key: value` pairs directly.
//!
//! The stage order is part of the read contract for data already on the
//! ledger; changing it changes how old rows decode.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// A recovered record.
pub type Record = Map<String, Value>;

/// Field name used when a write-path payload cannot be structured.
pub const VALUE_FIELD: &str = "value";

/// Field name used when a read-path payload cannot be structured.
pub const RAW_FIELD: &str = "raw";

/// A pure text-to-text repair stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Strip one layer of matching outer quotes.
    UnwrapQuotes,
    /// Turn `\"` and `\'` into bare quotes.
    UnescapeQuotes,
    /// Rewrite `'...'` literals as `"..."`.
    SingleToDoubleQuotes,
    /// Quote bare identifier keys after `{` or `,`.
    QuoteKeys,
    /// Drop commas directly before `}` or `]`.
    StripTrailingCommas,
}

/// Stages in application order.
pub const PIPELINE: [Stage; 5] = [
    Stage::UnwrapQuotes,
    Stage::UnescapeQuotes,
    Stage::SingleToDoubleQuotes,
    Stage::QuoteKeys,
    Stage::StripTrailingCommas,
];

impl Stage {
    pub fn apply(self, text: &str) -> String {
        match self {
            Stage::UnwrapQuotes => unwrap_quotes(text),
            Stage::UnescapeQuotes => text.replace("\\\"", "\"").replace("\\'", "'"),
            Stage::SingleToDoubleQuotes => single_to_double(text),
            Stage::QuoteKeys => quote_keys(text),
            Stage::StripTrailingCommas => strip_trailing_commas(text),
        }
    }
}

/// Recover a record from loosely formatted text.
///
/// Returns `None` only when no structure at all can be found.
pub fn repair(text: &str) -> Option<Record> {
    if let Some(record) = parse_strict(text) {
        return Some(record);
    }

    let mut current = text.to_string();
    for stage in PIPELINE {
        current = stage.apply(&current);
        if let Some(record) = parse_strict(&current) {
            return Some(record);
        }
    }

    // Single-to-double rewriting can expose keys the first pass missed.
    let requoted = Stage::QuoteKeys.apply(&current);
    if let Some(record) = parse_strict(&requoted) {
        return Some(record);
    }

    extract_single_pair(&current).or_else(|| extract_pairs(&current))
}

/// [`repair`], falling back to `{ "value": text.trim() }`.
pub fn repair_or_value(text: &str) -> Record {
    repair(text).unwrap_or_else(|| single_field(VALUE_FIELD, text.trim()))
}

/// [`repair`], falling back to `{ "raw": text }`.
pub fn repair_or_raw(text: &str) -> Record {
    repair(text).unwrap_or_else(|| single_field(RAW_FIELD, text))
}

/// Strict JSON parse that only accepts objects.
pub fn parse_strict(text: &str) -> Option<Record> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn single_field(key: &str, value: &str) -> Record {
    let mut record = Record::new();
    record.insert(key.to_string(), Value::String(value.to_string()));
    record
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex must compile"))
}

/// Matches a double-quoted string so replacements can skip over it.
const DQ: &str = r#""(?:[^"\\]|\\.)*""#;

fn unwrap_quotes(text: &str) -> String {
    let trimmed = text.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

fn single_to_double(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(&RE, &format!(r#"{DQ}|'((?:[^'\\]|\\.)*)'"#));

    re.replace_all(text, |caps: &Captures| match caps.get(1) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len() + 2);
            out.push('"');
            let mut chars = inner.as_str().chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some('\'') => out.push('\''),
                        Some(next) => {
                            out.push('\\');
                            out.push(next);
                        }
                        None => out.push_str("\\\\"),
                    },
                    '"' => out.push_str("\\\""),
                    _ => out.push(c),
                }
            }
            out.push('"');
            out
        }
        None => caps[0].to_string(),
    })
    .into_owned()
}

fn quote_keys(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &RE,
        &format!(r#"{DQ}|([{{,]\s*)([A-Za-z_$][A-Za-z0-9_$\-]*)(\s*:)"#),
    );

    re.replace_all(text, |caps: &Captures| match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(lead), Some(key), Some(colon)) => {
            format!("{}\"{}\"{}", lead.as_str(), key.as_str(), colon.as_str())
        }
        _ => caps[0].to_string(),
    })
    .into_owned()
}

fn strip_trailing_commas(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(&RE, &format!(r#"{DQ}|,(\s*[}}\]])"#));

    re.replace_all(text, |caps: &Captures| match caps.get(1) {
        Some(close) => close.as_str().to_string(),
        None => caps[0].to_string(),
    })
    .into_owned()
}

/// Recover exactly one `key: value` pair (no top-level comma in the value).
fn extract_single_pair(text: &str) -> Option<Record> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &RE,
        r#"^\s*\{?\s*["']?([A-Za-z_$][A-Za-z0-9_$\- ]*?)["']?\s*:\s*([^,]*?)\s*\}?\s*$"#,
    );

    let caps = re.captures(text)?;
    let key = caps.get(1)?.as_str().trim();
    if key.is_empty() {
        return None;
    }
    let mut record = Record::new();
    record.insert(key.to_string(), coerce_value(caps.get(2)?.as_str()));
    Some(record)
}

/// Greedy `key: value, key: value` tokenizer. Each value runs until the
/// next key marker.
fn extract_pairs(text: &str) -> Option<Record> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &RE,
        r#"(?:^|[{,])\s*["']?([A-Za-z_$][A-Za-z0-9_$\-]*)["']?\s*:"#,
    );

    let body = text.trim();
    let markers: Vec<_> = re.captures_iter(body).collect();
    if markers.is_empty() {
        return None;
    }

    let mut record = Record::new();
    for (i, caps) in markers.iter().enumerate() {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(body.len());
        let raw = &body[whole.end()..end];
        let raw = raw.trim().trim_end_matches('}').trim_end_matches(',').trim();
        record.insert(key.as_str().to_string(), coerce_value(raw));
    }

    if record.is_empty() {
        None
    } else {
        Some(record)
    }
}

/// Turn a loose scalar into a JSON value.
fn coerce_value(raw: &str) -> Value {
    let trimmed = raw.trim().trim_end_matches(',').trim();

    if let Some(unquoted) = strip_outer_quotes(trimmed) {
        return Value::String(unquoted.to_string());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        Ok(v @ (Value::Object(_) | Value::Array(_))) => v,
        _ => Value::String(trimmed.to_string()),
    }
}

fn strip_outer_quotes(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return Some(&s[1..s.len() - 1]);
        }
    }
    None
}
