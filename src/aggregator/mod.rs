// Third-party aggregator API — client plus one module per platform.
//
// Each platform module bundles the endpoint wrappers, the item
// normalizer(s) for that platform's response shapes, and the source tier
// the fallback chain runs. Upstream payloads are handled as loose JSON:
// the same endpoint can return Web-, App- or legacy-shaped bodies, so
// field access goes through alias helpers that try known key spellings in
// priority order and coerce missing/malformed values to defaults instead
// of failing.

pub mod bilibili;
pub mod client;
pub mod douyin;
pub mod instagram;
pub mod kuaishou;
pub mod reddit;
pub mod threads;
pub mod tiktok;
pub mod twitter;
pub mod weibo;
pub mod xiaohongshu;

use serde_json::Value;

/// First non-empty string among the aliased keys.
pub(crate) fn str_of(v: &Value, keys: &[&str]) -> String {
    for k in keys {
        if let Some(s) = v.get(*k).and_then(Value::as_str) {
            if !s.is_empty() {
                return s.to_string();
            }
        }
    }
    String::new()
}

/// First usable identity among the aliased keys. Ids arrive as strings or
/// numbers depending on the endpoint generation.
pub(crate) fn id_of(v: &Value, keys: &[&str]) -> String {
    for k in keys {
        match v.get(*k) {
            Some(Value::String(s)) if !s.is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

/// First non-zero count among the aliased keys; 0 when none resolves.
/// Accepts numbers and numeric strings; negatives clamp to 0.
pub(crate) fn num_of(v: &Value, keys: &[&str]) -> u64 {
    for k in keys {
        if let Some(x) = v.get(*k) {
            let n = coerce_u64(x);
            if n > 0 {
                return n;
            }
        }
    }
    0
}

pub(crate) fn coerce_u64(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.parse().unwrap_or(0),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

/// Truthiness across the aliased keys, the way loosely-typed upstreams
/// report flags: true, nonzero numbers and "true" all count.
pub(crate) fn bool_of(v: &Value, keys: &[&str]) -> bool {
    for k in keys {
        match v.get(*k) {
            Some(Value::Bool(b)) => return *b,
            Some(Value::Number(n)) => return n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Some(Value::String(s)) => return s == "true" || s == "1",
            _ => {}
        }
    }
    false
}

/// First aliased key holding an array, cloned out for iteration.
pub(crate) fn list_of(v: &Value, keys: &[&str]) -> Vec<Value> {
    for k in keys {
        if let Some(arr) = v.get(*k).and_then(Value::as_array) {
            return arr.clone();
        }
    }
    Vec::new()
}

/// Continuation token: first aliased key with a non-empty string value.
pub(crate) fn token_of(v: &Value, keys: &[&str]) -> Option<String> {
    for k in keys {
        if let Some(s) = v.get(*k).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}
