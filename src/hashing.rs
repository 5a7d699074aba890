//! Hashing - SHA-256 for Compilation Hashes and Copy Change Detection

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex(&hasher.finalize())
}

/// Hash a file's contents.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let data = fs::read(path)?;
    Ok(sha256_hex(&data))
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Compilation hash: digest of the canonical configuration plus the
/// hashes of every emitted file, in emission order.
pub fn compute_compilation_hash<T: Serialize>(
    config: &T,
    emitted: &[String],
) -> Result<String, serde_json::Error> {
    let mut combined = canonical_json(config)?;
    for hash in emitted {
        combined.push(':');
        combined.push_str(hash);
    }
    Ok(sha256_hex(combined.as_bytes()))
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
