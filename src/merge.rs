//! Configuration Merge - Per-Key Strategies
//!
//! Objects merge recursively, arrays append, scalars are replaced, unless a
//! strategy is declared for the dotted key path.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    Append,
    Prepend,
    Replace,
}

pub type Strategies = BTreeMap<String, MergeStrategy>;

/// Merge `overrides` into `base`.
pub fn merge_with_strategy(base: Value, overrides: Value, strategies: &Strategies) -> Value {
    merge_at(base, overrides, "", strategies)
}

fn merge_at(base: Value, overrides: Value, path: &str, strategies: &Strategies) -> Value {
    match (strategies.get(path), base, overrides) {
        (Some(MergeStrategy::Replace), _, overrides) => overrides,
        (Some(MergeStrategy::Prepend), Value::Array(base), Value::Array(mut front)) => {
            front.extend(base);
            Value::Array(front)
        }
        (_, base, overrides) => merge_default(base, overrides, path, strategies),
    }
}

fn merge_default(base: Value, overrides: Value, path: &str, strategies: &Strategies) -> Value {
    match (base, overrides) {
        (Value::Object(mut base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                let child = child_path(path, &key);
                let merged = match base.remove(&key) {
                    Some(existing) => merge_at(existing, value, &child, strategies),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        // Append is the default for arrays.
        (Value::Array(mut base), Value::Array(overrides)) => {
            base.extend(overrides);
            Value::Array(base)
        }
        (_, overrides) => overrides,
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
