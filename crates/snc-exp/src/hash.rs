use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use snc_core::errors::SncError;

use crate::serde::{to_canonical_json_bytes, to_canonical_value};

/// Longest textual configuration name used verbatim as a filename.
pub const MAX_FILENAME_LEN: usize = 256;

/// Computes a stable hexadecimal SHA-256 hash for the provided serializable payload.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, SncError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}

/// Flattens nested objects into `sep`-joined key paths.
///
/// Arrays and scalars are leaves. Empty objects are kept as leaves so that
/// `{}` and an absent key remain distinguishable.
pub fn flatten(value: &Value, sep: &str) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(value, "", sep, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: &str, sep: &str, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}{sep}{key}")
                };
                flatten_into(child, &path, sep, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

fn semantic_paths<T: Serialize>(
    value: &T,
    excluded: &[&str],
    sep: &str,
) -> Result<BTreeMap<String, Value>, SncError> {
    let mut canonical = to_canonical_value(value)?;
    if let Value::Object(map) = &mut canonical {
        for key in excluded {
            map.remove(*key);
        }
    }
    Ok(flatten(&canonical, sep))
}

/// Deterministic identifier of a configuration.
///
/// Top-level fields named in `excluded` (identifier, cosmetic and execution
/// control fields) are dropped, the remainder is flattened into dotted key
/// paths, serialized canonically and digested with SHA-256.
pub fn fingerprint<T: Serialize>(value: &T, excluded: &[&str]) -> Result<String, SncError> {
    stable_hash_string(&semantic_paths(value, excluded, ".")?)
}

/// Human readable filename for a configuration.
///
/// Falls back to the [`fingerprint`] once the textual form exceeds
/// [`MAX_FILENAME_LEN`]; callers persist the full configuration next to the
/// artifact so a digest name can always be resolved again.
pub fn config_to_filename<T: Serialize>(value: &T, excluded: &[&str]) -> Result<String, SncError> {
    let paths = semantic_paths(value, excluded, "_")?;
    let mut filename = String::new();
    for (idx, (key, leaf)) in paths.iter().enumerate() {
        if idx > 0 {
            filename.push(',');
        }
        filename.push_str(key);
        filename.push('=');
        filename.push_str(&leaf.to_string());
    }
    let filename: String = filename
        .chars()
        .filter(|c| !matches!(c, ' ' | '\'' | '"' | '[' | ']' | '{' | '}'))
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
        fingerprint(value, excluded)
    } else {
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_joins_nested_paths() {
        let flat = flatten(&json!({"a": {"b": 1, "c": {"d": [1, 2]}}, "e": {}}), ".");
        assert_eq!(flat["a.b"], json!(1));
        assert_eq!(flat["a.c.d"], json!([1, 2]));
        assert_eq!(flat["e"], json!({}));
        assert_eq!(flat.len(), 3);
    }
}
