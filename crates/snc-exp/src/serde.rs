use std::collections::BTreeMap;
use std::fs;
use std::iter::FromIterator;
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use snc_core::errors::{ErrorInfo, SncError};

fn serde_error(code: &str, err: impl ToString) -> SncError {
    SncError::serde(code, err)
}

/// Recursively sorts object keys so equal values always serialize identically.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => {
            let canonical_values = values.into_iter().map(canonicalize).collect();
            Value::Array(canonical_values)
        }
        other => other,
    }
}

/// Converts a serializable value into a canonical JSON value.
pub fn to_canonical_value<T: Serialize>(value: &T) -> Result<Value, SncError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    Ok(canonicalize(value))
}

/// Serializes a value into canonical JSON bytes with deterministic ordering.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, SncError> {
    let canonical = to_canonical_value(value)?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical).map_err(|err| serde_error("json_write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SncError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json_deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, SncError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}

/// Loads a settings file, choosing YAML or JSON by file extension.
pub fn load_settings_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, SncError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| {
        SncError::Serde(
            ErrorInfo::new("settings_read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => from_yaml_slice(&bytes),
        Some("json") => from_json_slice(&bytes),
        other => Err(SncError::Configuration(
            ErrorInfo::new("settings_format", "settings files must be .yaml, .yml or .json")
                .with_context("path", path.display().to_string())
                .with_context("extension", other.unwrap_or("")),
        )),
    }
}
