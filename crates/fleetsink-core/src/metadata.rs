//! Bounded metadata maps.
//!
//! Devices attach arbitrary JSON metadata to commands and media uploads.
//! Rather than carrying an untyped dynamic bag through the system, the
//! server admits only a flat string-keyed map with explicit size limits,
//! validated once at the boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of entries in a metadata map.
pub const MAX_ENTRIES: usize = 32;
/// Maximum length of a metadata key in bytes.
pub const MAX_KEY_LEN: usize = 64;
/// Maximum serialized length of a single value in bytes.
pub const MAX_VALUE_LEN: usize = 1024;
/// Maximum serialized length of the whole map in bytes.
pub const MAX_TOTAL_LEN: usize = 8 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata must be a JSON object")]
    NotAnObject,

    #[error("metadata has {0} entries, maximum is {MAX_ENTRIES}")]
    TooManyEntries(usize),

    #[error("metadata key {0:?} exceeds {MAX_KEY_LEN} bytes")]
    KeyTooLong(String),

    #[error("metadata value for {0:?} exceeds {MAX_VALUE_LEN} bytes")]
    ValueTooLong(String),

    #[error("metadata exceeds {MAX_TOTAL_LEN} bytes serialized")]
    TooLarge,

    #[error("metadata is not valid JSON: {0}")]
    Invalid(String),
}

/// A validated, size-bounded map of string keys to JSON values.
///
/// Construct via [`Metadata::parse`] (from a raw JSON string) or
/// [`Metadata::from_value`]; both enforce the limits above. An absent or
/// empty map is always valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, Value>);

impl Metadata {
    /// Parse and validate a raw JSON string, as received from a client.
    pub fn parse(raw: &str) -> Result<Self, MetadataError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MetadataError::Invalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Validate an already-deserialized JSON value.
    pub fn from_value(value: Value) -> Result<Self, MetadataError> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(MetadataError::NotAnObject),
        };

        if map.len() > MAX_ENTRIES {
            return Err(MetadataError::TooManyEntries(map.len()));
        }

        let mut out = BTreeMap::new();
        let mut total = 2; // braces
        for (key, value) in map {
            if key.len() > MAX_KEY_LEN {
                return Err(MetadataError::KeyTooLong(key));
            }
            let serialized_len = serde_json::to_string(&value).map(|s| s.len()).unwrap_or(0);
            if serialized_len > MAX_VALUE_LEN {
                return Err(MetadataError::ValueTooLong(key));
            }
            total += key.len() + serialized_len + 4;
            out.insert(key, value);
        }

        if total > MAX_TOTAL_LEN {
            return Err(MetadataError::TooLarge);
        }

        Ok(Self(out))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Serialize for storage in a TEXT column.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
