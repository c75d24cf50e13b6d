//! Bulk import batches and their results.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Largest batch accepted by a bulk import, and the ceiling for `per_page`.
pub const MAX_BULK_ITEMS: usize = 100;

/// Rejects batches the server would refuse, before anything is sent.
pub fn validate_bulk_size<T>(items: &[T]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::EmptyPayload);
    }
    if items.len() > MAX_BULK_ITEMS {
        return Err(ValidationError::TooManyItems {
            count: items.len(),
            max: MAX_BULK_ITEMS,
        });
    }
    Ok(())
}

/// Server-side outcome of one item that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub index: usize,
    /// Numeric ids (parameters) are kept as their decimal text.
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Response to a bulk import. Per-item failures are data here, not errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportResult {
    pub success: bool,
    pub imported: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: Vec<ItemError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_imported: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values_updated: Option<u64>,
}

impl ImportResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
