//! Splitting caller payloads into unit fields and store-owned metadata,
//! and merge-patching stored fields.

use crate::error::{Error, Result};
use serde_json::{Map, Value};

/// Metadata keys a caller may send but the store always assigns itself.
const IGNORED_KEYS: [&str; 3] = ["code", "createdAt", "updatedAt"];

/// A create payload split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDraft {
    /// Folder reference lifted out of the payload.
    pub folder: Option<String>,
    /// Remaining caller members.
    pub fields: Map<String, Value>,
}

impl UnitDraft {
    /// Split a create payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `folder` is neither a string nor null.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self> {
        let folder = match payload.remove("folder") {
            Some(value) => folder_reference(value)?,
            None => None,
        };
        for key in IGNORED_KEYS {
            payload.remove(key);
        }
        payload.remove("isFavorite");
        Ok(Self { folder, fields: payload })
    }
}

/// An update payload split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitPatch {
    /// New folder reference (if Some). `Some(None)` clears it.
    pub folder: Option<Option<String>>,
    /// New favorite flag (if Some).
    pub is_favorite: Option<bool>,
    /// Members to merge into the stored fields.
    pub fields: Map<String, Value>,
}

impl UnitPatch {
    /// Split an update payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `folder` is neither a string nor
    /// null, or `isFavorite` is not a boolean.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self> {
        let folder = payload.remove("folder").map(folder_reference).transpose()?;
        let is_favorite = match payload.remove("isFavorite") {
            Some(Value::Bool(flag)) => Some(flag),
            Some(other) => {
                return Err(Error::invalid(format!("isFavorite must be a boolean, got {other}")))
            }
            None => None,
        };
        for key in IGNORED_KEYS {
            payload.remove(key);
        }
        Ok(Self { folder, is_favorite, fields: payload })
    }
}

fn folder_reference(value: Value) -> Result<Option<String>> {
    match value {
        Value::String(folder) => Ok(Some(folder)),
        Value::Null => Ok(None),
        other => Err(Error::invalid(format!("folder must be a string, got {other}"))),
    }
}

/// Merge `patch` into the stored `fields`.
///
/// Every patch key overwrites the stored key as a whole; nested objects are
/// not merged. Omitted keys are kept.
pub fn merge_fields(fields: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        fields.insert(key, value);
    }
}
