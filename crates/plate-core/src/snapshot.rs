use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::EditorError;
use crate::normalize;

pub const SNAPSHOT_SCHEMA: &str = "bilingual-plate";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Versioned JSON form of a document, for fixtures and debugging. HTML
/// stays the persisted format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentValue {
    pub schema: String,
    pub version: u32,
    pub document: Document,
}

impl DocumentValue {
    pub fn new(document: Document) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA.to_string(),
            version: SNAPSHOT_VERSION,
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, EditorError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a snapshot and rejects foreign schemas, newer versions and
    /// trees that break the document invariants.
    pub fn from_json_str(s: &str) -> Result<Self, EditorError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != SNAPSHOT_SCHEMA {
            return Err(EditorError::Snapshot(format!(
                "unknown schema {:?}",
                value.schema
            )));
        }
        if value.version > SNAPSHOT_VERSION {
            return Err(EditorError::Snapshot(format!(
                "version {} is newer than {SNAPSHOT_VERSION}",
                value.version
            )));
        }
        normalize::validate(&value.document)?;
        Ok(value)
    }
}
