//! Storage contract for the configuration index.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::documents::ConfigDocument;

/// Default name of the configuration index.
pub const CONFIG_INDEX: &str = ".kyroalert-config";

/// Current mapping version of the configuration index.
pub const CONFIG_MAPPING_VERSION: u32 = 1;

/// Errors that can occur during catalog storage operations.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Index already exists.
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// Index not found.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Document not found.
    #[error("Document not found: {index}/{id}")]
    DocumentNotFound { index: String, id: String },

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Optimistic concurrency check failed.
    #[error(
        "Version conflict for {id}: expected seq_no={expected_seq_no} primary_term={expected_primary_term}, \
         found seq_no={actual_seq_no} primary_term={actual_primary_term}"
    )]
    VersionConflict {
        id: String,
        expected_seq_no: u64,
        expected_primary_term: u64,
        actual_seq_no: u64,
        actual_primary_term: u64,
    },

    /// Stored document has another kind than requested.
    #[error("Document {id} is a {actual}, expected {expected}")]
    WrongDocumentType {
        id: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Index mapping: a version plus the field definitions.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMapping {
    pub version: u32,
    pub properties: serde_json::Value,
}

impl IndexMapping {
    /// The mapping this crate writes for its configuration index.
    #[must_use]
    pub fn config() -> Self {
        Self {
            version: CONFIG_MAPPING_VERSION,
            properties: serde_json::json!({
                "type": { "type": "keyword" },
                "name": { "type": "keyword" },
                "email": { "type": "keyword" },
                "host": { "type": "text" },
                "port": { "type": "integer" },
                "method": { "type": "keyword" },
                "emails": { "type": "keyword" },
            }),
        }
    }
}

/// A document together with its concurrency metadata.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub seq_no: u64,
    pub primary_term: u64,
    pub version: u64,
    pub document: ConfigDocument,
}

/// Precondition applied to a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Overwrite or create.
    Any,
    /// Fail with `DuplicateKey` if the id exists.
    Create,
    /// Fail with `VersionConflict` unless the stored document matches.
    IfMatch {
        /// Expected sequence number.
        seq_no: u64,
        /// Expected primary term.
        primary_term: u64,
    },
}

/// Storage trait for the configuration index.
///
/// Writes are atomic per document. Each successful write assigns a new,
/// index-wide increasing sequence number and bumps the document version.
pub trait ConfigIndex: Send + Sync {
    /// Returns whether `index` exists.
    fn index_exists(&self, index: &str) -> Result<bool, StorageError>;

    /// Creates `index` with `mapping`. Fails if it exists.
    fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<(), StorageError>;

    /// Mapping version of `index`, or `None` if it has none recorded.
    fn mapping_version(&self, index: &str) -> Result<Option<u32>, StorageError>;

    /// Replaces the mapping of `index`.
    fn put_mapping(&self, index: &str, mapping: &IndexMapping) -> Result<(), StorageError>;

    /// Gets a document by id.
    fn get(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, StorageError>;

    /// Writes a document under `condition`.
    fn put(
        &self,
        index: &str,
        id: &str,
        document: ConfigDocument,
        condition: WriteCondition,
    ) -> Result<StoredDocument, StorageError>;

    /// Deletes a document, returning the removed entry.
    fn delete(&self, index: &str, id: &str) -> Result<StoredDocument, StorageError>;

    /// All documents in `index`, ordered by id.
    fn list(&self, index: &str) -> Result<Vec<StoredDocument>, StorageError>;
}
