//! Writes catalog documents through a fixed sequence of index steps.
//!
//! Every write runs `EnsureIndex -> EnsureMapping -> Get -> Put`. `Get`
//! only runs for updates, where it checks that the document exists, has
//! the same kind, and (if requested) still carries the expected
//! sequence number and primary term.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::AlertingResult;

use super::documents::{ConfigDocument, EmailAccount, EmailGroup};
use super::store::{ConfigIndex, IndexMapping, StorageError, StoredDocument, WriteCondition, CONFIG_INDEX};

/// One step of an index operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStep {
    /// Create the index if it is missing.
    EnsureIndex,
    /// Upgrade the mapping if it is older than ours.
    EnsureMapping,
    /// Load the current document (updates only).
    Get,
    /// Write the document.
    Put,
}

/// Expected concurrency metadata for an update.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqNoPrimaryTerm {
    pub seq_no: u64,
    pub primary_term: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RequestKind {
    Create,
    Update {
        if_match: Option<SeqNoPrimaryTerm>,
    },
}

/// A create or update of one catalog document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRequest {
    id: String,
    document: ConfigDocument,
    kind: RequestKind,
}

impl IndexRequest {
    /// Creates a new document under a random id.
    #[must_use]
    pub fn create(document: impl Into<ConfigDocument>) -> Self {
        Self::create_with_id(Uuid::new_v4().to_string(), document)
    }

    /// Creates a new document under `id`. Fails if `id` exists.
    #[must_use]
    pub fn create_with_id(id: impl Into<String>, document: impl Into<ConfigDocument>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            kind: RequestKind::Create,
        }
    }

    /// Replaces the existing document `id`.
    #[must_use]
    pub fn update(id: impl Into<String>, document: impl Into<ConfigDocument>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            kind: RequestKind::Update { if_match: None },
        }
    }

    /// Makes an update conditional on the stored sequence number and primary term.
    ///
    /// Has no effect on create requests.
    #[must_use]
    pub fn if_seq_no_primary_term(mut self, seq_no: u64, primary_term: u64) -> Self {
        if let RequestKind::Update { if_match } = &mut self.kind {
            *if_match = Some(SeqNoPrimaryTerm { seq_no, primary_term });
        }
        self
    }

    /// Target document id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Result of a successful index operation.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexResponse {
    pub id: String,
    pub seq_no: u64,
    pub primary_term: u64,
    pub version: u64,
    /// Steps that ran, in order.
    pub steps: Vec<IndexStep>,
}

/// Catalog writer over a [`ConfigIndex`] backend.
#[derive(Clone)]
pub struct ConfigIndexer {
    store: Arc<dyn ConfigIndex>,
    index: String,
    mapping: IndexMapping,
}

impl std::fmt::Debug for ConfigIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigIndexer")
            .field("index", &self.index)
            .field("mapping_version", &self.mapping.version)
            .finish_non_exhaustive()
    }
}

impl ConfigIndexer {
    /// Indexer writing to the default configuration index.
    #[must_use]
    pub fn new(store: Arc<dyn ConfigIndex>) -> Self {
        Self::with_index(store, CONFIG_INDEX, IndexMapping::config())
    }

    /// Indexer writing to `index` with `mapping`.
    #[must_use]
    pub fn with_index(store: Arc<dyn ConfigIndex>, index: impl Into<String>, mapping: IndexMapping) -> Self {
        Self {
            store,
            index: index.into(),
            mapping,
        }
    }

    /// Name of the target index.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index
    }

    /// Validates and writes `request`.
    pub fn index(&self, request: IndexRequest) -> AlertingResult<IndexResponse> {
        request.document.validate()?;

        let IndexRequest { id, document, kind } = request;
        let mut steps = Vec::with_capacity(4);
        let mut step = IndexStep::EnsureIndex;
        let mut condition = WriteCondition::Create;

        loop {
            tracing::debug!(index = %self.index, id = %id, ?step, "index step");
            steps.push(step);
            step = match step {
                IndexStep::EnsureIndex => {
                    self.ensure_index()?;
                    IndexStep::EnsureMapping
                }
                IndexStep::EnsureMapping => {
                    self.ensure_mapping()?;
                    match kind {
                        RequestKind::Create => IndexStep::Put,
                        RequestKind::Update { .. } => IndexStep::Get,
                    }
                }
                IndexStep::Get => {
                    let current = self.fetch(&id)?;
                    if current.document.kind() != document.kind() {
                        return Err(StorageError::WrongDocumentType {
                            id,
                            expected: document.kind(),
                            actual: current.document.kind(),
                        }
                        .into());
                    }
                    let expected = match kind {
                        RequestKind::Update { if_match: Some(m) } => m,
                        _ => SeqNoPrimaryTerm {
                            seq_no: current.seq_no,
                            primary_term: current.primary_term,
                        },
                    };
                    if expected.seq_no != current.seq_no || expected.primary_term != current.primary_term {
                        return Err(StorageError::VersionConflict {
                            id,
                            expected_seq_no: expected.seq_no,
                            expected_primary_term: expected.primary_term,
                            actual_seq_no: current.seq_no,
                            actual_primary_term: current.primary_term,
                        }
                        .into());
                    }
                    condition = WriteCondition::IfMatch {
                        seq_no: expected.seq_no,
                        primary_term: expected.primary_term,
                    };
                    IndexStep::Put
                }
                IndexStep::Put => {
                    let stored = self.store.put(&self.index, &id, document, condition)?;
                    tracing::info!(
                        index = %self.index,
                        id = %stored.id,
                        kind = stored.document.kind(),
                        seq_no = stored.seq_no,
                        version = stored.version,
                        "indexed config document"
                    );
                    return Ok(IndexResponse {
                        id: stored.id,
                        seq_no: stored.seq_no,
                        primary_term: stored.primary_term,
                        version: stored.version,
                        steps,
                    });
                }
            };
        }
    }

    fn ensure_index(&self) -> Result<(), StorageError> {
        if self.store.index_exists(&self.index)? {
            return Ok(());
        }
        match self.store.create_index(&self.index, &self.mapping) {
            Ok(()) => {
                tracing::info!(index = %self.index, version = self.mapping.version, "created config index");
                Ok(())
            }
            // Lost a creation race; the index is there either way.
            Err(StorageError::IndexAlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn ensure_mapping(&self) -> Result<(), StorageError> {
        let current = self.store.mapping_version(&self.index)?;
        if current.is_some_and(|v| v >= self.mapping.version) {
            return Ok(());
        }
        self.store.put_mapping(&self.index, &self.mapping)?;
        tracing::info!(
            index = %self.index,
            from = ?current,
            to = self.mapping.version,
            "updated config index mapping"
        );
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<StoredDocument, StorageError> {
        self.store
            .get(&self.index, id)?
            .ok_or_else(|| StorageError::DocumentNotFound {
                index: self.index.clone(),
                id: id.to_string(),
            })
    }

    /// Gets a stored document by id.
    pub fn get(&self, id: &str) -> AlertingResult<StoredDocument> {
        Ok(self.fetch(id)?)
    }

    /// Gets an email account by id.
    pub fn get_email_account(&self, id: &str) -> AlertingResult<EmailAccount> {
        let stored = self.fetch(id)?;
        match stored.document {
            ConfigDocument::EmailAccount(account) => Ok(account),
            other => Err(StorageError::WrongDocumentType {
                id: stored.id,
                expected: "email_account",
                actual: other.kind(),
            }
            .into()),
        }
    }

    /// Gets an email group by id.
    pub fn get_email_group(&self, id: &str) -> AlertingResult<EmailGroup> {
        let stored = self.fetch(id)?;
        match stored.document {
            ConfigDocument::EmailGroup(group) => Ok(group),
            other => Err(StorageError::WrongDocumentType {
                id: stored.id,
                expected: "email_group",
                actual: other.kind(),
            }
            .into()),
        }
    }

    /// Deletes a document by id.
    pub fn delete(&self, id: &str) -> AlertingResult<StoredDocument> {
        let removed = self.store.delete(&self.index, id)?;
        tracing::info!(index = %self.index, id, "deleted config document");
        Ok(removed)
    }

    /// All documents in the index; empty if the index was never created.
    pub fn list(&self) -> AlertingResult<Vec<StoredDocument>> {
        if !self.store.index_exists(&self.index)? {
            return Ok(Vec::new());
        }
        Ok(self.store.list(&self.index)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::InMemoryConfigIndex;
    use crate::error::AlertingError;

    fn indexer() -> ConfigIndexer {
        ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()))
    }

    fn account() -> EmailAccount {
        EmailAccount::new("ops", "alerts@example.com", "smtp.example.com")
    }

    #[test]
    fn test_create_runs_without_get() {
        let resp = indexer().index(IndexRequest::create(account())).unwrap();
        assert_eq!(
            resp.steps,
            vec![IndexStep::EnsureIndex, IndexStep::EnsureMapping, IndexStep::Put]
        );
        assert_eq!(resp.version, 1);
    }

    #[test]
    fn test_update_runs_get_and_bumps_version() {
        let indexer = indexer();
        let created = indexer.index(IndexRequest::create(account())).unwrap();

        let mut changed = account();
        changed.port = 587;
        let resp = indexer
            .index(IndexRequest::update(&created.id, changed).if_seq_no_primary_term(created.seq_no, created.primary_term))
            .unwrap();
        assert_eq!(resp.steps.last(), Some(&IndexStep::Put));
        assert!(resp.steps.contains(&IndexStep::Get));
        assert_eq!(resp.version, 2);
        assert_eq!(indexer.get_email_account(&created.id).unwrap().port, 587);
    }

    #[test]
    fn test_update_with_stale_seq_no_conflicts() {
        let indexer = indexer();
        let created = indexer.index(IndexRequest::create(account())).unwrap();
        indexer.index(IndexRequest::update(&created.id, account())).unwrap();

        let err = indexer
            .index(IndexRequest::update(&created.id, account()).if_seq_no_primary_term(created.seq_no, created.primary_term))
            .unwrap_err();
        assert!(matches!(
            err,
            AlertingError::Storage(StorageError::VersionConflict { .. })
        ));
    }

    #[test]
    fn test_update_missing_document() {
        let err = indexer().index(IndexRequest::update("nope", account())).unwrap_err();
        assert!(matches!(
            err,
            AlertingError::Storage(StorageError::DocumentNotFound { .. })
        ));
    }

    #[test]
    fn test_update_cannot_change_kind() {
        let indexer = indexer();
        let created = indexer.index(IndexRequest::create(account())).unwrap();
        let err = indexer
            .index(IndexRequest::update(&created.id, EmailGroup::new("g", ["a@example.com"])))
            .unwrap_err();
        assert!(matches!(
            err,
            AlertingError::Storage(StorageError::WrongDocumentType { .. })
        ));
    }

    #[test]
    fn test_invalid_document_is_not_written() {
        let indexer = indexer();
        let err = indexer
            .index(IndexRequest::create(EmailGroup::new("bad name", Vec::<String>::new())))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(indexer.list().unwrap().is_empty());
    }

    #[test]
    fn test_old_mapping_is_upgraded() {
        let store = Arc::new(InMemoryConfigIndex::with_index(
            CONFIG_INDEX,
            IndexMapping {
                version: 0,
                properties: serde_json::json!({}),
            },
        ));
        let indexer = ConfigIndexer::new(store.clone());
        indexer.index(IndexRequest::create(account())).unwrap();
        assert_eq!(store.mapping_version(CONFIG_INDEX).unwrap(), Some(IndexMapping::config().version));
    }

    #[test]
    fn test_typed_get_checks_kind() {
        let indexer = indexer();
        let created = indexer.index(IndexRequest::create(account())).unwrap();
        assert!(indexer.get_email_group(&created.id).is_err());
        assert_eq!(indexer.get_email_account(&created.id).unwrap(), account());
    }
}
