//! In-memory configuration index.
//!
//! Thread-safe implementation of [`ConfigIndex`], used for embedded setups
//! and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::documents::ConfigDocument;
use super::store::{ConfigIndex, IndexMapping, StorageError, StoredDocument, WriteCondition};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn not_found(index: &str) -> StorageError {
    StorageError::IndexNotFound(index.to_string())
}

#[derive(Debug)]
struct IndexState {
    mapping: IndexMapping,
    docs: BTreeMap<String, StoredDocument>,
    next_seq_no: u64,
}

impl IndexState {
    fn new(mapping: IndexMapping) -> Self {
        Self {
            mapping,
            docs: BTreeMap::new(),
            next_seq_no: 0,
        }
    }
}

/// In-memory backend with a fixed primary term.
#[derive(Debug)]
pub struct InMemoryConfigIndex {
    primary_term: u64,
    indices: RwLock<HashMap<String, IndexState>>,
}

impl Default for InMemoryConfigIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConfigIndex {
    /// Empty backend, primary term 1.
    #[must_use]
    pub fn new() -> Self {
        Self::with_primary_term(1)
    }

    /// Empty backend reporting `primary_term` on every write.
    #[must_use]
    pub fn with_primary_term(primary_term: u64) -> Self {
        Self {
            primary_term,
            indices: RwLock::new(HashMap::new()),
        }
    }

    /// Backend with `index` already created using `mapping`.
    #[must_use]
    pub fn with_index(index: impl Into<String>, mapping: IndexMapping) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.indices.write() {
            guard.insert(index.into(), IndexState::new(mapping));
        }
        store
    }
}

impl ConfigIndex for InMemoryConfigIndex {
    fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
        let guard = self.indices.read().map_err(|_| lock_err("index_exists"))?;
        Ok(guard.contains_key(index))
    }

    fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<(), StorageError> {
        let mut guard = self.indices.write().map_err(|_| lock_err("create_index"))?;
        if guard.contains_key(index) {
            return Err(StorageError::IndexAlreadyExists(index.to_string()));
        }
        guard.insert(index.to_string(), IndexState::new(mapping.clone()));
        Ok(())
    }

    fn mapping_version(&self, index: &str) -> Result<Option<u32>, StorageError> {
        let guard = self.indices.read().map_err(|_| lock_err("mapping_version"))?;
        let state = guard.get(index).ok_or_else(|| not_found(index))?;
        Ok(Some(state.mapping.version))
    }

    fn put_mapping(&self, index: &str, mapping: &IndexMapping) -> Result<(), StorageError> {
        let mut guard = self.indices.write().map_err(|_| lock_err("put_mapping"))?;
        let state = guard.get_mut(index).ok_or_else(|| not_found(index))?;
        state.mapping = mapping.clone();
        Ok(())
    }

    fn get(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, StorageError> {
        let guard = self.indices.read().map_err(|_| lock_err("get"))?;
        let state = guard.get(index).ok_or_else(|| not_found(index))?;
        Ok(state.docs.get(id).cloned())
    }

    fn put(
        &self,
        index: &str,
        id: &str,
        document: ConfigDocument,
        condition: WriteCondition,
    ) -> Result<StoredDocument, StorageError> {
        let mut guard = self.indices.write().map_err(|_| lock_err("put"))?;
        let state = guard.get_mut(index).ok_or_else(|| not_found(index))?;
        let existing = state.docs.get(id);

        match (condition, existing) {
            (WriteCondition::Any, _) | (WriteCondition::Create, None) => {}
            (WriteCondition::Create, Some(_)) => {
                return Err(StorageError::DuplicateKey(id.to_string()));
            }
            (WriteCondition::IfMatch { .. }, None) => {
                return Err(StorageError::DocumentNotFound {
                    index: index.to_string(),
                    id: id.to_string(),
                });
            }
            (WriteCondition::IfMatch { seq_no, primary_term }, Some(current)) => {
                if current.seq_no != seq_no || current.primary_term != primary_term {
                    return Err(StorageError::VersionConflict {
                        id: id.to_string(),
                        expected_seq_no: seq_no,
                        expected_primary_term: primary_term,
                        actual_seq_no: current.seq_no,
                        actual_primary_term: current.primary_term,
                    });
                }
            }
        }

        let version = existing.map_or(1, |d| d.version + 1);
        let stored = StoredDocument {
            id: id.to_string(),
            seq_no: state.next_seq_no,
            primary_term: self.primary_term,
            version,
            document,
        };
        state.next_seq_no += 1;
        state.docs.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    fn delete(&self, index: &str, id: &str) -> Result<StoredDocument, StorageError> {
        let mut guard = self.indices.write().map_err(|_| lock_err("delete"))?;
        let state = guard.get_mut(index).ok_or_else(|| not_found(index))?;
        state.docs.remove(id).ok_or_else(|| StorageError::DocumentNotFound {
            index: index.to_string(),
            id: id.to_string(),
        })
    }

    fn list(&self, index: &str) -> Result<Vec<StoredDocument>, StorageError> {
        let guard = self.indices.read().map_err(|_| lock_err("list"))?;
        let state = guard.get(index).ok_or_else(|| not_found(index))?;
        Ok(state.docs.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::documents::EmailGroup;

    const IDX: &str = "cfg";

    fn group(name: &str) -> ConfigDocument {
        EmailGroup::new(name, ["a@example.com"]).into()
    }

    #[test]
    fn test_create_index_twice_fails() {
        let store = InMemoryConfigIndex::new();
        assert!(!store.index_exists(IDX).unwrap());
        store.create_index(IDX, &IndexMapping::config()).unwrap();
        assert!(store.index_exists(IDX).unwrap());
        assert_eq!(
            store.create_index(IDX, &IndexMapping::config()),
            Err(StorageError::IndexAlreadyExists(IDX.to_string()))
        );
    }

    #[test]
    fn test_put_assigns_seq_no_and_version() {
        let store = InMemoryConfigIndex::with_index(IDX, IndexMapping::config());
        let first = store.put(IDX, "g1", group("one"), WriteCondition::Create).unwrap();
        assert_eq!((first.seq_no, first.version, first.primary_term), (0, 1, 1));

        let second = store.put(IDX, "g2", group("two"), WriteCondition::Create).unwrap();
        assert_eq!(second.seq_no, 1);

        let updated = store.put(IDX, "g1", group("uno"), WriteCondition::Any).unwrap();
        assert_eq!((updated.seq_no, updated.version), (2, 2));
    }

    #[test]
    fn test_create_rejects_existing_id() {
        let store = InMemoryConfigIndex::with_index(IDX, IndexMapping::config());
        store.put(IDX, "g1", group("one"), WriteCondition::Create).unwrap();
        assert_eq!(
            store.put(IDX, "g1", group("one"), WriteCondition::Create),
            Err(StorageError::DuplicateKey("g1".to_string()))
        );
    }

    #[test]
    fn test_if_match_detects_stale_seq_no() {
        let store = InMemoryConfigIndex::with_index(IDX, IndexMapping::config());
        let stored = store.put(IDX, "g1", group("one"), WriteCondition::Create).unwrap();
        store
            .put(
                IDX,
                "g1",
                group("two"),
                WriteCondition::IfMatch {
                    seq_no: stored.seq_no,
                    primary_term: stored.primary_term,
                },
            )
            .unwrap();

        let stale = store.put(
            IDX,
            "g1",
            group("three"),
            WriteCondition::IfMatch {
                seq_no: stored.seq_no,
                primary_term: stored.primary_term,
            },
        );
        assert!(matches!(stale, Err(StorageError::VersionConflict { actual_seq_no: 1, .. })));
    }

    #[test]
    fn test_missing_index_and_document() {
        let store = InMemoryConfigIndex::new();
        assert!(matches!(store.get(IDX, "x"), Err(StorageError::IndexNotFound(_))));

        store.create_index(IDX, &IndexMapping::config()).unwrap();
        assert_eq!(store.get(IDX, "x").unwrap(), None);
        assert!(matches!(store.delete(IDX, "x"), Err(StorageError::DocumentNotFound { .. })));
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let store = InMemoryConfigIndex::with_index(IDX, IndexMapping::config());
        store.put(IDX, "b", group("b"), WriteCondition::Any).unwrap();
        store.put(IDX, "a", group("a"), WriteCondition::Any).unwrap();
        let ids: Vec<String> = store.list(IDX).unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
