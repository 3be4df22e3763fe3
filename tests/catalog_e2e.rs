//! Catalog indexing and recipient expansion over the in-memory backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kyroalert::catalog::{ConfigIndex, IndexMapping, StoredDocument, WriteCondition, CONFIG_INDEX};
use kyroalert::{
    resolve_recipients, AlertingError, ConfigDocument, ConfigIndexer, EmailAccount, EmailGroup, EmailMethod,
    InMemoryConfigIndex, IndexRequest, IndexStep, Recipient, StorageError,
};

/// Counts schema operations while delegating to the in-memory backend.
#[derive(Default)]
struct CountingIndex {
    inner: InMemoryConfigIndex,
    creates: AtomicUsize,
    mapping_puts: AtomicUsize,
}

impl ConfigIndex for CountingIndex {
    fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
        self.inner.index_exists(index)
    }

    fn create_index(&self, index: &str, mapping: &IndexMapping) -> Result<(), StorageError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_index(index, mapping)
    }

    fn mapping_version(&self, index: &str) -> Result<Option<u32>, StorageError> {
        self.inner.mapping_version(index)
    }

    fn put_mapping(&self, index: &str, mapping: &IndexMapping) -> Result<(), StorageError> {
        self.mapping_puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_mapping(index, mapping)
    }

    fn get(&self, index: &str, id: &str) -> Result<Option<StoredDocument>, StorageError> {
        self.inner.get(index, id)
    }

    fn put(
        &self,
        index: &str,
        id: &str,
        document: ConfigDocument,
        condition: WriteCondition,
    ) -> Result<StoredDocument, StorageError> {
        self.inner.put(index, id, document, condition)
    }

    fn delete(&self, index: &str, id: &str) -> Result<StoredDocument, StorageError> {
        self.inner.delete(index, id)
    }

    fn list(&self, index: &str) -> Result<Vec<StoredDocument>, StorageError> {
        self.inner.list(index)
    }
}

#[test]
fn index_and_mapping_are_created_once() {
    let store = Arc::new(CountingIndex::default());
    let indexer = ConfigIndexer::new(store.clone());

    for i in 0..3 {
        let group = EmailGroup::new(format!("group_{i}"), ["a@example.com"]);
        indexer.index(IndexRequest::create(group)).unwrap();
    }

    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    assert_eq!(store.mapping_puts.load(Ordering::SeqCst), 0);
    assert_eq!(indexer.list().unwrap().len(), 3);
    assert_eq!(indexer.index_name(), CONFIG_INDEX);
}

#[test]
fn concurrent_updates_one_wins() {
    let indexer = ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()));
    let created = indexer
        .index(IndexRequest::create_with_id("ops", EmailAccount::new("ops", "a@example.com", "smtp.example.com")))
        .unwrap();
    assert_eq!(created.id, "ops");

    let mut first = EmailAccount::new("ops", "a@example.com", "smtp.example.com");
    first.method = EmailMethod::StartTls;
    let mut second = first.clone();
    second.port = 2525;

    let ok = indexer
        .index(IndexRequest::update("ops", first).if_seq_no_primary_term(created.seq_no, created.primary_term))
        .unwrap();
    assert_eq!(
        ok.steps,
        vec![IndexStep::EnsureIndex, IndexStep::EnsureMapping, IndexStep::Get, IndexStep::Put]
    );

    let err = indexer
        .index(IndexRequest::update("ops", second).if_seq_no_primary_term(created.seq_no, created.primary_term))
        .unwrap_err();
    assert!(matches!(
        err,
        AlertingError::Storage(StorageError::VersionConflict { .. })
    ));

    let stored = indexer.get_email_account("ops").unwrap();
    assert_eq!(stored.method, EmailMethod::StartTls);
    assert_eq!(stored.port, 465);
}

#[test]
fn create_with_existing_id_is_duplicate() {
    let indexer = ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()));
    let group = EmailGroup::new("oncall", ["a@example.com"]);
    indexer.index(IndexRequest::create_with_id("g", group.clone())).unwrap();
    let err = indexer.index(IndexRequest::create_with_id("g", group)).unwrap_err();
    assert!(matches!(err, AlertingError::Storage(StorageError::DuplicateKey(_))));
}

#[test]
fn groups_expand_into_an_email_message() {
    let indexer = ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()));
    let account = indexer
        .index(IndexRequest::create(EmailAccount::new("sender", "alerts@example.com", "smtp.example.com")))
        .unwrap();
    let oncall = indexer
        .index(IndexRequest::create(EmailGroup::new(
            "oncall",
            ["ann@example.com", "bob@example.com"],
        )))
        .unwrap();
    let leads = indexer
        .index(IndexRequest::create(EmailGroup::new(
            "leads",
            ["bob@example.com", "cy@example.com"],
        )))
        .unwrap();

    let recipients = resolve_recipients(
        &indexer,
        &[
            Recipient::EmailGroup(oncall.id),
            Recipient::EmailGroup(leads.id),
            Recipient::Email("dee@example.com".to_string()),
        ],
    )
    .unwrap();
    assert_eq!(
        recipients,
        vec!["ann@example.com", "bob@example.com", "cy@example.com", "dee@example.com"]
    );

    let sender = indexer.get_email_account(&account.id).unwrap();
    let msg = sender
        .message_builder("ops")
        .recipients(recipients)
        .message("disk full")
        .build()
        .unwrap();
    assert_eq!(msg.recipients().len(), 4);
    assert_eq!(msg.host(), "smtp.example.com");
}

#[test]
fn group_reference_to_account_is_rejected() {
    let indexer = ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()));
    let account = indexer
        .index(IndexRequest::create(EmailAccount::new("sender", "alerts@example.com", "smtp.example.com")))
        .unwrap();
    let err = resolve_recipients(&indexer, &[Recipient::EmailGroup(account.id)]).unwrap_err();
    assert!(matches!(
        err,
        AlertingError::Storage(StorageError::WrongDocumentType { .. })
    ));
}

#[test]
fn documents_survive_json() {
    let indexer = ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()));
    let created = indexer
        .index(IndexRequest::create(EmailGroup::new("oncall", ["a@example.com"])))
        .unwrap();
    let stored = indexer.get(&created.id).unwrap();
    let json = serde_json::to_string(&stored).unwrap();
    assert!(json.contains(r#""type":"email_group""#));
    let back: StoredDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stored);
}

#[test]
fn delete_then_get_is_not_found() {
    let indexer = ConfigIndexer::new(Arc::new(InMemoryConfigIndex::new()));
    let created = indexer
        .index(IndexRequest::create(EmailGroup::new("oncall", ["a@example.com"])))
        .unwrap();
    indexer.delete(&created.id).unwrap();
    assert!(matches!(
        indexer.get(&created.id).unwrap_err(),
        AlertingError::Storage(StorageError::DocumentNotFound { .. })
    ));
}
