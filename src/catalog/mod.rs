//! Configuration catalog: email accounts and groups.

/// Catalog document types.
pub mod documents;
/// Sequenced index writer.
pub mod indexer;
/// In-memory backend.
pub mod memory;
/// Group expansion.
pub mod recipients;
/// Storage trait and errors.
pub mod store;

pub use documents::{ConfigDocument, EmailAccount, EmailGroup, Recipient, MAX_NAME_LENGTH};
pub use indexer::{ConfigIndexer, IndexRequest, IndexResponse, IndexStep, SeqNoPrimaryTerm};
pub use memory::InMemoryConfigIndex;
pub use recipients::resolve_recipients;
pub use store::{
    ConfigIndex, IndexMapping, StorageError, StoredDocument, WriteCondition, CONFIG_INDEX, CONFIG_MAPPING_VERSION,
};
