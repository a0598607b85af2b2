//! Persistence abstraction for document records.
//!
//! The [`RecordStore`] trait covers everything the pipeline and search
//! need from a database, so the core can run against SQLite in production
//! and an in-memory map in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::models::{DerivedFields, Document, DocumentRecord, KeywordEntry};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Abstract record storage.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create_record`](RecordStore::create_record) | New record owning uploaded files |
/// | [`load_record`](RecordStore::load_record) | Full record by id |
/// | [`save_derived_fields`](RecordStore::save_derived_fields) | Atomic write of pipeline output |
/// | [`load_keyword_index`](RecordStore::load_keyword_index) | Every `(id, keywords)` pair |
/// | [`load_keyword_index_matching`](RecordStore::load_keyword_index_matching) | Pairs sharing a term |
/// | [`list_by_license`](RecordStore::list_by_license) | All records of one tenant |
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record with no derived fields. Returns the new record id.
    async fn create_record(
        &self,
        license_id: &str,
        documents: &[Document],
    ) -> Result<String, StoreError>;

    async fn load_record(&self, id: &str) -> Result<DocumentRecord, StoreError>;

    /// Replace text, keywords, summary and metadata in one step. Either all
    /// fields are written or none are.
    async fn save_derived_fields(
        &self,
        id: &str,
        fields: &DerivedFields,
    ) -> Result<(), StoreError>;

    /// Keyword sets of every record, ordered by record id.
    async fn load_keyword_index(&self) -> Result<Vec<KeywordEntry>, StoreError>;

    /// Keyword sets of the records holding at least one of `terms`,
    /// ordered by record id.
    async fn load_keyword_index_matching(
        &self,
        terms: &[String],
    ) -> Result<Vec<KeywordEntry>, StoreError>;

    /// Records owned by `license_id`, oldest first.
    async fn list_by_license(&self, license_id: &str) -> Result<Vec<DocumentRecord>, StoreError>;
}

pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
