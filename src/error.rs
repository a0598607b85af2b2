//! Error kinds surfaced by the extraction and search core.
//!
//! `NoResults` is an expected outcome of a valid query, not a fault; callers
//! (CLI, HTTP) report it as "nothing found". None of these errors leave
//! shared state behind: every core operation is request-scoped.

use crate::extract::ExtractError;
use crate::storage::StorageError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DocketError {
    /// A document could not be turned into text.
    #[error("extraction failed for {document}: {source}")]
    Extraction {
        document: String,
        #[source]
        source: ExtractError,
    },
    /// The query was absent, empty, or had no searchable terms.
    #[error("bad query: {0}")]
    BadQuery(String),
    /// A valid query matched no documents.
    #[error("no documents found")]
    NoResults,
    /// The object store could not return or accept a file.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// Persistence failed for a reason other than a missing record.
    #[error(transparent)]
    Store(StoreError),
    /// A request other than a query was rejected (upload, listing).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A background task failed to complete.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for DocketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => DocketError::NotFound(id),
            other => DocketError::Store(other),
        }
    }
}

pub type Result<T, E = DocketError> = std::result::Result<T, E>;
